//! Sequence-number arithmetic (C1).
//!
//! A [`SeqNum`] is an unsigned 16-bit value with serial-number (circular)
//! comparison, as used throughout AODVv2 to order route advertisements.
//! `0` is reserved to mean "unknown" and is never issued by [`SeqNumCounter`].

use std::cmp::Ordering;
use std::time::Instant;

use crate::config::Constants;

/// A 16-bit AODVv2 sequence number. `0` means "unknown"; [`cmp`] does not
/// special-case it and will order it like any other value via wrapping
/// subtraction, so callers that need "unknown" treated differently should
/// check `is_unknown()` first rather than rely on comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeqNum(pub u16);

impl SeqNum {
    pub const UNKNOWN: SeqNum = SeqNum(0);

    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

/// Circular comparison: negative when `a` is older than `b`, zero when
/// equal, positive when `a` is newer, using `diff = a - b mod 2^16` with
/// the usual `|diff| < 2^15` serial-number rule (RFC 1982). Never treat a
/// `SeqNum` as a plain integer order.
pub fn cmp(a: SeqNum, b: SeqNum) -> Ordering {
    let diff = a.0.wrapping_sub(b.0) as i16;
    diff.cmp(&0)
}

/// Per-router own-SeqNum allocator. Monotonically increasing until reset.
pub struct SeqNumCounter {
    current: SeqNum,
    last_issued_at: Instant,
    lifetime: std::time::Duration,
}

impl SeqNumCounter {
    pub fn new(constants: &Constants) -> Self {
        Self {
            // Draft section 5.4: a router SHOULD start with a random-ish
            // low value; 1 is simplest and matches the source's reset value.
            current: SeqNum(1),
            last_issued_at: Instant::now(),
            lifetime: constants.max_seqnum_lifetime,
        }
    }

    /// Returns the current own SeqNum and advances it by one, wrapping from
    /// `u16::MAX` to `1` (`0` is never issued).
    pub fn new_seqnum(&mut self) -> SeqNum {
        self.reset_if_idle();
        let issued = self.current;
        self.current = SeqNum(if self.current.0 == u16::MAX {
            1
        } else {
            self.current.0 + 1
        });
        self.last_issued_at = Instant::now();
        issued
    }

    /// Triggered by a lifetime timer (or lazily, before issuing a new
    /// value): resets the own SeqNum to 1 if it has been idle longer than
    /// `MAX_SEQNUM_LIFETIME`.
    pub fn reset_if_idle(&mut self) {
        if self.last_issued_at.elapsed() > self.lifetime {
            self.current = SeqNum(1);
        }
    }

    pub fn peek(&self) -> SeqNum {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_compare() {
        assert_eq!(cmp(SeqNum(1), SeqNum(2)), Ordering::Less);
        assert_eq!(cmp(SeqNum(2), SeqNum(1)), Ordering::Greater);
        assert_eq!(cmp(SeqNum(5), SeqNum(5)), Ordering::Equal);
        // wrap-around: 65535 is older than 1
        assert_eq!(cmp(SeqNum(65535), SeqNum(1)), Ordering::Less);
        assert_eq!(cmp(SeqNum(1), SeqNum(65535)), Ordering::Greater);
    }

    #[test]
    fn p1_monotonic_until_reset() {
        let constants = Constants::default();
        let mut counter = SeqNumCounter::new(&constants);
        let s1 = counter.new_seqnum();
        let s2 = counter.new_seqnum();
        assert_eq!(cmp(s1, s2), Ordering::Less);
    }

    #[test]
    fn wraps_skipping_zero() {
        let constants = Constants::default();
        let mut counter = SeqNumCounter::new(&constants);
        counter.current = SeqNum(u16::MAX);
        let issued = counter.new_seqnum();
        assert_eq!(issued, SeqNum(u16::MAX));
        assert_eq!(counter.peek(), SeqNum(1));
    }
}
