//! Neighbor Set: one entry per `(link-local addr, interface)` from which an
//! RFC 5444 packet has been heard. Tracks the HEARD/CONFIRMED/BLACKLISTED
//! lifecycle and the outstanding RREP_Ack solicitation.

use std::net::Ipv6Addr;
use std::time::Instant;

use crate::config::Constants;
use crate::error::SetError;
use crate::seqnum::{self, SeqNum};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborState {
    Heard,
    Confirmed,
    Blacklisted,
}

#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub addr: Ipv6Addr,
    pub iface: u32,
    pub state: NeighborState,
    /// Deadline for an outstanding RREP_Ack solicitation; `None` means
    /// nothing pending.
    pub timeout: Option<Instant>,
    pub ackseqnum: u16,
    pub heard_rerr_seqnum: SeqNum,
    state_changed_at: Instant,
}

/// Returned by [`NeighborSet::set_heard`] when a solicitation must be sent.
#[derive(Debug, Clone, Copy)]
pub struct RrepAckRequest {
    pub timestamp: u16,
}

pub struct NeighborSet {
    entries: Vec<Neighbor>,
    capacity: usize,
    max_blacklist_time: std::time::Duration,
    rrep_ack_sent_timeout: std::time::Duration,
}

impl NeighborSet {
    pub fn new(constants: &Constants) -> Self {
        Self {
            entries: Vec::with_capacity(constants.neigh_max_entries),
            capacity: constants.neigh_max_entries,
            max_blacklist_time: constants.max_blacklist_time,
            rrep_ack_sent_timeout: constants.rrep_ack_sent_timeout,
        }
    }

    fn age(&mut self) {
        let now = Instant::now();
        for n in &mut self.entries {
            if n.state == NeighborState::Heard {
                if let Some(t) = n.timeout {
                    if now >= t {
                        n.state = NeighborState::Blacklisted;
                        n.timeout = None;
                        n.state_changed_at = now;
                    }
                }
            } else if n.state == NeighborState::Blacklisted
                && now.duration_since(n.state_changed_at) >= self.max_blacklist_time
            {
                n.state = NeighborState::Heard;
                n.state_changed_at = now;
            }
        }
    }

    fn position(&self, addr: Ipv6Addr, iface: u32) -> Option<usize> {
        self.entries.iter().position(|n| n.addr == addr && n.iface == iface)
    }

    /// `alloc`: find-or-create, seeding a fresh entry in HEARD with a
    /// random initial `ackseqnum`.
    pub fn get_or_create(&mut self, addr: Ipv6Addr, iface: u32) -> Result<&mut Neighbor, SetError> {
        self.age();
        if self.position(addr, iface).is_none() {
            if self.entries.len() >= self.capacity {
                return Err(SetError::Full);
            }
            let now = Instant::now();
            self.entries.push(Neighbor {
                addr,
                iface,
                state: NeighborState::Heard,
                timeout: None,
                ackseqnum: rand::random(),
                heard_rerr_seqnum: SeqNum::UNKNOWN,
                state_changed_at: now,
            });
        }
        let idx = self.position(addr, iface).unwrap();
        Ok(&mut self.entries[idx])
    }

    pub fn find(&mut self, addr: Ipv6Addr, iface: u32) -> Option<&Neighbor> {
        self.age();
        let idx = self.position(addr, iface)?;
        Some(&self.entries[idx])
    }

    /// Clears timeout and moves to HEARD. If `reqack`, arms the RREP_Ack
    /// solicitation and returns the request the caller must enqueue via
    /// the scheduler.
    pub fn set_heard(
        &mut self,
        addr: Ipv6Addr,
        iface: u32,
        reqack: bool,
    ) -> Result<Option<RrepAckRequest>, SetError> {
        let neighbor = self.get_or_create(addr, iface)?;
        let now = Instant::now();
        neighbor.state = NeighborState::Heard;
        neighbor.state_changed_at = now;
        if reqack {
            neighbor.timeout = Some(now + self.rrep_ack_sent_timeout);
            Ok(Some(RrepAckRequest { timestamp: neighbor.ackseqnum }))
        } else {
            neighbor.timeout = None;
            Ok(None)
        }
    }

    /// An RREP_Ack *request* arrived (`ackreq != 0`): adopt the sender's
    /// timestamp so the echoed reply matches it.
    pub fn ack_request(&mut self, addr: Ipv6Addr, iface: u32, timestamp: u16) -> Result<(), SetError> {
        let neighbor = self.get_or_create(addr, iface)?;
        neighbor.ackseqnum = timestamp;
        Ok(())
    }

    /// An RREP_Ack *reply* arrived (`ackreq == 0`). Accepted only for a
    /// HEARD neighbor with a pending solicitation whose timestamp matches;
    /// acceptance moves the neighbor to CONFIRMED. A mismatch bumps
    /// `ackseqnum` so a replayed reply can't be reused.
    pub fn accept_ack_reply(&mut self, addr: Ipv6Addr, iface: u32, timestamp: u16) -> bool {
        self.age();
        let Some(idx) = self.position(addr, iface) else { return false };
        let n = &mut self.entries[idx];
        if n.state == NeighborState::Heard && n.timeout.is_some() && n.ackseqnum == timestamp {
            n.state = NeighborState::Confirmed;
            n.timeout = None;
            n.state_changed_at = Instant::now();
            true
        } else {
            n.ackseqnum = n.ackseqnum.wrapping_add(1);
            false
        }
    }

    pub fn is_blacklisted(&mut self, addr: Ipv6Addr, iface: u32) -> bool {
        self.age();
        matches!(self.position(addr, iface).map(|i| self.entries[i].state), Some(NeighborState::Blacklisted))
    }

    /// Replay guard for RERR timestamps: accept iff `seqnum` is strictly
    /// newer than the last one seen from this neighbor.
    pub fn accept_rerr_seqnum(&mut self, addr: Ipv6Addr, iface: u32, seq: SeqNum) -> Result<bool, SetError> {
        let neighbor = self.get_or_create(addr, iface)?;
        if seqnum::cmp(seq, neighbor.heard_rerr_seqnum) == std::cmp::Ordering::Greater {
            neighbor.heard_rerr_seqnum = seq;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constants() -> Constants {
        Constants { neigh_max_entries: 2, ..Constants::default() }
    }

    fn addr() -> Ipv6Addr {
        "fe80::1".parse().unwrap()
    }

    #[test]
    fn fresh_neighbor_starts_heard() {
        let mut set = NeighborSet::new(&constants());
        let n = set.get_or_create(addr(), 1).unwrap();
        assert_eq!(n.state, NeighborState::Heard);
    }

    #[test]
    fn ack_reply_matching_timestamp_confirms() {
        let mut set = NeighborSet::new(&constants());
        let req = set.set_heard(addr(), 1, true).unwrap().unwrap();
        assert!(set.accept_ack_reply(addr(), 1, req.timestamp));
        assert_eq!(set.find(addr(), 1).unwrap().state, NeighborState::Confirmed);
    }

    #[test]
    fn mismatched_ack_reply_is_dropped_and_bumps_ackseqnum() {
        let mut set = NeighborSet::new(&constants());
        let req = set.set_heard(addr(), 1, true).unwrap().unwrap();
        assert!(!set.accept_ack_reply(addr(), 1, req.timestamp.wrapping_add(1)));
        assert_eq!(set.find(addr(), 1).unwrap().state, NeighborState::Heard);
    }

    #[test]
    fn blacklist_after_timeout_elapses() {
        let mut constants = constants();
        constants.rrep_ack_sent_timeout = std::time::Duration::from_nanos(1);
        let mut set = NeighborSet::new(&constants);
        set.set_heard(addr(), 1, true).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(set.is_blacklisted(addr(), 1));
    }

    #[test]
    fn capacity_is_enforced() {
        let mut set = NeighborSet::new(&constants());
        set.get_or_create("fe80::1".parse().unwrap(), 1).unwrap();
        set.get_or_create("fe80::2".parse().unwrap(), 1).unwrap();
        assert_eq!(set.get_or_create("fe80::3".parse().unwrap(), 1).unwrap_err(), SetError::Full);
    }
}
