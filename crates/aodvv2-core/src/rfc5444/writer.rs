//! Writer/aggregation side of the codec. Each transmission target (one
//! multicast or unicast destination on one interface) accumulates messages
//! into a packet buffer up to `packet_size`; a message that doesn't fit
//! flushes the buffer first ("fit or flush"). A timer independent of this
//! module decides when an under-full buffer should be flushed anyway
//! (`RFC5444_AGGREGATION_TIME`); this module only implements the
//! size-driven half.

use std::net::Ipv6Addr;
use std::time::Instant;

use crate::error::Rfc5444Error;
use crate::rfc5444::message::Message;
use crate::rfc5444::packet::Packet;

/// One pending, not-yet-flushed packet bound for `dst`.
pub struct Target {
    pub dst: Ipv6Addr,
    pub iface: u32,
    packet_size: usize,
    pending: Packet,
    /// Set when the buffer held at least one message and hasn't been
    /// flushed since; used to decide whether a timer-driven flush has
    /// anything to do.
    dirty: bool,
    first_queued_at: Option<Instant>,
}

impl Target {
    pub fn new(dst: Ipv6Addr, iface: u32, packet_size: usize) -> Self {
        Self {
            dst,
            iface,
            packet_size,
            pending: Packet::default(),
            dirty: false,
            first_queued_at: None,
        }
    }

    /// Queue `msg` for this target, flushing the current buffer first if it
    /// wouldn't fit alongside what's already pending. Returns a flushed
    /// packet's bytes if a flush happened as a side effect of making room.
    pub fn queue(&mut self, msg: Message) -> Result<Option<Vec<u8>>, Rfc5444Error> {
        let mut candidate = self.pending.clone();
        candidate.messages.push(msg.clone());
        let encoded = candidate.encode()?;

        if encoded.len() <= self.packet_size || self.pending.messages.is_empty() {
            // Either it fits, or it's a single message that will never fit
            // regardless of what else is queued — let it through alone so
            // the caller can see the oversize error at send time instead of
            // silently dropping it here.
            self.pending = candidate;
            self.dirty = true;
            if self.first_queued_at.is_none() {
                self.first_queued_at = Some(Instant::now());
            }
            return Ok(None);
        }

        let flushed = self.flush()?;
        self.pending.messages.push(msg);
        self.dirty = true;
        self.first_queued_at = Some(Instant::now());
        Ok(flushed)
    }

    /// True once the aggregation timer should fire for this target, given
    /// the configured aggregation window.
    pub fn aggregation_deadline_elapsed(&self, window: std::time::Duration) -> bool {
        match self.first_queued_at {
            Some(t) => self.dirty && t.elapsed() >= window,
            None => false,
        }
    }

    /// Force out whatever is pending, resetting the buffer. Returns `None`
    /// if there was nothing to send.
    pub fn flush(&mut self) -> Result<Option<Vec<u8>>, Rfc5444Error> {
        if self.pending.messages.is_empty() {
            return Ok(None);
        }
        let bytes = self.pending.encode()?;
        self.pending = Packet::default();
        self.dirty = false;
        self.first_queued_at = None;
        Ok(Some(bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.messages.is_empty()
    }
}

/// Owns one [`Target`] per destination/interface pair and routes queued
/// messages to the right one, creating targets on first use.
#[derive(Default)]
pub struct Writer {
    targets: Vec<Target>,
    packet_size: usize,
}

impl Writer {
    pub fn new(packet_size: usize) -> Self {
        Self { targets: Vec::new(), packet_size }
    }

    fn target_mut(&mut self, dst: Ipv6Addr, iface: u32) -> &mut Target {
        if let Some(i) = self.targets.iter().position(|t| t.dst == dst && t.iface == iface) {
            return &mut self.targets[i];
        }
        self.targets.push(Target::new(dst, iface, self.packet_size));
        self.targets.last_mut().unwrap()
    }

    pub fn queue(
        &mut self,
        dst: Ipv6Addr,
        iface: u32,
        msg: Message,
    ) -> Result<Option<Vec<u8>>, Rfc5444Error> {
        self.target_mut(dst, iface).queue(msg)
    }

    /// Flush every target whose aggregation window has elapsed, returning
    /// `(dst, iface, bytes)` for each one actually sent.
    pub fn flush_due(&mut self, window: std::time::Duration) -> Vec<(Ipv6Addr, u32, Vec<u8>)> {
        let mut out = Vec::new();
        for t in &mut self.targets {
            if t.aggregation_deadline_elapsed(window) {
                if let Ok(Some(bytes)) = t.flush() {
                    out.push((t.dst, t.iface, bytes));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn msg() -> Message {
        Message::new(10, 16)
    }

    #[test]
    fn small_messages_aggregate_into_one_packet() {
        let mut target = Target::new(Ipv6Addr::LOCALHOST, 1, 1024);
        assert!(target.queue(msg()).unwrap().is_none());
        assert!(target.queue(msg()).unwrap().is_none());
        let flushed = target.flush().unwrap().unwrap();
        let decoded = Packet::decode(&flushed).unwrap();
        assert_eq!(decoded.messages.len(), 2);
    }

    #[test]
    fn oversized_message_flushes_existing_buffer_first() {
        let mut target = Target::new(Ipv6Addr::LOCALHOST, 1, 20);
        assert!(target.queue(msg()).unwrap().is_none());
        // second message won't fit in the remaining budget: flush happens
        let flushed = target.queue(msg()).unwrap();
        assert!(flushed.is_some());
        assert!(!target.is_empty());
    }

    #[test]
    fn aggregation_window_is_relative_to_first_queued_message() {
        let mut target = Target::new(Ipv6Addr::LOCALHOST, 1, 1024);
        assert!(!target.aggregation_deadline_elapsed(Duration::from_secs(3600)));
        target.queue(msg()).unwrap();
        assert!(!target.aggregation_deadline_elapsed(Duration::from_secs(3600)));
        assert!(target.aggregation_deadline_elapsed(Duration::from_nanos(0)));
    }

    #[test]
    fn writer_routes_by_destination_and_interface() {
        let mut writer = Writer::new(1024);
        let a = "ff02::6d".parse().unwrap();
        let b = "fc00::1".parse().unwrap();
        writer.queue(a, 1, msg()).unwrap();
        writer.queue(b, 1, msg()).unwrap();
        assert_eq!(writer.targets.len(), 2);
    }
}
