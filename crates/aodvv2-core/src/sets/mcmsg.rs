//! Multicast Message Set: duplicate suppression for received RREQs.

use std::net::Ipv6Addr;
use std::time::Instant;

use crate::config::Constants;
use crate::metric::MetricType;
use crate::seqnum::{self, SeqNum};

#[derive(Debug, Clone, Copy)]
pub struct McmsgEntry {
    pub orig_prefix: Ipv6Addr,
    pub orig_pfx_len: u8,
    pub targ_prefix: Ipv6Addr,
    pub orig_seqnum: SeqNum,
    pub targ_seqnum: SeqNum,
    pub metric_type: MetricType,
    pub metric: u8,
    pub seqnortr: SeqNum,
    pub iface: u32,
    timestamp: Instant,
    removal_time: Instant,
}

impl McmsgEntry {
    fn compatible(&self, other: &IncomingRreq) -> bool {
        self.orig_prefix == other.orig_prefix
            && self.orig_pfx_len == other.orig_pfx_len
            && self.targ_prefix == other.targ_prefix
            && self.metric_type == other.metric_type
    }

    fn comparable(&self, other: &IncomingRreq) -> bool {
        self.compatible(other) && self.seqnortr == other.seqnortr
    }
}

/// A just-received RREQ, as fed to [`Mcmsg::process`].
#[derive(Debug, Clone, Copy)]
pub struct IncomingRreq {
    pub orig_prefix: Ipv6Addr,
    pub orig_pfx_len: u8,
    pub targ_prefix: Ipv6Addr,
    pub orig_seqnum: SeqNum,
    pub targ_seqnum: SeqNum,
    pub metric_type: MetricType,
    pub metric: u8,
    pub seqnortr: SeqNum,
    pub iface: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McmsgOutcome {
    Accepted,
    Redundant,
    Full,
}

pub struct Mcmsg {
    entries: Vec<McmsgEntry>,
    capacity: usize,
    entry_lifetime: std::time::Duration,
}

impl Mcmsg {
    pub fn new(constants: &Constants) -> Self {
        Self {
            entries: Vec::with_capacity(constants.mcmsg_max_entries),
            capacity: constants.mcmsg_max_entries,
            entry_lifetime: constants.max_seqnum_lifetime,
        }
    }

    fn reclaim_stale(&mut self) {
        let now = Instant::now();
        self.entries.retain(|e| e.removal_time > now);
    }

    /// `process(incoming)`: accept, or mark redundant, per the draft's
    /// compatible/comparable McMsg suppression rule.
    pub fn process(&mut self, incoming: IncomingRreq) -> McmsgOutcome {
        self.reclaim_stale();
        let now = Instant::now();

        let comparable_idx = self.entries.iter().position(|e| e.comparable(&incoming));
        let Some(idx) = comparable_idx else {
            if self.entries.len() >= self.capacity {
                // McMsg may reclaim the oldest-by-timestamp entry.
                if let Some((oldest, _)) =
                    self.entries.iter().enumerate().min_by_key(|(_, e)| e.timestamp)
                {
                    self.entries.remove(oldest);
                } else {
                    return McmsgOutcome::Full;
                }
            }
            self.entries.push(McmsgEntry {
                orig_prefix: incoming.orig_prefix,
                orig_pfx_len: incoming.orig_pfx_len,
                targ_prefix: incoming.targ_prefix,
                orig_seqnum: incoming.orig_seqnum,
                targ_seqnum: incoming.targ_seqnum,
                metric_type: incoming.metric_type,
                metric: incoming.metric,
                seqnortr: incoming.seqnortr,
                iface: incoming.iface,
                timestamp: now,
                removal_time: now + self.entry_lifetime,
            });
            return McmsgOutcome::Accepted;
        };

        let existing = self.entries[idx];
        let seq_cmp = seqnum::cmp(incoming.orig_seqnum, existing.orig_seqnum);
        if seq_cmp == std::cmp::Ordering::Less
            || (seq_cmp == std::cmp::Ordering::Equal && incoming.metric >= existing.metric)
        {
            return McmsgOutcome::Redundant;
        }

        let e = &mut self.entries[idx];
        e.orig_seqnum = incoming.orig_seqnum;
        e.targ_seqnum = incoming.targ_seqnum;
        e.metric = incoming.metric;
        e.timestamp = now;
        e.removal_time = now + self.entry_lifetime;
        let updated_metric = incoming.metric;

        let any_no_worse = self
            .entries
            .iter()
            .enumerate()
            .filter(|(i, e)| *i != idx && e.removal_time > now && e.compatible(&incoming))
            .any(|(_, e)| e.metric <= updated_metric);

        if any_no_worse {
            McmsgOutcome::Redundant
        } else {
            McmsgOutcome::Accepted
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &McmsgEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> IncomingRreq {
        IncomingRreq {
            orig_prefix: "fc00:a::".parse().unwrap(),
            orig_pfx_len: 64,
            targ_prefix: "fc00:b::".parse().unwrap(),
            orig_seqnum: SeqNum(1),
            targ_seqnum: SeqNum::UNKNOWN,
            metric_type: MetricType::HOP_COUNT,
            metric: 2,
            seqnortr: SeqNum::UNKNOWN,
            iface: 1,
        }
    }

    #[test]
    fn first_sighting_is_accepted() {
        let mut mcmsg = Mcmsg::new(&Constants::default());
        assert_eq!(mcmsg.process(base()), McmsgOutcome::Accepted);
    }

    #[test]
    fn p4_older_or_equal_no_improvement_is_redundant() {
        let mut mcmsg = Mcmsg::new(&Constants::default());
        mcmsg.process(base());
        let mut dup = base();
        dup.metric = 5; // equal seqnum, worse metric
        assert_eq!(mcmsg.process(dup), McmsgOutcome::Redundant);
    }

    #[test]
    fn newer_seqnum_with_improvement_is_accepted() {
        let mut mcmsg = Mcmsg::new(&Constants::default());
        mcmsg.process(base());
        let mut fresher = base();
        fresher.orig_seqnum = SeqNum(2);
        fresher.metric = 1;
        assert_eq!(mcmsg.process(fresher), McmsgOutcome::Accepted);
    }

    #[test]
    fn reclaims_oldest_when_full() {
        let mut constants = Constants::default();
        constants.mcmsg_max_entries = 1;
        let mut mcmsg = Mcmsg::new(&constants);
        mcmsg.process(base());
        let mut other = base();
        other.targ_prefix = "fc00:c::".parse().unwrap();
        other.seqnortr = SeqNum(7); // not comparable with the first
        assert_eq!(mcmsg.process(other), McmsgOutcome::Accepted);
        assert_eq!(mcmsg.entries.len(), 1);
    }
}
