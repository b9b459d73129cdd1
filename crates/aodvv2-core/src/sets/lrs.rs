//! Local Route Set: the core's view of routes it has learned, mirrored
//! into the host's forwarding table while ACTIVE or IDLE.

use std::net::Ipv6Addr;
use std::time::Instant;

use crate::config::Constants;
use crate::metric::MetricType;
use crate::seqnum::{self, SeqNum};
use crate::sets::prefix_match;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Unconfirmed,
    Idle,
    Active,
    Invalid,
}

#[derive(Debug, Clone, Copy)]
pub struct LocalRoute {
    pub addr: Ipv6Addr,
    pub pfx_len: u8,
    pub metric_type: MetricType,
    pub next_hop: Ipv6Addr,
    pub iface: u32,
    pub seqnum: SeqNum,
    pub metric: u8,
    pub seqnortr: SeqNum,
    pub last_used: Instant,
    pub last_seqnum_update: Instant,
    pub state: RouteState,
    state_changed_at: Instant,
}

/// An advertised route, as carried by an incoming RREQ/RREP, fed to
/// [`Lrs::process`].
#[derive(Debug, Clone, Copy)]
pub struct AdvRoute {
    pub addr: Ipv6Addr,
    pub pfx_len: u8,
    pub metric_type: MetricType,
    pub next_hop: Ipv6Addr,
    pub iface: u32,
    pub seqnum: SeqNum,
    pub metric: u8,
    pub seqnortr: SeqNum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LrsOutcome {
    Created,
    Updated,
    NotImproved,
    Full,
}

/// A forwarding-table mutation the core owes the host stack. Raised by
/// [`Lrs::process`] and [`Lrs::age`]; the caller (the message engine) is
/// responsible for actually calling the host's FIB trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FibOp {
    Add { prefix: Ipv6Addr, pfx_len: u8, next_hop: Ipv6Addr, iface: u32 },
    Remove { prefix: Ipv6Addr, pfx_len: u8 },
}

pub struct Lrs {
    entries: Vec<LocalRoute>,
    capacity: usize,
    active_interval: std::time::Duration,
    max_idletime: std::time::Duration,
    max_seqnum_lifetime: std::time::Duration,
}

impl Lrs {
    pub fn new(constants: &Constants) -> Self {
        Self {
            entries: Vec::with_capacity(constants.lrs_max_entries),
            capacity: constants.lrs_max_entries,
            active_interval: constants.active_interval,
            max_idletime: constants.max_idletime,
            max_seqnum_lifetime: constants.max_seqnum_lifetime,
        }
    }

    /// Lazy aging: ACTIVE -> IDLE after `active_interval` unused, IDLE ->
    /// INVALID after `max_idletime`, INVALID expunged after
    /// `max_seqnum_lifetime`. Returns the FIB removals this produced.
    pub fn age(&mut self) -> Vec<FibOp> {
        let now = Instant::now();
        let mut ops = Vec::new();
        for r in &mut self.entries {
            if r.state == RouteState::Active && now.duration_since(r.last_used) > self.active_interval {
                r.state = RouteState::Idle;
                r.state_changed_at = now;
            }
            if r.state == RouteState::Idle && now.duration_since(r.state_changed_at) > self.max_idletime {
                r.state = RouteState::Invalid;
                r.state_changed_at = now;
                ops.push(FibOp::Remove { prefix: r.addr, pfx_len: r.pfx_len });
            }
        }
        self.entries.retain(|r| {
            !(r.state == RouteState::Invalid && now.duration_since(r.state_changed_at) > self.max_seqnum_lifetime)
        });
        ops
    }

    fn find_key_mut(
        &mut self,
        addr: Ipv6Addr,
        pfx_len: u8,
        metric_type: MetricType,
        seqnortr: SeqNum,
    ) -> Option<usize> {
        self.entries.iter().position(|r| {
            r.addr == addr && r.pfx_len == pfx_len && r.metric_type == metric_type && r.seqnortr == seqnortr
        })
    }

    /// `find(dst)`: longest-prefix match over entries that are not
    /// INVALID.
    pub fn find(&mut self, dst: Ipv6Addr) -> Option<&LocalRoute> {
        self.age();
        self.entries
            .iter()
            .filter(|r| r.state != RouteState::Invalid && prefix_match(&dst, &r.addr, r.pfx_len))
            .max_by_key(|r| r.pfx_len)
    }

    /// Record that a route was used to forward traffic, resetting its
    /// ACTIVE_INTERVAL clock and reactivating it if it was IDLE (the FIB
    /// row already exists for IDLE routes, so no [`FibOp`] is produced).
    pub fn mark_used(&mut self, addr: Ipv6Addr, pfx_len: u8, metric_type: MetricType, seqnortr: SeqNum) {
        if let Some(idx) = self.find_key_mut(addr, pfx_len, metric_type, seqnortr) {
            let r = &mut self.entries[idx];
            r.last_used = Instant::now();
            if r.state == RouteState::Idle {
                r.state = RouteState::Active;
            }
        }
    }

    fn offers_improvement(existing: &LocalRoute, adv: &AdvRoute) -> bool {
        match seqnum::cmp(adv.seqnum, existing.seqnum) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => adv.metric < existing.metric,
            std::cmp::Ordering::Less => false,
        }
    }

    /// `process(AdvRoute)`: accept a newly advertised route if it's new,
    /// or strictly fresher / strictly cheaper at equal freshness than the
    /// entry with the same identity key.
    pub fn process(&mut self, adv: AdvRoute) -> (LrsOutcome, Vec<FibOp>) {
        let mut ops = self.age();
        let now = Instant::now();

        match self.find_key_mut(adv.addr, adv.pfx_len, adv.metric_type, adv.seqnortr) {
            None => {
                if self.entries.len() >= self.capacity {
                    return (LrsOutcome::Full, ops);
                }
                self.entries.push(LocalRoute {
                    addr: adv.addr,
                    pfx_len: adv.pfx_len,
                    metric_type: adv.metric_type,
                    next_hop: adv.next_hop,
                    iface: adv.iface,
                    seqnum: adv.seqnum,
                    metric: adv.metric,
                    seqnortr: adv.seqnortr,
                    last_used: now,
                    last_seqnum_update: now,
                    state: RouteState::Active,
                    state_changed_at: now,
                });
                ops.push(FibOp::Add { prefix: adv.addr, pfx_len: adv.pfx_len, next_hop: adv.next_hop, iface: adv.iface });
                (LrsOutcome::Created, ops)
            }
            Some(idx) => {
                let existing = self.entries[idx];
                if !Self::offers_improvement(&existing, &adv) {
                    return (LrsOutcome::NotImproved, ops);
                }
                let was_mirrored = matches!(existing.state, RouteState::Active | RouteState::Idle);
                let route_changed = existing.next_hop != adv.next_hop || existing.iface != adv.iface;

                let r = &mut self.entries[idx];
                r.next_hop = adv.next_hop;
                r.iface = adv.iface;
                r.seqnum = adv.seqnum;
                r.metric = adv.metric;
                r.last_seqnum_update = now;
                r.last_used = now;
                r.state = RouteState::Active;
                r.state_changed_at = now;

                if !was_mirrored || route_changed {
                    ops.push(FibOp::Add { prefix: adv.addr, pfx_len: adv.pfx_len, next_hop: adv.next_hop, iface: adv.iface });
                }
                (LrsOutcome::Updated, ops)
            }
        }
    }

    /// RERR ingress: mark every entry matching `(prefix, pfx_len)` INVALID,
    /// removing its FIB row if it was mirrored there.
    pub fn invalidate(&mut self, prefix: Ipv6Addr, pfx_len: u8) -> Vec<FibOp> {
        let now = Instant::now();
        let mut ops = Vec::new();
        for r in &mut self.entries {
            if r.addr == prefix && r.pfx_len == pfx_len && r.state != RouteState::Invalid {
                let was_mirrored = matches!(r.state, RouteState::Active | RouteState::Idle);
                r.state = RouteState::Invalid;
                r.state_changed_at = now;
                if was_mirrored {
                    ops.push(FibOp::Remove { prefix: r.addr, pfx_len: r.pfx_len });
                }
            }
        }
        ops
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalRoute> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adv(seq: u16, metric: u8) -> AdvRoute {
        AdvRoute {
            addr: "fc00:b::".parse().unwrap(),
            pfx_len: 64,
            metric_type: MetricType::HOP_COUNT,
            next_hop: "fe80::1".parse().unwrap(),
            iface: 1,
            seqnum: SeqNum(seq),
            metric,
            seqnortr: SeqNum::UNKNOWN,
        }
    }

    #[test]
    fn first_advertisement_is_created_and_mirrored() {
        let mut lrs = Lrs::new(&Constants::default());
        let (outcome, ops) = lrs.process(adv(1, 1));
        assert_eq!(outcome, LrsOutcome::Created);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], FibOp::Add { .. }));
    }

    #[test]
    fn p3_stale_seqnum_does_not_improve() {
        let mut lrs = Lrs::new(&Constants::default());
        lrs.process(adv(5, 1));
        let (outcome, ops) = lrs.process(adv(3, 0));
        assert_eq!(outcome, LrsOutcome::NotImproved);
        assert!(ops.is_empty());
    }

    #[test]
    fn equal_seqnum_lower_metric_improves() {
        let mut lrs = Lrs::new(&Constants::default());
        lrs.process(adv(5, 3));
        let (outcome, _) = lrs.process(adv(5, 1));
        assert_eq!(outcome, LrsOutcome::Updated);
    }

    #[test]
    fn find_excludes_invalid_routes() {
        let mut lrs = Lrs::new(&Constants::default());
        lrs.process(adv(1, 1));
        assert!(lrs.find("fc00:b::1".parse().unwrap()).is_some());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut constants = Constants::default();
        constants.lrs_max_entries = 1;
        let mut lrs = Lrs::new(&constants);
        lrs.process(adv(1, 1));
        let mut other = adv(1, 1);
        other.addr = "fc00:c::".parse().unwrap();
        let (outcome, _) = lrs.process(other);
        assert_eq!(outcome, LrsOutcome::Full);
    }
}
