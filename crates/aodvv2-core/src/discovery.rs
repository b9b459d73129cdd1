//! Route-discovery driver (C7): `on_route_needed(packet, dst)`, fired by
//! the host stack when it has a packet but no forwarding-table entry for
//! its destination.

use std::net::Ipv6Addr;

use crate::engine::{is_global_unicast, RreqOut};
use crate::host::OriginatorLookup;
use crate::metric::MetricType;
use crate::scheduler::{Destination, MessageBody, Priority, Scheduler};
use crate::seqnum::{SeqNum, SeqNumCounter};
use crate::sets::{Buffer, Lrs, Rcs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// A RREQ was enqueued for `dst`.
    RreqSent,
    /// Not a global-unicast destination; nothing was done.
    NotGlobalUnicast,
    /// `packet`'s source does not match a Router Client; we do not
    /// originate discovery on behalf of foreign sources.
    SourceNotOurClient,
    /// The buffered-packet set was already full.
    BufferFull,
    /// The scheduler's queue had no lower-priority entry to evict.
    QueueFull,
}

/// `on_route_needed`: buffer `packet`, consult LRS, and originate a RREQ
/// for `dst` if we're allowed to. `iface` is the interface discovery
/// traffic should be sent on.
pub fn on_route_needed<P>(
    rcs: &Rcs,
    lrs: &mut Lrs,
    buffer: &mut Buffer<P>,
    scheduler: &Scheduler,
    own_seqnum: &mut SeqNumCounter,
    originator: &dyn OriginatorLookup,
    iface: u32,
    source: Ipv6Addr,
    dst: Ipv6Addr,
    packet: P,
) -> DiscoveryOutcome {
    if !is_global_unicast(dst) {
        return DiscoveryOutcome::NotGlobalUnicast;
    }

    let Some(client) = rcs.find(source) else {
        return DiscoveryOutcome::SourceNotOurClient;
    };
    let client_addr = originator.source_for(client.addr).unwrap_or(client.addr);
    let client_pfx_len = client.pfx_len;
    let client_cost = client.cost;

    if buffer.push(dst, packet).is_err() {
        return DiscoveryOutcome::BufferFull;
    }

    let existing = lrs.find(dst);
    let targ_seqnum = existing.map(|r| r.seqnum).unwrap_or(SeqNum::UNKNOWN);

    let body = RreqOut {
        hop_limit: crate::config::MAX_HOPCOUNT as u8,
        orig_prefix: client_addr,
        orig_pfx_len: client_pfx_len,
        targ_prefix: dst,
        targ_pfx_len: 128,
        orig_seqnum: own_seqnum.new_seqnum(),
        targ_seqnum,
        metric_type: MetricType::HOP_COUNT,
        orig_metric: client_cost,
        seqnortr: None,
    };

    match scheduler.enqueue(Priority::Rreq, MessageBody::Rreq(body), Destination::AllTargets, iface) {
        Ok(()) => DiscoveryOutcome::RreqSent,
        Err(_) => DiscoveryOutcome::QueueFull,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Constants;

    struct IdentityLookup;
    impl OriginatorLookup for IdentityLookup {
        fn source_for(&self, client_addr: Ipv6Addr) -> Option<Ipv6Addr> {
            Some(client_addr)
        }
    }

    fn harness() -> (Rcs, Lrs, Buffer<u32>, Scheduler, SeqNumCounter, Constants) {
        let constants = Constants::default();
        (
            Rcs::new(constants.rcs_max_entries),
            Lrs::new(&constants),
            Buffer::new(constants.buffer_max_entries),
            Scheduler::new(&constants),
            SeqNumCounter::new(&constants),
            constants,
        )
    }

    #[test]
    fn unknown_destination_buffers_and_sends_rreq() {
        let (mut rcs, mut lrs, mut buffer, scheduler, mut seq, _) = harness();
        rcs.add("fc00:a::".parse().unwrap(), 64, 1).unwrap();

        let outcome = on_route_needed(
            &rcs,
            &mut lrs,
            &mut buffer,
            &scheduler,
            &mut seq,
            &IdentityLookup,
            1,
            "fc00:a::1".parse().unwrap(),
            "fc00:b::1".parse().unwrap(),
            42u32,
        );
        assert_eq!(outcome, DiscoveryOutcome::RreqSent);
        assert_eq!(buffer.len(), 1);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn foreign_source_is_rejected() {
        let (rcs, mut lrs, mut buffer, scheduler, mut seq, _) = harness();
        let outcome = on_route_needed(
            &rcs,
            &mut lrs,
            &mut buffer,
            &scheduler,
            &mut seq,
            &IdentityLookup,
            1,
            "fc00:a::1".parse().unwrap(),
            "fc00:b::1".parse().unwrap(),
            42u32,
        );
        assert_eq!(outcome, DiscoveryOutcome::SourceNotOurClient);
        assert!(buffer.is_empty());
    }

    #[test]
    fn non_global_destination_is_rejected() {
        let (mut rcs, mut lrs, mut buffer, scheduler, mut seq, _) = harness();
        rcs.add("fc00:a::".parse().unwrap(), 64, 1).unwrap();
        let outcome = on_route_needed(
            &rcs,
            &mut lrs,
            &mut buffer,
            &scheduler,
            &mut seq,
            &IdentityLookup,
            1,
            "fc00:a::1".parse().unwrap(),
            "fe80::1".parse().unwrap(),
            42u32,
        );
        assert_eq!(outcome, DiscoveryOutcome::NotGlobalUnicast);
    }
}
