//! Message engine (C5): validates and processes incoming RREQ/RREP/RERR/
//! RREP_Ack, and serializes outgoing ones. Operates on already-decoded
//! [`Message`] values — the generic [`crate::rfc5444::reader`] dispatch
//! pipeline is the right layer for TLV-producer/consumer extensibility,
//! but AODVv2's own procedures (§4.5) are multi-step validations over a
//! whole message at once, so the engine reads `Message` fields directly
//! rather than rebuilding the same state through per-address callbacks.

use std::net::Ipv6Addr;

use crate::config::Constants;
use crate::host::OriginatorLookup;
use crate::metric::MetricType;
use crate::rfc5444::message::{AddrBlock, Message};
use crate::rfc5444::reader::tlv_applies_to;
use crate::rfc5444::tlv::{AddrIndex, Tlv};
use crate::scheduler::{Destination, MessageBody, Priority};
use crate::seqnum::{self, SeqNum, SeqNumCounter};
use crate::sets::mcmsg::{IncomingRreq, Mcmsg, McmsgOutcome};
use crate::sets::neighbor::NeighborSet;
use crate::sets::{FibOp, Lrs, LrsOutcome, Rcs};

pub mod msgtype {
    pub const RREQ: u8 = 10;
    pub const RREP: u8 = 11;
    pub const RERR: u8 = 12;
    pub const RREP_ACK: u8 = 13;
}

mod msgtlv {
    pub const ACKREQ: u8 = 1;
    pub const TIMESTAMP: u8 = 6; // RFC 7182 TIMESTAMP code
}

mod addrtlv {
    pub const ADDRESS_TYPE: u8 = 1;
    pub const SEQ_NUM: u8 = 2;
    pub const PATH_METRIC: u8 = 3;
}

pub mod addrtype {
    pub const UNSPECIFIED: u8 = 0;
    pub const ORIGPREFIX: u8 = 1;
    pub const TARGPREFIX: u8 = 2;
}

/// A route egress payload, carrying what [`crate::engine`]'s send-side
/// helpers need to build the wire message. Defaults are the all-zero /
/// unspecified values; real traffic always fills every field.
#[derive(Debug, Clone, Default)]
pub struct RreqOut {
    pub hop_limit: u8,
    pub orig_prefix: Ipv6Addr,
    pub orig_pfx_len: u8,
    pub targ_prefix: Ipv6Addr,
    pub targ_pfx_len: u8,
    pub orig_seqnum: SeqNum,
    pub targ_seqnum: SeqNum,
    pub metric_type: MetricType,
    pub orig_metric: u8,
    pub seqnortr: Option<SeqNum>,
}

#[derive(Debug, Clone, Default)]
pub struct RrepOut {
    pub hop_limit: u8,
    pub orig_prefix: Ipv6Addr,
    pub orig_pfx_len: u8,
    pub targ_prefix: Ipv6Addr,
    pub targ_pfx_len: u8,
    pub targ_seqnum: SeqNum,
    pub metric_type: MetricType,
    pub targ_metric: u8,
    pub seqnortr: Option<SeqNum>,
}

#[derive(Debug, Clone, Default)]
pub struct RerrOut {
    pub unreachable_prefix: Ipv6Addr,
    pub unreachable_pfx_len: u8,
    pub seqnum: SeqNum,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RrepAckOut {
    pub ackreq: bool,
    pub timestamp: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct QueuedSend {
    pub priority: Priority,
    pub destination: Destination,
    pub iface: u32,
}

/// Side effects an ingress step owes the rest of the system: FIB mutations
/// for the host stack, messages to hand to the scheduler, and — if a
/// route was created or improved — a prefix to release buffered packets
/// for.
#[derive(Debug, Default)]
pub struct IngressOutcome {
    pub fib_ops: Vec<FibOp>,
    pub enqueue: Vec<(QueuedSend, MessageBody)>,
    pub icmp_unreachable: bool,
    pub release_buffer_for: Option<(Ipv6Addr, u8)>,
    pub dropped: Option<&'static str>,
}

impl IngressOutcome {
    fn drop_with(reason: &'static str) -> Self {
        Self { dropped: Some(reason), ..Default::default() }
    }
}

pub(crate) fn is_global_unicast(addr: Ipv6Addr) -> bool {
    !addr.is_unspecified()
        && !addr.is_loopback()
        && !addr.is_multicast()
        && (addr.segments()[0] & 0xffc0) != 0xfe80 // link-local
}

struct AddrTlvView<'a> {
    block: &'a AddrBlock,
}

impl<'a> AddrTlvView<'a> {
    fn value(&self, index: usize, tlv_type: u8, type_ext: Option<u8>) -> Option<&'a [u8]> {
        self.block
            .tlvs
            .iter()
            .find(|t| t.tlv_type == tlv_type && t.type_ext == type_ext && tlv_applies_to(t, index))
            .and_then(|t| t.value.as_deref())
    }

    fn seq_num(&self, index: usize) -> SeqNum {
        match self.value(index, addrtlv::SEQ_NUM, None) {
            Some([hi, lo]) => SeqNum(u16::from_be_bytes([*hi, *lo])),
            _ => SeqNum::UNKNOWN,
        }
    }

    fn metric(&self, index: usize, metric_type: MetricType) -> Option<u8> {
        match self.value(index, addrtlv::PATH_METRIC, Some(metric_type.0)) {
            Some([m]) => Some(*m),
            _ => None,
        }
    }

    fn metric_type(&self, index: usize) -> Option<MetricType> {
        self.block
            .tlvs
            .iter()
            .find(|t| t.tlv_type == addrtlv::PATH_METRIC && tlv_applies_to(t, index))
            .and_then(|t| t.type_ext)
            .map(MetricType)
    }

    fn address_type(&self, index: usize) -> Option<u8> {
        self.value(index, addrtlv::ADDRESS_TYPE, None).and_then(|v| v.first().copied())
    }
}

/// Find the address positions tagged ORIGPREFIX / TARGPREFIX / UNSPECIFIED
/// (SeqNoRtr) in the message's (only) address block.
fn route_addrs(msg: &Message) -> Option<(usize, usize, Option<usize>)> {
    let block = msg.addr_blocks.first()?;
    let view = AddrTlvView { block };
    let mut orig = None;
    let mut targ = None;
    let mut seqnortr = None;
    for i in 0..block.addrs.len() {
        match view.address_type(i) {
            Some(addrtype::ORIGPREFIX) => orig = Some(i),
            Some(addrtype::TARGPREFIX) => targ = Some(i),
            Some(addrtype::UNSPECIFIED) => seqnortr = Some(i),
            _ => {}
        }
    }
    Some((orig?, targ?, seqnortr))
}

pub struct Ingress<'a> {
    pub rcs: &'a Rcs,
    pub lrs: &'a mut Lrs,
    pub mcmsg: &'a mut Mcmsg,
    pub neighbors: &'a mut NeighborSet,
    pub own_seqnum: &'a mut SeqNumCounter,
    pub constants: &'a Constants,
    /// Resolves the address a self-originated message should carry on
    /// behalf of a Router Client, per §6's "ask the stack for matching
    /// source addresses when emitting messages it originates".
    pub originator: &'a dyn OriginatorLookup,
}

/// Records a sighting of `sender` in the Neighbor Set, requesting an
/// RREP_Ack handshake exactly when `confirm_link` signals we just started
/// relying on it as a forwarding next hop (§4.4 / glossary "RREP_Ack").
/// Returns `true` if the caller must drop the whole ingress message
/// (Neighbor Set full, a resource-exhaustion drop per §7).
fn note_sighting(ctx: &mut Ingress<'_>, sender: Ipv6Addr, iface: u32, confirm_link: bool, outcome: &mut IngressOutcome) -> bool {
    match ctx.neighbors.set_heard(sender, iface, confirm_link) {
        Ok(Some(req)) => {
            outcome.enqueue.push((
                QueuedSend { priority: Priority::RrepAck, destination: Destination::Unicast(sender), iface },
                MessageBody::RrepAck(RrepAckOut { ackreq: true, timestamp: req.timestamp }),
            ));
            false
        }
        Ok(None) => false,
        Err(_) => {
            outcome.dropped = Some("neighbor set full");
            true
        }
    }
}

/// RREQ ingress (§4.5 steps 1-8).
pub fn process_rreq(ctx: &mut Ingress<'_>, sender: Ipv6Addr, iface: u32, msg: &Message) -> IngressOutcome {
    if ctx.neighbors.is_blacklisted(sender, iface) {
        return IngressOutcome::drop_with("sender blacklisted");
    }

    let Some((oi, ti, seqnortr_i)) = route_addrs(msg) else {
        return IngressOutcome::drop_with("missing OrigPrefix/TargPrefix");
    };
    let block = &msg.addr_blocks[0];
    let view = AddrTlvView { block };
    let orig = block.addrs[oi].clone();
    let targ = block.addrs[ti].clone();
    let seqnortr = seqnortr_i.map(|i| view.seq_num(i)).unwrap_or(SeqNum::UNKNOWN);

    let Some(hop_limit) = msg.hop_limit else { return IngressOutcome::drop_with("no hop limit") };
    if hop_limit == 0 {
        return IngressOutcome::drop_with("hop limit exhausted");
    }
    let orig_addr: Ipv6Addr = match <[u8; 16]>::try_from(orig.addr.as_slice()) {
        Ok(b) => Ipv6Addr::from(b),
        Err(_) => return IngressOutcome::drop_with("bad address length"),
    };
    let targ_addr: Ipv6Addr = match <[u8; 16]>::try_from(targ.addr.as_slice()) {
        Ok(b) => Ipv6Addr::from(b),
        Err(_) => return IngressOutcome::drop_with("bad address length"),
    };
    if !is_global_unicast(orig_addr) || !is_global_unicast(targ_addr) {
        return IngressOutcome::drop_with("non-global-unicast prefix");
    }

    let orig_seqnum = view.seq_num(oi);
    if orig_seqnum.is_unknown() {
        return IngressOutcome::drop_with("OrigSeqNum unknown");
    }
    let targ_seqnum = view.seq_num(ti);

    let Some(metric_type) = view.metric_type(oi) else {
        return IngressOutcome::drop_with("no metric type");
    };
    if !metric_type.is_supported() {
        let client_match = ctx.rcs.find(targ_addr).is_some();
        let mut outcome = IngressOutcome::drop_with("unsupported metric type");
        outcome.icmp_unreachable = client_match;
        return outcome;
    }
    let current_metric = view.metric(oi, metric_type).unwrap_or(0);
    let Some(updated_metric) = metric_type.update(current_metric) else {
        return IngressOutcome::drop_with("metric ceiling reached");
    };

    let mut outcome = IngressOutcome::default();

    let (lrs_result, fib_ops) = ctx.lrs.process(crate::sets::AdvRoute {
        addr: orig_addr,
        pfx_len: orig.pfx_len,
        metric_type,
        next_hop: sender,
        iface,
        seqnum: orig_seqnum,
        metric: updated_metric,
        seqnortr,
    });
    outcome.fib_ops.extend(fib_ops);
    if matches!(lrs_result, LrsOutcome::Created | LrsOutcome::Updated) {
        outcome.release_buffer_for = Some((orig_addr, orig.pfx_len));
    }
    if note_sighting(ctx, sender, iface, lrs_result == LrsOutcome::Created, &mut outcome) {
        return outcome;
    }

    let mcmsg_result = ctx.mcmsg.process(IncomingRreq {
        orig_prefix: orig_addr,
        orig_pfx_len: orig.pfx_len,
        targ_prefix: targ_addr,
        orig_seqnum,
        targ_seqnum,
        metric_type,
        metric: updated_metric,
        seqnortr,
        iface,
    });
    if mcmsg_result == McmsgOutcome::Redundant {
        outcome.dropped = Some("redundant RREQ");
        return outcome;
    }
    if mcmsg_result == McmsgOutcome::Full {
        outcome.dropped = Some("McMsg set full");
        return outcome;
    }

    if let Some(client) = ctx.rcs.find(targ_addr) {
        let targ_prefix = ctx.originator.source_for(client.addr).unwrap_or(client.addr);
        let body = RrepOut {
            hop_limit: ctx.constants.max_hopcount as u8,
            orig_prefix: orig_addr,
            orig_pfx_len: orig.pfx_len,
            targ_prefix,
            targ_pfx_len: client.pfx_len,
            targ_seqnum: ctx.own_seqnum.new_seqnum(),
            metric_type,
            targ_metric: client.cost,
            seqnortr: None,
        };
        outcome.enqueue.push((
            QueuedSend { priority: Priority::Rrep, destination: Destination::Unicast(sender), iface },
            MessageBody::Rrep(body),
        ));
        return outcome;
    }

    if hop_limit > 1 {
        let Some(route) = ctx.lrs.find(orig_addr) else {
            outcome.dropped = Some("no route back to OrigPrefix");
            return outcome;
        };
        let body = RreqOut {
            hop_limit: hop_limit - 1,
            orig_prefix: orig_addr,
            orig_pfx_len: orig.pfx_len,
            targ_prefix: targ_addr,
            targ_pfx_len: targ.pfx_len,
            orig_seqnum,
            targ_seqnum,
            metric_type,
            orig_metric: route.metric,
            seqnortr: seqnortr_i.map(|_| seqnortr),
        };
        outcome.enqueue.push((
            QueuedSend { priority: Priority::Rreq, destination: Destination::AllTargets, iface },
            MessageBody::Rreq(body),
        ));
    } else {
        outcome.dropped = Some("hop limit exhausted, no client match");
    }

    outcome
}

/// RREP ingress (§4.5 RREP steps).
pub fn process_rrep(ctx: &mut Ingress<'_>, sender: Ipv6Addr, iface: u32, msg: &Message) -> IngressOutcome {
    let Some((oi, ti, seqnortr_i)) = route_addrs(msg) else {
        return IngressOutcome::drop_with("missing OrigPrefix/TargPrefix");
    };
    let block = &msg.addr_blocks[0];
    let view = AddrTlvView { block };
    let orig = block.addrs[oi].clone();
    let targ = block.addrs[ti].clone();
    let seqnortr = seqnortr_i.map(|i| view.seq_num(i)).unwrap_or(SeqNum::UNKNOWN);

    let Some(hop_limit) = msg.hop_limit else { return IngressOutcome::drop_with("no hop limit") };
    let Some(metric_type) = view.metric_type(ti) else {
        return IngressOutcome::drop_with("no metric type");
    };
    let Some(targ_metric) = view.metric(ti, metric_type) else {
        return IngressOutcome::drop_with("no PATH_METRIC TLV");
    };
    let Some(updated_metric) = metric_type.update(targ_metric) else {
        return IngressOutcome::drop_with("metric ceiling reached");
    };
    let targ_seqnum = view.seq_num(ti);

    let targ_addr: Ipv6Addr = match <[u8; 16]>::try_from(targ.addr.as_slice()) {
        Ok(b) => Ipv6Addr::from(b),
        Err(_) => return IngressOutcome::drop_with("bad address length"),
    };
    let orig_addr: Ipv6Addr = match <[u8; 16]>::try_from(orig.addr.as_slice()) {
        Ok(b) => Ipv6Addr::from(b),
        Err(_) => return IngressOutcome::drop_with("bad address length"),
    };

    let mut outcome = IngressOutcome::default();
    let (lrs_result, fib_ops) = ctx.lrs.process(crate::sets::AdvRoute {
        addr: targ_addr,
        pfx_len: targ.pfx_len,
        metric_type,
        next_hop: sender,
        iface,
        seqnum: targ_seqnum,
        metric: updated_metric,
        seqnortr,
    });
    outcome.fib_ops.extend(fib_ops);
    if matches!(lrs_result, LrsOutcome::Created | LrsOutcome::Updated) {
        outcome.release_buffer_for = Some((targ_addr, targ.pfx_len));
    }
    if note_sighting(ctx, sender, iface, lrs_result == LrsOutcome::Created, &mut outcome) {
        return outcome;
    }

    if ctx.rcs.find_exact(orig_addr, orig.pfx_len).is_some() || ctx.rcs.find(orig_addr).is_some() {
        return outcome; // completes our own earlier RREQ
    }

    let Some(next_hop) = ctx.lrs.find(orig_addr) else {
        outcome.dropped = Some("no reverse route for RREP");
        return outcome;
    };
    let next_hop_addr = next_hop.next_hop;
    let next_hop_iface = next_hop.iface;
    if hop_limit == 0 {
        outcome.dropped = Some("hop limit exhausted");
        return outcome;
    }
    let body = RrepOut {
        hop_limit: hop_limit - 1,
        orig_prefix: orig_addr,
        orig_pfx_len: orig.pfx_len,
        targ_prefix: targ_addr,
        targ_pfx_len: targ.pfx_len,
        targ_seqnum,
        metric_type,
        targ_metric: updated_metric,
        seqnortr: seqnortr_i.map(|_| seqnortr),
    };
    outcome.enqueue.push((
        QueuedSend {
            priority: Priority::Rrep,
            destination: Destination::Unicast(next_hop_addr),
            iface: next_hop_iface,
        },
        MessageBody::Rrep(body),
    ));
    outcome
}

/// RREP_Ack ingress.
pub fn process_rrep_ack(ctx: &mut Ingress<'_>, sender: Ipv6Addr, iface: u32, msg: &Message) -> IngressOutcome {
    let ackreq = msg
        .tlvs
        .iter()
        .find(|t| t.tlv_type == msgtlv::ACKREQ)
        .and_then(|t| t.value.as_ref())
        .map(|v| v.first().copied().unwrap_or(0) != 0)
        .unwrap_or(false);

    let Some(timestamp) = msg
        .tlvs
        .iter()
        .find(|t| t.tlv_type == msgtlv::TIMESTAMP)
        .and_then(|t| t.value.as_ref())
        .and_then(|v| <[u8; 2]>::try_from(v.as_slice()).ok())
        .map(u16::from_be_bytes)
    else {
        return IngressOutcome::drop_with("missing TIMESTAMP TLV");
    };

    let mut outcome = IngressOutcome::default();
    if ackreq {
        if ctx.neighbors.ack_request(sender, iface, timestamp).is_err() {
            outcome.dropped = Some("neighbor set full");
            return outcome;
        }
        outcome.enqueue.push((
            QueuedSend { priority: Priority::RrepAck, destination: Destination::Unicast(sender), iface },
            MessageBody::RrepAck(RrepAckOut { ackreq: false, timestamp }),
        ));
    } else {
        ctx.neighbors.accept_ack_reply(sender, iface, timestamp);
    }
    outcome
}

/// RERR ingress: a stub per the source's own scope (no forwarding).
pub fn process_rerr(ctx: &mut Ingress<'_>, _sender: Ipv6Addr, _iface: u32, msg: &Message) -> IngressOutcome {
    let Some(block) = msg.addr_blocks.first() else {
        return IngressOutcome::drop_with("no address block");
    };
    let view = AddrTlvView { block };
    let mut outcome = IngressOutcome::default();
    for (i, addr) in block.addrs.iter().enumerate() {
        let Ok(octets) = <[u8; 16]>::try_from(addr.addr.as_slice()) else { continue };
        let prefix = Ipv6Addr::from(octets);
        let _seq = view.seq_num(i);
        outcome.fib_ops.extend(ctx.lrs.invalidate(prefix, addr.pfx_len));
    }
    outcome
}

fn addr_tlv(tlv_type: u8, type_ext: Option<u8>, index: AddrIndex, value: Vec<u8>) -> Tlv {
    let mut tlv = Tlv::new(tlv_type).with_index(index).with_value(value);
    if let Some(ext) = type_ext {
        tlv = tlv.with_type_ext(ext);
    }
    tlv
}

/// Egress: build the wire `Message` for a queued RREQ.
pub fn build_rreq(body: &RreqOut) -> Message {
    let mut msg = Message::new(msgtype::RREQ, 16);
    msg.hop_limit = Some(body.hop_limit);
    let mut block = AddrBlock::default();
    block.addrs.push(crate::rfc5444::AddrEntry { addr: body.orig_prefix.octets().to_vec(), pfx_len: body.orig_pfx_len });
    block.addrs.push(crate::rfc5444::AddrEntry { addr: body.targ_prefix.octets().to_vec(), pfx_len: body.targ_pfx_len });
    block.tlvs.push(addr_tlv(addrtlv::ADDRESS_TYPE, None, AddrIndex::Single(0), vec![addrtype::ORIGPREFIX]));
    block.tlvs.push(addr_tlv(addrtlv::ADDRESS_TYPE, None, AddrIndex::Single(1), vec![addrtype::TARGPREFIX]));
    block.tlvs.push(addr_tlv(addrtlv::SEQ_NUM, None, AddrIndex::Single(0), body.orig_seqnum.0.to_be_bytes().to_vec()));
    if !body.targ_seqnum.is_unknown() {
        block.tlvs.push(addr_tlv(addrtlv::SEQ_NUM, None, AddrIndex::Single(1), body.targ_seqnum.0.to_be_bytes().to_vec()));
    }
    block.tlvs.push(addr_tlv(addrtlv::PATH_METRIC, Some(body.metric_type.0), AddrIndex::Single(0), vec![body.orig_metric]));
    if let Some(seqnortr) = body.seqnortr {
        block.addrs.push(crate::rfc5444::AddrEntry { addr: [0u8; 16].to_vec(), pfx_len: 0 });
        let idx = (block.addrs.len() - 1) as u8;
        block.tlvs.push(addr_tlv(addrtlv::ADDRESS_TYPE, None, AddrIndex::Single(idx), vec![addrtype::UNSPECIFIED]));
        block.tlvs.push(addr_tlv(addrtlv::SEQ_NUM, None, AddrIndex::Single(idx), seqnortr.0.to_be_bytes().to_vec()));
    }
    msg.addr_blocks.push(block);
    msg
}

pub fn build_rrep(body: &RrepOut) -> Message {
    let mut msg = Message::new(msgtype::RREP, 16);
    msg.hop_limit = Some(body.hop_limit);
    let mut block = AddrBlock::default();
    block.addrs.push(crate::rfc5444::AddrEntry { addr: body.orig_prefix.octets().to_vec(), pfx_len: body.orig_pfx_len });
    block.addrs.push(crate::rfc5444::AddrEntry { addr: body.targ_prefix.octets().to_vec(), pfx_len: body.targ_pfx_len });
    block.tlvs.push(addr_tlv(addrtlv::ADDRESS_TYPE, None, AddrIndex::Single(0), vec![addrtype::ORIGPREFIX]));
    block.tlvs.push(addr_tlv(addrtlv::ADDRESS_TYPE, None, AddrIndex::Single(1), vec![addrtype::TARGPREFIX]));
    block.tlvs.push(addr_tlv(addrtlv::SEQ_NUM, None, AddrIndex::Single(1), body.targ_seqnum.0.to_be_bytes().to_vec()));
    block.tlvs.push(addr_tlv(addrtlv::PATH_METRIC, Some(body.metric_type.0), AddrIndex::Single(1), vec![body.targ_metric]));
    if let Some(seqnortr) = body.seqnortr {
        block.addrs.push(crate::rfc5444::AddrEntry { addr: [0u8; 16].to_vec(), pfx_len: 0 });
        let idx = (block.addrs.len() - 1) as u8;
        block.tlvs.push(addr_tlv(addrtlv::ADDRESS_TYPE, None, AddrIndex::Single(idx), vec![addrtype::UNSPECIFIED]));
        block.tlvs.push(addr_tlv(addrtlv::SEQ_NUM, None, AddrIndex::Single(idx), seqnortr.0.to_be_bytes().to_vec()));
    }
    msg.addr_blocks.push(block);
    msg
}

pub fn build_rerr(body: &RerrOut) -> Message {
    let mut msg = Message::new(msgtype::RERR, 16);
    let mut block = AddrBlock::default();
    block.addrs.push(crate::rfc5444::AddrEntry {
        addr: body.unreachable_prefix.octets().to_vec(),
        pfx_len: body.unreachable_pfx_len,
    });
    block.tlvs.push(addr_tlv(addrtlv::SEQ_NUM, None, AddrIndex::Single(0), body.seqnum.0.to_be_bytes().to_vec()));
    msg.addr_blocks.push(block);
    msg
}

pub fn build_rrep_ack(body: RrepAckOut) -> Message {
    let mut msg = Message::new(msgtype::RREP_ACK, 16);
    msg.tlvs.push(Tlv::new(msgtlv::ACKREQ).with_value(vec![body.ackreq as u8]));
    msg.tlvs.push(Tlv::new(msgtlv::TIMESTAMP).with_value(body.timestamp.to_be_bytes().to_vec()));
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Constants;
    use crate::sets::{Mcmsg, NeighborSet, Rcs};

    struct IdentityLookup;
    impl OriginatorLookup for IdentityLookup {
        fn source_for(&self, client_addr: Ipv6Addr) -> Option<Ipv6Addr> {
            Some(client_addr)
        }
    }

    struct RemapLookup(Ipv6Addr);
    impl OriginatorLookup for RemapLookup {
        fn source_for(&self, _client_addr: Ipv6Addr) -> Option<Ipv6Addr> {
            Some(self.0)
        }
    }

    fn harness() -> (Rcs, Lrs, Mcmsg, NeighborSet, SeqNumCounter, Constants) {
        let constants = Constants::default();
        (
            Rcs::new(constants.rcs_max_entries),
            Lrs::new(&constants),
            Mcmsg::new(&constants),
            NeighborSet::new(&constants),
            SeqNumCounter::new(&constants),
            constants,
        )
    }

    #[test]
    fn s6_rreq_to_client_yields_rrep() {
        let (mut rcs, mut lrs, mut mcmsg, mut neighbors, mut own_seqnum, constants) = harness();
        rcs.add("fc00:b::".parse().unwrap(), 64, 1).unwrap();

        let rreq = build_rreq(&RreqOut {
            hop_limit: 64,
            orig_prefix: "fc00:a::".parse().unwrap(),
            orig_pfx_len: 64,
            targ_prefix: "fc00:b::1".parse().unwrap(),
            targ_pfx_len: 128,
            orig_seqnum: SeqNum(1),
            targ_seqnum: SeqNum::UNKNOWN,
            metric_type: MetricType::HOP_COUNT,
            orig_metric: 0,
            seqnortr: None,
        });

        let mut ctx = Ingress {
            rcs: &rcs,
            lrs: &mut lrs,
            mcmsg: &mut mcmsg,
            neighbors: &mut neighbors,
            own_seqnum: &mut own_seqnum,
            constants: &constants,
            originator: &IdentityLookup,
        };
        let outcome = process_rreq(&mut ctx, "fe80::a".parse().unwrap(), 1, &rreq);
        assert!(outcome.dropped.is_none(), "{:?}", outcome.dropped);
        assert_eq!(outcome.enqueue.len(), 1);
        assert!(matches!(outcome.enqueue[0].1, MessageBody::Rrep(_)));
    }

    #[test]
    fn rrep_target_address_comes_from_originator_lookup() {
        let (mut rcs, mut lrs, mut mcmsg, mut neighbors, mut own_seqnum, constants) = harness();
        rcs.add("fc00:b::".parse().unwrap(), 64, 1).unwrap();
        let remapped: Ipv6Addr = "fc00:b::42".parse().unwrap();

        let rreq = build_rreq(&RreqOut {
            hop_limit: 64,
            orig_prefix: "fc00:a::".parse().unwrap(),
            orig_pfx_len: 64,
            targ_prefix: "fc00:b::1".parse().unwrap(),
            targ_pfx_len: 128,
            orig_seqnum: SeqNum(1),
            targ_seqnum: SeqNum::UNKNOWN,
            metric_type: MetricType::HOP_COUNT,
            orig_metric: 0,
            seqnortr: None,
        });

        let mut ctx = Ingress {
            rcs: &rcs,
            lrs: &mut lrs,
            mcmsg: &mut mcmsg,
            neighbors: &mut neighbors,
            own_seqnum: &mut own_seqnum,
            constants: &constants,
            originator: &RemapLookup(remapped),
        };
        let outcome = process_rreq(&mut ctx, "fe80::a".parse().unwrap(), 1, &rreq);
        let MessageBody::Rrep(body) = &outcome.enqueue[0].1 else { panic!("expected RREP") };
        assert_eq!(body.targ_prefix, remapped);
    }

    #[test]
    fn fresh_next_hop_triggers_rrep_ack_solicitation() {
        let (mut rcs, mut lrs, mut mcmsg, mut neighbors, mut own_seqnum, constants) = harness();
        rcs.add("fc00:b::".parse().unwrap(), 64, 1).unwrap();
        let sender: Ipv6Addr = "fe80::a".parse().unwrap();

        let rreq = build_rreq(&RreqOut {
            hop_limit: 64,
            orig_prefix: "fc00:a::".parse().unwrap(),
            orig_pfx_len: 64,
            targ_prefix: "fc00:b::1".parse().unwrap(),
            targ_pfx_len: 128,
            orig_seqnum: SeqNum(1),
            targ_seqnum: SeqNum::UNKNOWN,
            metric_type: MetricType::HOP_COUNT,
            orig_metric: 0,
            seqnortr: None,
        });

        let mut ctx = Ingress {
            rcs: &rcs,
            lrs: &mut lrs,
            mcmsg: &mut mcmsg,
            neighbors: &mut neighbors,
            own_seqnum: &mut own_seqnum,
            constants: &constants,
            originator: &IdentityLookup,
        };
        let outcome = process_rreq(&mut ctx, sender, 1, &rreq);
        assert!(outcome.enqueue.iter().any(|(_, body)| matches!(
            body,
            MessageBody::RrepAck(RrepAckOut { ackreq: true, .. })
        )));
        assert!(neighbors.find(sender, 1).is_some());
    }

    #[test]
    fn blacklisted_sender_is_dropped() {
        let (rcs, mut lrs, mut mcmsg, mut neighbors, mut own_seqnum, constants) = harness();
        let addr = "fe80::a".parse().unwrap();
        neighbors.set_heard(addr, 1, true).unwrap();
        // force straight into BLACKLISTED via a zero timeout
        let mut aged_constants = constants;
        aged_constants.rrep_ack_sent_timeout = std::time::Duration::from_nanos(1);
        let mut neighbors = NeighborSet::new(&aged_constants);
        neighbors.set_heard(addr, 1, true).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(neighbors.is_blacklisted(addr, 1));

        let rreq = build_rreq(&RreqOut {
            hop_limit: 64,
            orig_prefix: "fc00:a::".parse().unwrap(),
            orig_pfx_len: 64,
            targ_prefix: "fc00:b::1".parse().unwrap(),
            targ_pfx_len: 128,
            orig_seqnum: SeqNum(1),
            targ_seqnum: SeqNum::UNKNOWN,
            metric_type: MetricType::HOP_COUNT,
            orig_metric: 0,
            seqnortr: None,
        });
        let mut ctx = Ingress {
            rcs: &rcs,
            lrs: &mut lrs,
            mcmsg: &mut mcmsg,
            neighbors: &mut neighbors,
            own_seqnum: &mut own_seqnum,
            constants: &aged_constants,
            originator: &IdentityLookup,
        };
        let outcome = process_rreq(&mut ctx, addr, 1, &rreq);
        assert_eq!(outcome.dropped, Some("sender blacklisted"));
    }

    #[test]
    fn rrep_ack_request_echoes_reply() {
        let (rcs, mut lrs, mut mcmsg, mut neighbors, mut own_seqnum, constants) = harness();
        let req = build_rrep_ack(RrepAckOut { ackreq: true, timestamp: 42 });
        let mut ctx = Ingress {
            rcs: &rcs,
            lrs: &mut lrs,
            mcmsg: &mut mcmsg,
            neighbors: &mut neighbors,
            own_seqnum: &mut own_seqnum,
            constants: &constants,
            originator: &IdentityLookup,
        };
        let outcome = process_rrep_ack(&mut ctx, "fe80::a".parse().unwrap(), 1, &req);
        assert_eq!(outcome.enqueue.len(), 1);
        assert!(matches!(
            &outcome.enqueue[0].1,
            MessageBody::RrepAck(RrepAckOut { ackreq: false, timestamp: 42 })
        ));
    }
}
