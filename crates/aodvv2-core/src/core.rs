//! Core wiring: [`Aodvv2Core`] owns the seven set-store locks, the
//! own-SeqNum counter, the reader/writer, the scheduler, and handles to
//! the host traits. It is the single non-static mutable-state object
//! (spec.md §9 "no file-level mutable state" design note) — no component
//! module keeps its own static table.

use std::net::Ipv6Addr;
use std::sync::{Arc, Mutex};

use crate::config::Constants;
use crate::engine::{self, Ingress, QueuedSend};
use crate::host::{Fib, IcmpV6, OriginatorLookup, UdpTransport};
use crate::rfc5444::{Packet, Writer};
use crate::scheduler::{Destination, MessageBody, Scheduler};
use crate::seqnum::SeqNumCounter;
use crate::sets::{Buffer, Lrs, Mcmsg, NeighborSet, Rcs};

/// A node's complete AODVv2 routing state, generic over the four host
/// seams (`host.rs`) and the opaque buffered-packet handle type `P`.
pub struct Aodvv2Core<T, F, O, I, P> {
    constants: Constants,
    rcs: Mutex<Rcs>,
    neighbors: Mutex<NeighborSet>,
    lrs: Mutex<Lrs>,
    mcmsg: Mutex<Mcmsg>,
    buffer: Mutex<Buffer<P>>,
    writer: Mutex<Writer>,
    own_seqnum: Mutex<SeqNumCounter>,
    scheduler: Scheduler,
    transport: T,
    fib: F,
    originator: O,
    icmp: I,
}

impl<T, F, O, I, P> Aodvv2Core<T, F, O, I, P>
where
    T: UdpTransport,
    F: Fib,
    O: OriginatorLookup,
    I: IcmpV6,
{
    pub fn new(constants: Constants, transport: T, fib: F, originator: O, icmp: I) -> Arc<Self> {
        Arc::new(Self {
            rcs: Mutex::new(Rcs::new(constants.rcs_max_entries)),
            neighbors: Mutex::new(NeighborSet::new(&constants)),
            lrs: Mutex::new(Lrs::new(&constants)),
            mcmsg: Mutex::new(Mcmsg::new(&constants)),
            buffer: Mutex::new(Buffer::new(constants.buffer_max_entries)),
            writer: Mutex::new(Writer::new(constants.rfc5444_packet_size)),
            own_seqnum: Mutex::new(SeqNumCounter::new(&constants)),
            scheduler: Scheduler::new(&constants),
            transport,
            fib,
            originator,
            icmp,
            constants,
        })
    }

    pub fn add_router_client(&self, addr: Ipv6Addr, pfx_len: u8, cost: u8) -> Result<(), crate::error::SetError> {
        self.rcs.lock().unwrap().add(addr, pfx_len, cost)
    }

    pub fn remove_router_client(&self, addr: Ipv6Addr, pfx_len: u8) -> Result<(), crate::error::SetError> {
        self.rcs.lock().unwrap().remove(addr, pfx_len)
    }

    /// `on_route_needed`: route-discovery driver entry point (C7).
    pub fn on_route_needed(
        &self,
        iface: u32,
        source: Ipv6Addr,
        dst: Ipv6Addr,
        packet: P,
    ) -> crate::discovery::DiscoveryOutcome {
        crate::discovery::on_route_needed(
            &self.rcs.lock().unwrap(),
            &mut self.lrs.lock().unwrap(),
            &mut self.buffer.lock().unwrap(),
            &self.scheduler,
            &mut self.own_seqnum.lock().unwrap(),
            &self.originator,
            iface,
            source,
            dst,
            packet,
        )
    }

    /// `on_udp_recv`: RFC 5444 parse entry point and ingress dispatch.
    pub fn on_udp_recv(&self, sender: Ipv6Addr, iface: u32, bytes: &[u8]) {
        let packet = match Packet::decode(bytes) {
            Ok(p) => p,
            Err(err) => {
                tracing::trace!(%sender, iface, %err, "dropping malformed packet");
                return;
            }
        };
        for msg in &packet.messages {
            self.dispatch_message(sender, iface, msg);
        }
    }

    fn dispatch_message(&self, sender: Ipv6Addr, iface: u32, msg: &crate::rfc5444::Message) {
        let rcs = self.rcs.lock().unwrap();
        let mut lrs = self.lrs.lock().unwrap();
        let mut mcmsg = self.mcmsg.lock().unwrap();
        let mut neighbors = self.neighbors.lock().unwrap();
        let mut own_seqnum = self.own_seqnum.lock().unwrap();
        let mut ctx = Ingress {
            rcs: &rcs,
            lrs: &mut lrs,
            mcmsg: &mut mcmsg,
            neighbors: &mut neighbors,
            own_seqnum: &mut own_seqnum,
            constants: &self.constants,
            originator: &self.originator,
        };

        let outcome = match msg.msg_type {
            engine::msgtype::RREQ => engine::process_rreq(&mut ctx, sender, iface, msg),
            engine::msgtype::RREP => engine::process_rrep(&mut ctx, sender, iface, msg),
            engine::msgtype::RERR => engine::process_rerr(&mut ctx, sender, iface, msg),
            engine::msgtype::RREP_ACK => engine::process_rrep_ack(&mut ctx, sender, iface, msg),
            other => {
                tracing::trace!(msg_type = other, "dropping message of unknown type");
                return;
            }
        };
        drop((rcs, lrs, mcmsg, neighbors, own_seqnum));

        if let Some(reason) = outcome.dropped {
            tracing::trace!(%sender, iface, reason, "message engine dropped ingress message");
        }
        if outcome.icmp_unreachable {
            self.icmp.send_dst_unreachable_metric_mismatch(&[]);
        }
        for op in &outcome.fib_ops {
            match *op {
                crate::sets::FibOp::Add { prefix, pfx_len, next_hop, iface } => {
                    self.fib.add_route(prefix, pfx_len, next_hop, iface)
                }
                crate::sets::FibOp::Remove { prefix, pfx_len } => self.fib.remove_route(prefix, pfx_len),
            }
        }
        if let Some((prefix, pfx_len)) = outcome.release_buffer_for {
            let released = self.buffer.lock().unwrap().take_matching(prefix, pfx_len);
            if !released.is_empty() {
                tracing::debug!(%prefix, pfx_len, count = released.len(), "released buffered packets");
            }
        }
        for (send, body) in outcome.enqueue {
            self.enqueue(send, body);
        }
    }

    fn enqueue(&self, send: QueuedSend, body: MessageBody) {
        if self.scheduler.enqueue(send.priority, body, send.destination, send.iface).is_err() {
            tracing::warn!("scheduler queue full, dropping outgoing message");
        }
    }

    /// Drain one scheduled message, build its wire form, and queue it into
    /// the per-target writer — the routing task's main loop body.
    pub fn pump_one(&self) {
        let queued = self.scheduler.take_next();
        let message = match &queued.body {
            MessageBody::Rreq(body) => engine::build_rreq(body),
            MessageBody::Rrep(body) => engine::build_rrep(body),
            MessageBody::Rerr(body) => engine::build_rerr(body),
            MessageBody::RrepAck(body) => engine::build_rrep_ack(*body),
        };
        let targets = self.resolve_destination(queued.destination);
        let mut writer = self.writer.lock().unwrap();
        for dst in targets {
            match writer.queue(dst, queued.iface, message.clone()) {
                Ok(Some(bytes)) => self.send(dst, queued.iface, bytes),
                Ok(None) => {}
                Err(err) => tracing::warn!(%err, "message too large to fit any packet"),
            }
        }
    }

    fn resolve_destination(&self, destination: Destination) -> Vec<Ipv6Addr> {
        match destination {
            Destination::Unicast(addr) => vec![addr],
            Destination::AllTargets => vec![crate::config::LL_MANET_ROUTERS],
        }
    }

    fn send(&self, dst: Ipv6Addr, iface: u32, bytes: Vec<u8>) {
        if let Err(err) = self.transport.send_to(dst, iface, &bytes) {
            tracing::warn!(%dst, iface, %err, "udp send failed");
        }
    }

    /// Flush any target whose aggregation window has elapsed — called
    /// periodically by the carrier task alongside its inbound-datagram
    /// loop.
    pub fn flush_due(&self) {
        let due = self.writer.lock().unwrap().flush_due(self.constants.rfc5444_aggregation_time);
        for (dst, iface, bytes) in due {
            self.send(dst, iface, bytes);
        }
    }

    /// Spawn the routing task (drains the scheduler) and the RFC 5444
    /// carrier task (reads inbound datagrams, flushes aggregation windows)
    /// as named background threads, mirroring the teacher's
    /// `std::thread::Builder::new().name(...).spawn(...)` convention.
    pub fn spawn(self: &Arc<Self>) -> (std::thread::JoinHandle<()>, std::thread::JoinHandle<()>)
    where
        T: Send + Sync + 'static,
        F: Send + Sync + 'static,
        O: Send + Sync + 'static,
        I: Send + Sync + 'static,
        P: Send + 'static,
    {
        let routing = {
            let core = Arc::clone(self);
            std::thread::Builder::new()
                .name("aodvv2-routing".into())
                .spawn(move || loop {
                    core.pump_one();
                })
                .expect("failed to spawn routing task")
        };

        let carrier = {
            let core = Arc::clone(self);
            std::thread::Builder::new()
                .name("aodvv2-carrier".into())
                .spawn(move || {
                    let inbound = core.transport.recv_from();
                    loop {
                        match inbound.recv_timeout(core.constants.rfc5444_aggregation_time) {
                            Ok((sender, iface, bytes)) => core.on_udp_recv(sender, iface, &bytes),
                            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                        }
                        core.flush_due();
                    }
                })
                .expect("failed to spawn carrier task")
        };

        (routing, carrier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeFib {
        adds: StdMutex<Vec<(Ipv6Addr, u8, Ipv6Addr, u32)>>,
    }
    impl Fib for FakeFib {
        fn add_route(&self, prefix: Ipv6Addr, pfx_len: u8, next_hop: Ipv6Addr, iface: u32) {
            self.adds.lock().unwrap().push((prefix, pfx_len, next_hop, iface));
        }
        fn remove_route(&self, _prefix: Ipv6Addr, _pfx_len: u8) {}
    }

    #[derive(Default)]
    struct FakeTransport {
        sent: AtomicUsize,
    }
    impl UdpTransport for FakeTransport {
        fn send_to(&self, _dst: Ipv6Addr, _iface: u32, _bytes: &[u8]) -> std::io::Result<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn recv_from(&self) -> crossbeam_channel::Receiver<(Ipv6Addr, u32, Vec<u8>)> {
            crossbeam_channel::bounded(0).1
        }
        fn join_link_local_multicast(&self, _iface: u32) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeOriginator;
    impl OriginatorLookup for FakeOriginator {
        fn source_for(&self, client_addr: Ipv6Addr) -> Option<Ipv6Addr> {
            Some(client_addr)
        }
    }

    #[derive(Default)]
    struct FakeIcmp;
    impl IcmpV6 for FakeIcmp {
        fn send_dst_unreachable_metric_mismatch(&self, _original_packet: &[u8]) {}
    }

    fn node() -> Arc<Aodvv2Core<FakeTransport, FakeFib, FakeOriginator, FakeIcmp, u32>> {
        Aodvv2Core::new(Constants::default(), FakeTransport::default(), FakeFib::default(), FakeOriginator, FakeIcmp)
    }

    #[test]
    fn s6_end_to_end_rreq_yields_queued_rrep() {
        let core = node();
        core.add_router_client("fc00:b::".parse().unwrap(), 64, 1).unwrap();

        let rreq = engine::build_rreq(&engine::RreqOut {
            hop_limit: 64,
            orig_prefix: "fc00:a::".parse().unwrap(),
            orig_pfx_len: 64,
            targ_prefix: "fc00:b::1".parse().unwrap(),
            targ_pfx_len: 128,
            orig_seqnum: crate::seqnum::SeqNum(1),
            targ_seqnum: crate::seqnum::SeqNum::UNKNOWN,
            metric_type: crate::metric::MetricType::HOP_COUNT,
            orig_metric: 0,
            seqnortr: None,
        });
        core.dispatch_message("fe80::a".parse().unwrap(), 1, &rreq);
        // one queued RREP answering the RREQ, plus one RREP_Ack solicitation
        // for the freshly learned next-hop neighbor.
        assert_eq!(core.scheduler.len(), 2);
    }

    #[test]
    fn s1_route_discovery_buffers_and_queues() {
        let core = node();
        core.add_router_client("fc00:a::".parse().unwrap(), 64, 1).unwrap();
        let outcome = core.on_route_needed(1, "fc00:a::1".parse().unwrap(), "fc00:b::1".parse().unwrap(), 7u32);
        assert_eq!(outcome, crate::discovery::DiscoveryOutcome::RreqSent);
        assert_eq!(core.scheduler.len(), 1);
    }
}
