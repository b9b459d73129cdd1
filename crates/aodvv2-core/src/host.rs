//! Host interface traits (§6 "Core -> stack downcalls" / "Stack -> core
//! upcalls"). The core is transport- and FIB-agnostic; a concrete node
//! binds these to a real UDP socket, forwarding table, and interface
//! configuration. Naming follows the spec's own downcall names.

use std::net::Ipv6Addr;

/// UDP transport on MANET port 269. `recv_from` is channel-based rather
/// than a blocking call so the core's routing task never owns the socket
/// directly — mirrors the teacher's `crossbeam_channel` producer/consumer
/// split between the receiver thread and the processing task.
pub trait UdpTransport {
    fn send_to(&self, dst: Ipv6Addr, iface: u32, bytes: &[u8]) -> std::io::Result<()>;
    fn recv_from(&self) -> crossbeam_channel::Receiver<(Ipv6Addr, u32, Vec<u8>)>;
    fn join_link_local_multicast(&self, iface: u32) -> std::io::Result<()>;
}

/// `fib_add(prefix, pfx_len, next_hop, iface, lifetime)` / `fib_del`.
pub trait Fib {
    fn add_route(&self, prefix: Ipv6Addr, pfx_len: u8, next_hop: Ipv6Addr, iface: u32);
    fn remove_route(&self, prefix: Ipv6Addr, pfx_len: u8);
}

/// Resolves which local address a Router Client should be addressed as
/// when this node originates traffic on its behalf.
pub trait OriginatorLookup {
    fn source_for(&self, client_addr: Ipv6Addr) -> Option<Ipv6Addr>;
}

/// `icmpv6_send_dst_unreachable_metric_mismatch`.
pub trait IcmpV6 {
    fn send_dst_unreachable_metric_mismatch(&self, original_packet: &[u8]);
}
