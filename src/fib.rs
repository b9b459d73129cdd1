//! In-memory forwarding-table stub and the remaining host seams
//! (`OriginatorLookup`, `IcmpV6`) for running a node without a real
//! kernel FIB — demos and tests only.

use std::net::Ipv6Addr;
use std::sync::Mutex;

use aodvv2_core::host::{Fib, IcmpV6, OriginatorLookup};

#[derive(Default)]
pub struct LoopbackFib {
    routes: Mutex<Vec<(Ipv6Addr, u8, Ipv6Addr, u32)>>,
}

impl LoopbackFib {
    pub fn snapshot(&self) -> Vec<(Ipv6Addr, u8, Ipv6Addr, u32)> {
        self.routes.lock().unwrap().clone()
    }
}

impl Fib for LoopbackFib {
    fn add_route(&self, prefix: Ipv6Addr, pfx_len: u8, next_hop: Ipv6Addr, iface: u32) {
        tracing::debug!(%prefix, pfx_len, %next_hop, iface, "fib: add route");
        let mut routes = self.routes.lock().unwrap();
        routes.retain(|(p, l, ..)| !(*p == prefix && *l == pfx_len));
        routes.push((prefix, pfx_len, next_hop, iface));
    }

    fn remove_route(&self, prefix: Ipv6Addr, pfx_len: u8) {
        tracing::debug!(%prefix, pfx_len, "fib: remove route");
        self.routes.lock().unwrap().retain(|(p, l, ..)| !(*p == prefix && *l == pfx_len));
    }
}

/// Resolves a Router Client's own address verbatim — this node originates
/// traffic for its clients under their own addresses.
pub struct IdentityOriginator;

impl OriginatorLookup for IdentityOriginator {
    fn source_for(&self, client_addr: Ipv6Addr) -> Option<Ipv6Addr> {
        Some(client_addr)
    }
}

pub struct LoggingIcmp;

impl IcmpV6 for LoggingIcmp {
    fn send_dst_unreachable_metric_mismatch(&self, original_packet: &[u8]) {
        tracing::warn!(len = original_packet.len(), "icmpv6 destination unreachable (metric mismatch)");
    }
}
