//! Bounded set stores (C4): Router Client Set, Neighbor Set, Local Route
//! Set, Multicast Message Set, and the buffered-packet set. Each is a
//! small `Vec`-backed table — capacities here (2..16 entries) make linear
//! scan cheaper and simpler than a real arena/free-list, while keeping the
//! "container encodes absence, no used-flag sentinel" rule from the data
//! model's own design note.

pub mod buffer;
pub mod lrs;
pub mod mcmsg;
pub mod neighbor;
pub mod rcs;

pub use buffer::Buffer;
pub use lrs::{AdvRoute, FibOp, Lrs, LrsOutcome, RouteState};
pub use mcmsg::{Mcmsg, McmsgOutcome};
pub use neighbor::{Neighbor, NeighborSet, NeighborState, RrepAckRequest};
pub use rcs::{Rcs, RouterClient};

use std::net::Ipv6Addr;

/// Does `addr` fall under the `network/pfx_len` prefix? `pfx_len` of 0
/// matches everything; callers that must reject `/0` (e.g. RCS inserts) do
/// so before calling this.
pub(crate) fn prefix_match(addr: &Ipv6Addr, network: &Ipv6Addr, pfx_len: u8) -> bool {
    if pfx_len == 0 {
        return true;
    }
    let addr = addr.octets();
    let network = network.octets();
    let full_bytes = (pfx_len / 8) as usize;
    let rem_bits = pfx_len % 8;
    if addr[..full_bytes] != network[..full_bytes] {
        return false;
    }
    if rem_bits == 0 {
        return true;
    }
    let mask = 0xffu8 << (8 - rem_bits);
    (addr[full_bytes] & mask) == (network[full_bytes] & mask)
}
