//! Buffered-packet set: packets held until a route to their destination is
//! discovered. Generic over the packet handle type `P` the host stack
//! lends the core (an opaque, typically reference-counted value).

use std::net::Ipv6Addr;

use crate::error::SetError;
use crate::sets::prefix_match;

pub struct Buffer<P> {
    entries: Vec<(Ipv6Addr, P)>,
    capacity: usize,
}

impl<P> Buffer<P> {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, dst: Ipv6Addr, packet: P) -> Result<(), SetError> {
        if self.entries.len() >= self.capacity {
            return Err(SetError::Full);
        }
        self.entries.push((dst, packet));
        Ok(())
    }

    /// P8: drain every buffered packet whose destination falls under
    /// `prefix/pfx_len`, removing them from the set.
    pub fn take_matching(&mut self, prefix: Ipv6Addr, pfx_len: u8) -> Vec<P> {
        let mut taken = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if prefix_match(&self.entries[i].0, &prefix, pfx_len) {
                taken.push(self.entries.remove(i).1);
            } else {
                i += 1;
            }
        }
        taken
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
