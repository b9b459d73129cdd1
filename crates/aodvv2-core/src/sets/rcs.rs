//! Router Client Set. The prefixes this router originates route requests
//! for; bounded, duplicate-free under `(addr, pfx_len)`.

use std::net::Ipv6Addr;

use crate::error::SetError;
use crate::sets::prefix_match;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterClient {
    pub addr: Ipv6Addr,
    pub pfx_len: u8,
    pub cost: u8,
}

pub struct Rcs {
    entries: Vec<RouterClient>,
    capacity: usize,
}

impl Rcs {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), capacity }
    }

    /// `alloc`: add a new client. `pfx_len` must be `1..=128` and `addr`
    /// must not be the unspecified address (`::`), both of which the
    /// draft's RCS rejects as `EINVAL`.
    pub fn add(&mut self, addr: Ipv6Addr, pfx_len: u8, cost: u8) -> Result<(), SetError> {
        if !(1..=128).contains(&pfx_len) || addr.is_unspecified() {
            return Err(SetError::InvalidKey);
        }
        if self.entries.iter().any(|c| c.addr == addr && c.pfx_len == pfx_len) {
            return Err(SetError::AlreadyExists);
        }
        if self.entries.len() >= self.capacity {
            return Err(SetError::Full);
        }
        self.entries.push(RouterClient { addr, pfx_len, cost });
        Ok(())
    }

    pub fn remove(&mut self, addr: Ipv6Addr, pfx_len: u8) -> Result<(), SetError> {
        if !(1..=128).contains(&pfx_len) || addr.is_unspecified() {
            return Err(SetError::InvalidKey);
        }
        let before = self.entries.len();
        self.entries.retain(|c| !(c.addr == addr && c.pfx_len == pfx_len));
        if self.entries.len() == before {
            return Err(SetError::NotFound);
        }
        Ok(())
    }

    /// Longest-prefix-match lookup: the client whose `(addr, pfx_len)`
    /// covers `host`, preferring the most specific (largest `pfx_len`).
    pub fn find(&self, host: Ipv6Addr) -> Option<&RouterClient> {
        self.entries
            .iter()
            .filter(|c| prefix_match(&host, &c.addr, c.pfx_len))
            .max_by_key(|c| c.pfx_len)
    }

    pub fn find_exact(&self, addr: Ipv6Addr, pfx_len: u8) -> Option<&RouterClient> {
        self.entries.iter().find(|c| c.addr == addr && c.pfx_len == pfx_len)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouterClient> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn s1_add_remove_client() {
        let mut rcs = Rcs::new(2);
        assert_eq!(rcs.add(a("fc00:200::"), 64, 1), Ok(()));
        assert_eq!(rcs.add(a("fc00:200::"), 64, 1), Err(SetError::AlreadyExists));
        assert_eq!(rcs.add(a("::"), 64, 1), Err(SetError::InvalidKey));
        assert_eq!(rcs.add(a("fc00:200::"), 0, 1), Err(SetError::InvalidKey));
        assert_eq!(rcs.find(a("fc00:200:0:0:cafe::1")).unwrap().addr, a("fc00:200::"));
        assert_eq!(rcs.remove(a("fc00:200::"), 64), Ok(()));
        assert_eq!(rcs.remove(a("fc00:200::"), 64), Err(SetError::NotFound));
    }

    #[test]
    fn s2_delete_unknown() {
        let mut rcs = Rcs::new(2);
        assert_eq!(rcs.remove(a("fc00:200::"), 64), Err(SetError::NotFound));
        assert_eq!(rcs.remove(a("::"), 64), Err(SetError::InvalidKey));
    }

    #[test]
    fn p2_uniqueness_under_capacity() {
        let mut rcs = Rcs::new(2);
        rcs.add(a("fc00:1::"), 64, 0).unwrap();
        rcs.add(a("fc00:2::"), 64, 0).unwrap();
        assert_eq!(rcs.add(a("fc00:3::"), 64, 0), Err(SetError::Full));
    }
}
