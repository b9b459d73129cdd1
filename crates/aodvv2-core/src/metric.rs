//! Metric module (C2). Metric types are an open enum indexed by IANA code
//! (RFC 6551); the only mandatory implementation is hop-count.

use crate::config::MAX_HOPCOUNT;

/// IANA routing-metric-type code. Hop-count is `3` (RFC 6551 §4). Other
/// codes are accepted on the wire (stored verbatim) but only hop-count has
/// a defined cost/max/update function; a Route Message carrying an
/// unsupported type is dropped by the message engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MetricType(pub u8);

impl MetricType {
    pub const HOP_COUNT: MetricType = MetricType(3);

    pub fn is_supported(self) -> bool {
        self == Self::HOP_COUNT
    }

    /// Per-hop cost contribution of traversing this router, in this
    /// metric's units. `1` for hop-count.
    pub fn link_cost(self) -> Option<u8> {
        match self {
            Self::HOP_COUNT => Some(1),
            _ => None,
        }
    }

    /// Ceiling past which a route/request carrying this metric must be
    /// dropped rather than accepted.
    pub fn max(self) -> Option<u32> {
        match self {
            Self::HOP_COUNT => Some(MAX_HOPCOUNT),
            _ => None,
        }
    }

    /// Accumulate this router's link cost into `metric`, returning the
    /// updated value, or `None` if doing so would exceed `max()` — the
    /// caller must drop the Route Message in that case.
    pub fn update(self, metric: u8) -> Option<u8> {
        let cost = self.link_cost()?;
        let max = self.max()?;
        let updated = metric as u32 + cost as u32;
        if updated > max {
            None
        } else {
            Some(updated as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_count_accumulates() {
        let m = MetricType::HOP_COUNT;
        assert_eq!(m.update(0), Some(1));
        assert_eq!(m.update(63), Some(64));
    }

    #[test]
    fn hop_count_ceiling_rejects() {
        let m = MetricType::HOP_COUNT;
        assert_eq!(m.update(64), None);
    }

    #[test]
    fn unsupported_metric_has_no_cost() {
        let m = MetricType(200);
        assert!(!m.is_supported());
        assert_eq!(m.link_cost(), None);
        assert_eq!(m.update(3), None);
    }
}
