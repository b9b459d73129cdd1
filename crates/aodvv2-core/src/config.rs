//! Compile-time-style configuration. Kept as `const`s per the source's
//! `CONFIG_AODVV2_*` preprocessor defines; a node assembling [`crate::core::Aodvv2Core`]
//! may override them with a [`Constants`] value read from its own config file.

use std::time::Duration;

/// Maximum hop count for a Route Message; also the per-metric max for hop-count.
pub const MAX_HOPCOUNT: u32 = 64;
/// Time a Local Route stays ACTIVE after last use before dropping to IDLE.
pub const ACTIVE_INTERVAL: Duration = Duration::from_secs(5);
/// Time a Local Route stays IDLE before becoming INVALID.
pub const MAX_IDLETIME: Duration = Duration::from_secs(200);
/// Time a blacklisted neighbor stays blacklisted before reverting to HEARD.
pub const MAX_BLACKLIST_TIME: Duration = Duration::from_secs(200);
/// Lifetime after which an idle own SeqNum resets, and after which
/// INVALID routes / stale McMsgs are reclaimed.
pub const MAX_SEQNUM_LIFETIME: Duration = Duration::from_secs(300);
/// RERR timeout (unused by the RERR placeholder, carried for API parity).
pub const RERR_TIMEOUT: Duration = Duration::from_secs(3);
/// How long an RteMsg table entry (McMsg) is considered fresh.
pub const RTEMSG_ENTRY_TIME: Duration = Duration::from_secs(12);
/// Time to wait for a RREP before a caller-built retry layer may resend a RREQ.
pub const RREQ_WAIT_TIME: Duration = Duration::from_secs(2);
/// Holddown after giving up on a destination before retrying.
pub const RREQ_HOLDDOWN_TIME: Duration = Duration::from_secs(10);
/// Time to wait for a RREP_Ack reply before blacklisting the neighbor.
pub const RREP_ACK_SENT_TIMEOUT: Duration = Duration::from_secs(1);
/// Global outgoing control-message rate limit, messages/second. Must be a power of two.
pub const CONTROL_TRAFFIC_LIMIT: u32 = 16;
/// Buffered data-packet set capacity.
pub const BUFFER_MAX_ENTRIES: usize = 10;
/// Multicast Message Set capacity.
pub const MCMSG_MAX_ENTRIES: usize = 16;
/// Router Client Set capacity.
pub const RCS_MAX_ENTRIES: usize = 2;
/// Local Route Set capacity.
pub const LRS_MAX_ENTRIES: usize = 16;
/// Neighbor Set capacity.
pub const NEIGH_MAX_ENTRIES: usize = 16;
/// Maximum RFC 5444 packet size (MTU minus link overhead), conservative profile.
pub const RFC5444_PACKET_SIZE: usize = 1024;
/// Per-target aggregation window before a packet is flushed to the transport.
pub const RFC5444_AGGREGATION_TIME: Duration = Duration::from_millis(100);

/// MANET UDP port (IANA-assigned, used by both AODV variants).
pub const MANET_PORT: u16 = 269;

/// Link-local IPv6 multicast group `ff02::6d`, LL-MANET-Routers.
pub const LL_MANET_ROUTERS: std::net::Ipv6Addr =
    std::net::Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0x6d);

/// Runtime-overridable subset of the constants above, for nodes that load a
/// config file. Fields default to the constants; a node need only override
/// the ones it cares about.
#[derive(Debug, Clone, Copy)]
pub struct Constants {
    pub max_hopcount: u32,
    pub active_interval: Duration,
    pub max_idletime: Duration,
    pub max_blacklist_time: Duration,
    pub max_seqnum_lifetime: Duration,
    pub rrep_ack_sent_timeout: Duration,
    pub control_traffic_limit: u32,
    pub buffer_max_entries: usize,
    pub mcmsg_max_entries: usize,
    pub rcs_max_entries: usize,
    pub lrs_max_entries: usize,
    pub neigh_max_entries: usize,
    pub rfc5444_packet_size: usize,
    pub rfc5444_aggregation_time: Duration,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            max_hopcount: MAX_HOPCOUNT,
            active_interval: ACTIVE_INTERVAL,
            max_idletime: MAX_IDLETIME,
            max_blacklist_time: MAX_BLACKLIST_TIME,
            max_seqnum_lifetime: MAX_SEQNUM_LIFETIME,
            rrep_ack_sent_timeout: RREP_ACK_SENT_TIMEOUT,
            control_traffic_limit: CONTROL_TRAFFIC_LIMIT,
            buffer_max_entries: BUFFER_MAX_ENTRIES,
            mcmsg_max_entries: MCMSG_MAX_ENTRIES,
            rcs_max_entries: RCS_MAX_ENTRIES,
            lrs_max_entries: LRS_MAX_ENTRIES,
            neigh_max_entries: NEIGH_MAX_ENTRIES,
            rfc5444_packet_size: RFC5444_PACKET_SIZE,
            rfc5444_aggregation_time: RFC5444_AGGREGATION_TIME,
        }
    }
}
