//! `aodvv2.toml` node configuration: router clients, the participating
//! interface, and optional overrides for the core's compile-time
//! constants (spec.md §6). Shape follows the teacher's `ProbeConfig`:
//! `#[serde(default)]` fields, a `default_example()` constructor, and
//! `Config::load(&Path) -> Result<Self>` with `.context()`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    /// Network interface this node participates on.
    pub interface: String,
    /// This node's link-local address on `interface`.
    pub link_local_addr: String,
    #[serde(default)]
    pub router_clients: Vec<RouterClientEntry>,
    #[serde(default)]
    pub constants: ConstantOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterClientEntry {
    pub addr: String,
    pub pfx_len: u8,
    #[serde(default = "RouterClientEntry::default_cost")]
    pub cost: u8,
}

impl RouterClientEntry {
    fn default_cost() -> u8 {
        1
    }
}

/// Overrides for [`aodvv2_core::Constants`]; all fields default to the
/// spec's own literal defaults when omitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConstantOverrides {
    pub max_hopcount: Option<u32>,
    pub active_interval_secs: Option<u64>,
    pub max_idletime_secs: Option<u64>,
    pub max_blacklist_time_secs: Option<u64>,
    pub max_seqnum_lifetime_secs: Option<u64>,
    pub rrep_ack_sent_timeout_secs: Option<u64>,
    pub control_traffic_limit: Option<u32>,
    pub buffer_max_entries: Option<usize>,
    pub mcmsg_max_entries: Option<usize>,
    pub rcs_max_entries: Option<usize>,
    pub lrs_max_entries: Option<usize>,
    pub neigh_max_entries: Option<usize>,
    pub rfc5444_packet_size: Option<usize>,
    pub rfc5444_aggregation_time_ms: Option<u64>,
}

impl ConstantOverrides {
    pub fn apply(&self, mut constants: aodvv2_core::Constants) -> aodvv2_core::Constants {
        if let Some(v) = self.max_hopcount {
            constants.max_hopcount = v;
        }
        if let Some(v) = self.active_interval_secs {
            constants.active_interval = Duration::from_secs(v);
        }
        if let Some(v) = self.max_idletime_secs {
            constants.max_idletime = Duration::from_secs(v);
        }
        if let Some(v) = self.max_blacklist_time_secs {
            constants.max_blacklist_time = Duration::from_secs(v);
        }
        if let Some(v) = self.max_seqnum_lifetime_secs {
            constants.max_seqnum_lifetime = Duration::from_secs(v);
        }
        if let Some(v) = self.rrep_ack_sent_timeout_secs {
            constants.rrep_ack_sent_timeout = Duration::from_secs(v);
        }
        if let Some(v) = self.control_traffic_limit {
            constants.control_traffic_limit = v;
        }
        if let Some(v) = self.buffer_max_entries {
            constants.buffer_max_entries = v;
        }
        if let Some(v) = self.mcmsg_max_entries {
            constants.mcmsg_max_entries = v;
        }
        if let Some(v) = self.rcs_max_entries {
            constants.rcs_max_entries = v;
        }
        if let Some(v) = self.lrs_max_entries {
            constants.lrs_max_entries = v;
        }
        if let Some(v) = self.neigh_max_entries {
            constants.neigh_max_entries = v;
        }
        if let Some(v) = self.rfc5444_packet_size {
            constants.rfc5444_packet_size = v;
        }
        if let Some(v) = self.rfc5444_aggregation_time_ms {
            constants.rfc5444_aggregation_time = Duration::from_millis(v);
        }
        constants
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let cfg: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(cfg)
    }

    /// Returns a default config a node can copy and edit: one router
    /// client, one interface, no constant overrides.
    pub fn default_example() -> Self {
        Self {
            interface: "eth0".into(),
            link_local_addr: "fe80::1".into(),
            router_clients: vec![RouterClientEntry {
                addr: "fc00:a::".into(),
                pfx_len: 64,
                cost: 1,
            }],
            constants: ConstantOverrides::default(),
        }
    }
}
