//! §3 Network configuration, runtime state, and attachment snapshot types.

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::OnceLock;

pub type NetworkId = String;

/// The reserved, non-creatable network id.
pub const RESERVED_NONE_ID: &str = "none";

/// Id of the network created on first boot if absent.
pub const DEFAULT_NETWORK_ID: &str = "default";

/// Label marking a network as builtin (cannot be deleted).
pub const BUILTIN_LABEL: &str = "boxd.network.builtin";

/// Historical plugin name backfilled onto legacy configs missing
/// `plugin_info` (§4.E boot self-heal).
pub const LEGACY_PLUGIN_NAME: &str = "bridge";

fn network_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9](?:[a-z0-9._-]{0,61}[a-z0-9])?$").unwrap())
}

/// `^[a-z0-9](?:[a-z0-9._-]{0,61}[a-z0-9])?$` (§3) — lowercase-only, unlike
/// the container/volume id grammar.
pub fn validate_network_id(id: &str) -> bool {
    network_id_re().is_match(id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkMode {
    Nat,
    HostOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub plugin_name: String,
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub id: NetworkId,
    pub mode: NetworkMode,
    pub creation_date: DateTime<Utc>,
    pub ipv4_subnet: Option<IpNetwork>,
    pub ipv6_subnet: Option<IpNetwork>,
    pub plugin_info: Option<PluginInfo>,
    pub labels: HashMap<String, String>,
}

impl NetworkConfig {
    pub fn is_builtin(&self) -> bool {
        self.labels.contains_key(BUILTIN_LABEL)
    }

    /// The `default` network materialized on first boot if absent (§3
    /// lifecycle summary).
    pub fn default_builtin() -> Self {
        let mut labels = HashMap::new();
        labels.insert(BUILTIN_LABEL.to_string(), "true".to_string());
        Self {
            id: DEFAULT_NETWORK_ID.to_string(),
            mode: NetworkMode::Nat,
            creation_date: Utc::now(),
            ipv4_subnet: Some("10.88.0.0/24".parse().expect("valid literal CIDR")),
            ipv6_subnet: None,
            plugin_info: None,
            labels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRunningStatus {
    pub ipv4_subnet: Option<IpNetwork>,
    pub ipv4_gateway: Option<IpAddr>,
    pub ipv6_subnet: Option<IpNetwork>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetworkRuntimeState {
    Created(NetworkConfig),
    Running(NetworkConfig, NetworkRunningStatus),
}

impl NetworkRuntimeState {
    pub fn config(&self) -> &NetworkConfig {
        match self {
            NetworkRuntimeState::Created(cfg) => cfg,
            NetworkRuntimeState::Running(cfg, _) => cfg,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, NetworkRuntimeState::Running(..))
    }
}

/// Immutable snapshot produced at allocation time (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub network_id: NetworkId,
    pub hostname: String,
    pub ipv4_address: IpAddr,
    pub ipv4_prefix: u8,
    pub ipv4_gateway: IpAddr,
    pub ipv6_address: Option<IpAddr>,
    pub ipv6_prefix: Option<u8>,
    pub mac: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_builtin_carries_builtin_label_and_id() {
        let cfg = NetworkConfig::default_builtin();
        assert_eq!(cfg.id, DEFAULT_NETWORK_ID);
        assert!(cfg.is_builtin());
    }

    #[test]
    fn network_id_accepts_lowercase_typical_id() {
        assert!(validate_network_id("my-net.1"));
        assert!(validate_network_id("a"));
    }

    #[test]
    fn network_id_rejects_uppercase_and_leading_dash() {
        assert!(!validate_network_id("Bridge0"));
        assert!(!validate_network_id("-net"));
        assert!(!validate_network_id(""));
    }
}
