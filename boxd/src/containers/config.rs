//! §3 Container configuration: immutable after create.

use crate::specparse::{Mount, PublishedPort};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A requested network attachment (§3: `{network_id, hostname, optional
/// mac}`) — distinct from `specparse::NetworkAttachmentSpec`, which
/// parses the CLI-facing `name[,mac=...]` string and carries no hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAttachmentRequest {
    pub network_id: String,
    pub hostname: String,
    pub mac: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReference {
    pub reference: String,
    pub platform: Platform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub executable: String,
    pub arguments: Vec<String>,
    /// Ordered `KEY=VALUE` environment, per §3.
    pub environment: Vec<String>,
    pub working_dir: String,
    pub user: Option<String>,
    pub group: Option<String>,
    pub supplemental_groups: Vec<u32>,
    pub tty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub cpus: u32,
    pub memory_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsConfig {
    pub nameservers: Vec<String>,
    pub domain: Option<String>,
    pub search_domains: Vec<String>,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedSocket {
    pub host_path: String,
    pub container_path: String,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub id: String,
    pub image: ImageReference,
    pub process: ProcessSpec,
    pub resources: Resources,
    pub mounts: Vec<Mount>,
    pub networks: Vec<NetworkAttachmentRequest>,
    pub dns: Option<DnsConfig>,
    pub published_ports: Vec<PublishedPort>,
    pub published_sockets: Vec<PublishedSocket>,
    pub runtime_handler: String,
    pub labels: HashMap<String, String>,
    pub auto_remove: bool,
}

/// `[a-zA-Z0-9][a-zA-Z0-9_.-]+`, 1..255 chars (§3).
pub fn validate_container_id(id: &str) -> bool {
    if id.is_empty() || id.len() > 255 {
        return false;
    }
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
