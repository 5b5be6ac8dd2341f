//! §3/§4 Volume records and the disk-image sizing constants consumed when
//! materializing a volume-backed mount.

pub mod constants;

use boxd_shared::ids::anonymous_volume_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Reserved label marking a volume as anonymous (name `anon-<ULID>`),
/// eligible for cleanup once its last referencing container is removed.
pub const ANONYMOUS_LABEL: &str = "boxd.volume.anonymous";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Volume {
    pub name: String,
    pub driver: String,
    pub format: String,
    pub source: PathBuf,
    pub created_at: DateTime<Utc>,
    pub labels: HashMap<String, String>,
    pub options: HashMap<String, String>,
    pub size: Option<u64>,
}

impl Volume {
    pub fn new(name: String, driver: String, format: String, source: PathBuf) -> Self {
        Self {
            name,
            driver,
            format,
            source,
            created_at: Utc::now(),
            labels: HashMap::new(),
            options: HashMap::new(),
            size: None,
        }
    }

    /// An anonymous volume: name is `anon-<ULID>`, carries the reserved
    /// anonymous label.
    pub fn anonymous(driver: String, format: String, source: PathBuf) -> Self {
        let mut volume = Self::new(anonymous_volume_name(), driver, format, source);
        volume.labels.insert(ANONYMOUS_LABEL.to_string(), "true".to_string());
        volume
    }

    pub fn is_anonymous(&self) -> bool {
        self.labels.contains_key(ANONYMOUS_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_volume_carries_reserved_label() {
        let v = Volume::anonymous("local".into(), "qcow2".into(), "/tmp/x".into());
        assert!(v.name.starts_with("anon-"));
        assert!(v.is_anonymous());
    }

    #[test]
    fn named_volume_is_not_anonymous() {
        let v = Volume::new("data".into(), "local".into(), "qcow2".into(), "/tmp/x".into());
        assert!(!v.is_anonymous());
    }
}
