//! Connection descriptor for reaching a per-container sandbox helper.
//!
//! The transport itself (the wire protocol spoken over it) is out of scope
//! per spec.md §1 — this only describes *where* to dial.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Transport {
    /// A Unix domain socket at the given path.
    Unix(PathBuf),
}

impl Transport {
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Transport::Unix(path.into())
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            Transport::Unix(p) => p,
        }
    }
}
