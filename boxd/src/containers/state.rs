//! §3 Container runtime state (mutable).

use crate::network::Attachment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerStatus {
    Stopped,
    Running,
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRuntimeState {
    pub status: ContainerStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub allocated_networks: Vec<Attachment>,
}

impl ContainerRuntimeState {
    pub fn stopped() -> Self {
        Self { status: ContainerStatus::Stopped, started_at: None, allocated_networks: Vec::new() }
    }

    pub fn mark_running(&mut self, allocated_networks: Vec<Attachment>) {
        self.status = ContainerStatus::Running;
        self.started_at = Some(Utc::now());
        self.allocated_networks = allocated_networks;
    }

    pub fn mark_stopped(&mut self) {
        self.status = ContainerStatus::Stopped;
        self.started_at = None;
        self.allocated_networks.clear();
    }
}
