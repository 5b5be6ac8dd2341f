//! §4.F Containers service and §4.H Exit monitor.

pub mod bundle;
pub mod config;
pub mod exitmonitor;
pub mod manager;
pub mod plugin;
pub mod sandbox_client;
pub mod service;
pub mod state;

pub use config::{ContainerConfig, NetworkAttachmentRequest, ProcessSpec, Resources};
pub use exitmonitor::ExitMonitor;
pub use manager::ContainerManager;
pub use plugin::{lookup_plugin, RuntimePlugin};
pub use sandbox_client::{SandboxClient, StdioConfig};
pub use service::{ContainersService, StopOptions};
pub use state::{ContainerRuntimeState, ContainerStatus};
