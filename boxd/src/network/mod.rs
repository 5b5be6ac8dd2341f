//! §4.D/§4.E Attachment allocator and Networks service.

pub mod allocator;
pub mod plugin;
pub mod service;
pub mod types;

pub use allocator::Allocator;
pub use plugin::{lookup_plugin, NetworkPlugin};
pub use service::NetworksService;
pub use types::{Attachment, NetworkConfig, NetworkMode, NetworkRuntimeState, NetworkRunningStatus, PluginInfo};
