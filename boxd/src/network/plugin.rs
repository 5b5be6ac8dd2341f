//! Network plugin registry (§9: "resolve plugin identity via a registry; do
//! not rely on inheritance"). Plugins register at compile time with
//! `inventory::submit!` and are looked up by name at runtime.

use super::types::{NetworkMode, NetworkRunningStatus};
use async_trait::async_trait;
use boxd_shared::errors::{CoreError, CoreResult};
use boxd_shared::Transport;
use ipnetwork::IpNetwork;

/// The network helper side of a plugin: spawns/queries/tears down the
/// per-network supervisor-managed process.
#[async_trait]
pub trait NetworkPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    async fn register(
        &self,
        network_id: &str,
        mode: NetworkMode,
        ipv4_subnet: Option<IpNetwork>,
        ipv6_subnet: Option<IpNetwork>,
        variant: Option<&str>,
    ) -> CoreResult<Transport>;

    async fn query_state(&self, transport: &Transport) -> CoreResult<NetworkRunningStatus>;

    async fn deregister(&self, transport: &Transport) -> CoreResult<()>;
}

inventory::collect!(&'static dyn NetworkPlugin);

/// Looks up a registered plugin by name.
pub fn lookup_plugin(name: &str) -> CoreResult<&'static dyn NetworkPlugin> {
    inventory::iter::<&'static dyn NetworkPlugin>()
        .find(|p| p.name() == name)
        .copied()
        .ok_or_else(|| CoreError::Unsupported(format!("no network plugin registered for '{name}'")))
}
