//! §4.E Networks service: single-writer actor (§5) over network lifecycle.
//!
//! Modeled on the teacher's `BoxManager`/database-first discipline
//! (`litebox/manager.rs`): an `Arc`-shared inner guarded by a
//! `tokio::sync::Mutex` intra-operation lock, wrapping the in-memory cache
//! and an `EntityStore` for persistence.

use super::allocator::Allocator;
use super::plugin::lookup_plugin;
use super::types::{
    validate_network_id, Attachment, NetworkConfig, NetworkRuntimeState, NetworkRunningStatus,
    BUILTIN_LABEL, DEFAULT_NETWORK_ID, LEGACY_PLUGIN_NAME, RESERVED_NONE_ID,
};
use crate::entitystore::EntityStore;
use boxd_shared::errors::{CoreError, CoreResult};
use boxd_shared::Transport;
use ipnetwork::IpNetwork;
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

struct NetworkEntry {
    state: NetworkRuntimeState,
    transport: Option<Transport>,
    allocator: Arc<Allocator>,
}

struct NetworksState {
    entries: HashMap<String, NetworkEntry>,
    busy: HashSet<String>,
}

struct NetworksServiceInner {
    state: AsyncMutex<NetworksState>,
    store: EntityStore<NetworkConfig>,
}

#[derive(Clone)]
pub struct NetworksService {
    inner: Arc<NetworksServiceInner>,
}

/// Default allocator size (a /24-equivalent address pool, minus network +
/// broadcast) for networks that don't otherwise size their attachment
/// space.
const DEFAULT_ALLOCATOR_SIZE: usize = 253;

impl NetworksService {
    pub fn new(store: EntityStore<NetworkConfig>) -> Self {
        Self {
            inner: Arc::new(NetworksServiceInner {
                state: AsyncMutex::new(NetworksState { entries: HashMap::new(), busy: HashSet::new() }),
                store,
            }),
        }
    }

    /// Loads persisted configurations, self-heals legacy entries, and
    /// starts each network's helper. A network whose helper fails to start
    /// is logged and left out of service, per §4.E boot semantics.
    pub async fn boot(&self) -> CoreResult<()> {
        let configs = self.inner.store.list()?;
        let mut state = self.inner.state.lock().await;

        for (id, mut cfg) in configs {
            if id == DEFAULT_NETWORK_ID && !cfg.is_builtin() {
                cfg.labels.insert(BUILTIN_LABEL.to_string(), "true".to_string());
            }
            if cfg.plugin_info.is_none() {
                cfg.plugin_info = Some(super::types::PluginInfo {
                    plugin_name: LEGACY_PLUGIN_NAME.to_string(),
                    variant: None,
                });
            }

            match self.start_helper(&cfg).await {
                Ok((transport, status)) => {
                    let allocator = Arc::new(Allocator::new(lower_ip(&cfg), DEFAULT_ALLOCATOR_SIZE));
                    state.entries.insert(
                        id.clone(),
                        NetworkEntry {
                            state: NetworkRuntimeState::Running(cfg, status),
                            transport: Some(transport),
                            allocator,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(network_id = %id, error = %e, "network failed to start during boot");
                }
            }
        }
        Ok(())
    }

    async fn start_helper(&self, cfg: &NetworkConfig) -> CoreResult<(Transport, NetworkRunningStatus)> {
        let plugin_info = cfg
            .plugin_info
            .as_ref()
            .ok_or_else(|| CoreError::Internal("network config missing plugin_info".to_string()))?;
        let plugin = lookup_plugin(&plugin_info.plugin_name)?;
        let transport = plugin
            .register(&cfg.id, cfg.mode, cfg.ipv4_subnet, cfg.ipv6_subnet, plugin_info.variant.as_deref())
            .await?;
        let status = plugin.query_state(&transport).await?;
        Ok((transport, status))
    }

    /// §4.E `create`.
    pub async fn create(&self, mut cfg: NetworkConfig) -> CoreResult<NetworkRunningStatus> {
        if cfg.id == RESERVED_NONE_ID {
            return Err(CoreError::InvalidArgument(format!("network id '{RESERVED_NONE_ID}' is reserved")));
        }
        if !validate_network_id(&cfg.id) {
            return Err(CoreError::InvalidArgument(format!(
                "network id '{}' must match ^[a-z0-9](?:[a-z0-9._-]{{0,61}}[a-z0-9])?$",
                cfg.id
            )));
        }

        let _busy_guard = self.claim_busy(&cfg.id).await?;

        let mut state = self.inner.state.lock().await;
        if state.entries.contains_key(&cfg.id) {
            return Err(CoreError::Exists(format!("network '{}' already exists", cfg.id)));
        }

        for entry in state.entries.values() {
            if !entry.state.is_running() {
                continue;
            }
            let existing = entry.state.config();
            if subnets_overlap(cfg.ipv4_subnet, existing.ipv4_subnet)
                || subnets_overlap(cfg.ipv6_subnet, existing.ipv6_subnet)
            {
                return Err(CoreError::InvalidArgument(format!(
                    "network '{}' subnet overlaps running network '{}'",
                    cfg.id, existing.id
                )));
            }
        }

        if cfg.plugin_info.is_none() {
            cfg.plugin_info = Some(super::types::PluginInfo {
                plugin_name: LEGACY_PLUGIN_NAME.to_string(),
                variant: None,
            });
        }

        let (transport, status) = self.start_helper(&cfg).await?;
        let allocator = Arc::new(Allocator::new(lower_ip(&cfg), DEFAULT_ALLOCATOR_SIZE));

        if let Err(e) = self.inner.store.create(&cfg.id, &cfg) {
            let plugin = lookup_plugin(&cfg.plugin_info.as_ref().unwrap().plugin_name)?;
            let _ = plugin.deregister(&transport).await;
            return Err(e);
        }

        state.entries.insert(
            cfg.id.clone(),
            NetworkEntry { state: NetworkRuntimeState::Running(cfg, status.clone()), transport: Some(transport), allocator },
        );
        Ok(status)
    }

    /// §4.E `delete`. `container_list_check` is the cross-service call into
    /// the Containers service's container-list critical section — passed
    /// in by the composition root rather than called directly, so this
    /// module never depends on `boxd::containers`.
    pub async fn delete(
        &self,
        id: &str,
        container_list_check: impl FnOnce(&str) -> CoreResult<bool>,
    ) -> CoreResult<()> {
        let _busy_guard = self.claim_busy(id).await?;

        let mut state = self.inner.state.lock().await;
        let entry = state
            .entries
            .get(id)
            .ok_or_else(|| CoreError::NotFound(format!("network '{id}' does not exist")))?;
        if !entry.state.is_running() {
            return Err(CoreError::InvalidState(format!("network '{id}' is not running")));
        }
        if entry.state.config().is_builtin() {
            return Err(CoreError::InvalidState(format!("network '{id}' is builtin and cannot be deleted")));
        }

        if container_list_check(id)? {
            return Err(CoreError::InvalidState(format!("network '{id}' is in use by one or more containers")));
        }

        if !entry.allocator.disable() {
            return Err(CoreError::InvalidState(format!(
                "network '{id}' has outstanding attachments"
            )));
        }

        let entry = state.entries.remove(id).expect("checked present above");
        if let (Some(transport), Some(plugin_info)) = (entry.transport, entry.state.config().plugin_info.clone()) {
            if let Ok(plugin) = lookup_plugin(&plugin_info.plugin_name) {
                if let Err(e) = plugin.deregister(&transport).await {
                    tracing::warn!(network_id = %id, error = %e, "failed to deregister network helper");
                }
            }
        }
        if let Err(e) = self.inner.store.delete(id) {
            tracing::warn!(network_id = %id, error = %e, "failed to delete persisted network config");
        }
        Ok(())
    }

    /// Whether `id` is currently known to this service (running or not).
    /// Used by the composition root's boot sequence to decide whether the
    /// `default` network still needs to be materialized.
    pub async fn contains(&self, id: &str) -> bool {
        self.inner.state.lock().await.entries.contains_key(id)
    }

    /// §4.E `lookup`: scans all networks in no defined order, first hit wins.
    pub async fn lookup(&self, hostname: &str) -> Option<Attachment> {
        let state = self.inner.state.lock().await;
        for (network_id, entry) in state.entries.iter() {
            if let Some(index) = entry.allocator.lookup(hostname) {
                return Some(synthesize_attachment(network_id, hostname, &entry.state, index));
            }
        }
        None
    }

    pub async fn allocate(&self, network_id: &str, hostname: &str) -> CoreResult<Attachment> {
        let state = self.inner.state.lock().await;
        let entry = state
            .entries
            .get(network_id)
            .ok_or_else(|| CoreError::NotFound(format!("network '{network_id}' does not exist")))?;
        let (index, _addr) = entry.allocator.allocate(hostname)?;
        Ok(synthesize_attachment(network_id, hostname, &entry.state, index))
    }

    pub async fn deallocate(&self, attachment: &Attachment) -> CoreResult<()> {
        let state = self.inner.state.lock().await;
        let entry = state
            .entries
            .get(&attachment.network_id)
            .ok_or_else(|| CoreError::NotFound(format!("network '{}' does not exist", attachment.network_id)))?;
        entry.allocator.deallocate(&attachment.hostname);
        Ok(())
    }

    async fn claim_busy(&self, id: &str) -> CoreResult<BusyGuard<'_>> {
        let mut state = self.inner.state.lock().await;
        if state.busy.contains(id) {
            return Err(CoreError::InvalidState(format!("network '{id}' has an operation already in progress")));
        }
        state.busy.insert(id.to_string());
        drop(state);
        Ok(BusyGuard { service: self, id: id.to_string() })
    }
}

struct BusyGuard<'a> {
    service: &'a NetworksService,
    id: String,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let inner = self.service.inner.clone();
        let id = self.id.clone();
        tokio::spawn(async move {
            inner.state.lock().await.busy.remove(&id);
        });
    }
}

fn lower_ip(cfg: &NetworkConfig) -> Ipv4Addr {
    match cfg.ipv4_subnet {
        Some(IpNetwork::V4(net)) => {
            let base: u32 = net.network().into();
            Ipv4Addr::from(base.wrapping_add(2))
        }
        _ => Ipv4Addr::new(10, 0, 0, 2),
    }
}

fn subnets_overlap(a: Option<IpNetwork>, b: Option<IpNetwork>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.contains(b.network()) || b.contains(a.network()),
        _ => false,
    }
}

fn synthesize_attachment(network_id: &str, hostname: &str, state: &NetworkRuntimeState, index: usize) -> Attachment {
    let cfg = state.config();
    let base: u32 = match cfg.ipv4_subnet {
        Some(IpNetwork::V4(net)) => net.network().into(),
        _ => u32::from(Ipv4Addr::new(10, 0, 0, 0)),
    };
    let addr = std::net::Ipv4Addr::from(base.wrapping_add(2).wrapping_add(index as u32));
    let gateway = match state {
        NetworkRuntimeState::Running(_, status) => status.ipv4_gateway,
        NetworkRuntimeState::Created(_) => None,
    }
    .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::from(base.wrapping_add(1))));

    Attachment {
        network_id: network_id.to_string(),
        hostname: hostname.to_string(),
        ipv4_address: std::net::IpAddr::V4(addr),
        ipv4_prefix: cfg.ipv4_subnet.map(|n| n.prefix()).unwrap_or(24),
        ipv4_gateway: gateway,
        ipv6_address: None,
        ipv6_prefix: None,
        mac: locally_administered_mac(network_id, hostname),
    }
}

/// Deterministic locally-administered-unicast MAC derived from network id
/// and hostname, used when no MAC is supplied at attach time (§3).
fn locally_administered_mac(network_id: &str, hostname: &str) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    use std::hash::{Hash, Hasher};
    network_id.hash(&mut hasher);
    hostname.hash(&mut hasher);
    let h = hasher.finish().to_be_bytes();
    format!("02:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", h[0], h[1], h[2], h[3], h[4])
}
