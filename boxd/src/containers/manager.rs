//! In-memory container cache plus bundle-config persistence, grounded in
//! the teacher's `BoxManager` (`litebox/manager.rs`): a `RwLock`-guarded
//! cache with database-first writes, renamed box→container throughout.
//! Unlike the teacher's SQLite-backed `BoxStore`, persistence here is an
//! `EntityStore<ContainerConfig>` rooted at the same directory
//! `ContainersService` uses for each container's bundle (§4.C) — the
//! entity store owns `config.json` and the directory's existence;
//! `ContainersService` adds the bundle's other files (`kernel.json`,
//! `create_options.json`, `rootfs/`) only after `register` succeeds.

use super::config::ContainerConfig;
use super::sandbox_client::SandboxClient;
use super::state::ContainerRuntimeState;
use crate::entitystore::EntityStore;
use boxd_shared::errors::{CoreError, CoreResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

struct CacheEntry {
    config: ContainerConfig,
    state: ContainerRuntimeState,
    client: Option<Arc<dyn SandboxClient>>,
}

struct ManagerInner {
    containers: HashMap<String, CacheEntry>,
    store: EntityStore<ContainerConfig>,
}

#[derive(Clone)]
pub struct ContainerManager {
    inner: Arc<RwLock<ManagerInner>>,
}

impl ContainerManager {
    pub fn new(store: EntityStore<ContainerConfig>) -> Self {
        Self { inner: Arc::new(RwLock::new(ManagerInner { containers: HashMap::new(), store })) }
    }

    fn lock_read(&self) -> CoreResult<std::sync::RwLockReadGuard<'_, ManagerInner>> {
        self.inner.read().map_err(|e| CoreError::Internal(format!("container manager lock poisoned: {e}")))
    }

    fn lock_write(&self) -> CoreResult<std::sync::RwLockWriteGuard<'_, ManagerInner>> {
        self.inner.write().map_err(|e| CoreError::Internal(format!("container manager lock poisoned: {e}")))
    }

    /// Database-first: persists `config` (creating the bundle directory
    /// and its `config.json`) before caching a fresh `stopped` snapshot.
    /// Callers must not have created the bundle directory themselves —
    /// this call is the one that brings it into existence.
    pub fn register(&self, config: ContainerConfig) -> CoreResult<()> {
        let mut inner = self.lock_write()?;
        if inner.containers.contains_key(&config.id) {
            return Err(CoreError::Exists(format!("container '{}' already exists", config.id)));
        }
        inner.store.create(&config.id, &config)?;
        let id = config.id.clone();
        inner.containers.insert(id, CacheEntry { config, state: ContainerRuntimeState::stopped(), client: None });
        Ok(())
    }

    /// Admits a recovered config as a `stopped` snapshot without
    /// re-persisting (§4.F boot: runtime state is never carried across a
    /// restart, and the bundle directory already exists on disk).
    pub fn register_recovered(&self, config: ContainerConfig) -> CoreResult<()> {
        let mut inner = self.lock_write()?;
        let id = config.id.clone();
        inner.containers.insert(id, CacheEntry { config, state: ContainerRuntimeState::stopped(), client: None });
        Ok(())
    }

    pub fn get(&self, id: &str) -> CoreResult<(ContainerConfig, ContainerRuntimeState)> {
        let inner = self.lock_read()?;
        let entry = inner.containers.get(id).ok_or_else(|| CoreError::NotFound(format!("container '{id}' does not exist")))?;
        Ok((entry.config.clone(), entry.state.clone()))
    }

    pub fn client_for(&self, id: &str) -> CoreResult<Option<Arc<dyn SandboxClient>>> {
        let inner = self.lock_read()?;
        let entry = inner.containers.get(id).ok_or_else(|| CoreError::NotFound(format!("container '{id}' does not exist")))?;
        Ok(entry.client.clone())
    }

    pub fn set_client(&self, id: &str, client: Arc<dyn SandboxClient>) -> CoreResult<()> {
        let mut inner = self.lock_write()?;
        let entry = inner.containers.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("container '{id}' does not exist")))?;
        entry.client = Some(client);
        Ok(())
    }

    /// Drops the cached sandbox client (exit handling: the helper is gone,
    /// so `client_for` must stop returning it once the container is
    /// `stopped`).
    pub fn clear_client(&self, id: &str) -> CoreResult<()> {
        let mut inner = self.lock_write()?;
        let entry = inner.containers.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("container '{id}' does not exist")))?;
        entry.client = None;
        Ok(())
    }

    pub fn update_state(&self, id: &str, f: impl FnOnce(&mut ContainerRuntimeState)) -> CoreResult<()> {
        let mut inner = self.lock_write()?;
        let entry = inner.containers.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("container '{id}' does not exist")))?;
        f(&mut entry.state);
        Ok(())
    }

    /// Removes the in-memory entry and its persisted `config.json`. The
    /// caller still owns removing the rest of the bundle (`rootfs/` etc.)
    /// via `BundleLayout::cleanup`, which deletes the whole directory
    /// including what this call already dropped.
    pub fn remove(&self, id: &str) -> CoreResult<()> {
        let mut inner = self.lock_write()?;
        inner.containers.remove(id);
        match inner.store.delete(id) {
            Ok(()) | Err(CoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Every hostname currently claimed by a networked container, for the
    /// create-time collision check (§4.F step 2).
    pub fn hostnames_in_use(&self) -> CoreResult<HashSet<String>> {
        let inner = self.lock_read()?;
        Ok(inner
            .containers
            .values()
            .flat_map(|e| e.config.networks.iter().map(|n| n.hostname.clone()))
            .collect())
    }

    /// Container-list critical section (§4.F, §5): a consistent snapshot
    /// of every config, for callers (the Networks service) that need to
    /// scan for references while holding this manager's lock.
    pub fn with_container_list<R>(&self, op: impl FnOnce(&[ContainerConfig]) -> R) -> CoreResult<R> {
        let inner = self.lock_read()?;
        let configs: Vec<ContainerConfig> = inner.containers.values().map(|e| e.config.clone()).collect();
        Ok(op(&configs))
    }

    pub fn list(&self) -> CoreResult<Vec<(ContainerConfig, ContainerRuntimeState)>> {
        let inner = self.lock_read()?;
        Ok(inner.containers.values().map(|e| (e.config.clone(), e.state.clone())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::config::{ImageReference, NetworkAttachmentRequest, Platform, ProcessSpec, Resources};
    use crate::containers::sandbox_client::StdioConfig;
    use async_trait::async_trait;

    struct NoopSandboxClient;

    #[async_trait]
    impl SandboxClient for NoopSandboxClient {
        async fn bootstrap(&self, _stdio: StdioConfig) -> CoreResult<()> {
            Ok(())
        }
        async fn start_process(&self, _process_id: &str) -> CoreResult<()> {
            Ok(())
        }
        async fn kill(&self, _process_id: &str, _signal: i32) -> CoreResult<()> {
            Ok(())
        }
        async fn wait(&self, _process_id: &str) -> CoreResult<i32> {
            Ok(0)
        }
        async fn resize(&self, _process_id: &str, _cols: u16, _rows: u16) -> CoreResult<()> {
            Ok(())
        }
        async fn shutdown(&self) -> CoreResult<()> {
            Ok(())
        }
    }

    fn sample_config(id: &str, hostname: Option<&str>) -> ContainerConfig {
        ContainerConfig {
            id: id.to_string(),
            image: ImageReference {
                reference: "example/image:latest".to_string(),
                platform: Platform { os: "linux".to_string(), arch: "amd64".to_string(), variant: None },
            },
            process: ProcessSpec {
                executable: "/bin/true".to_string(),
                arguments: Vec::new(),
                environment: Vec::new(),
                working_dir: "/".to_string(),
                user: None,
                group: None,
                supplemental_groups: Vec::new(),
                tty: false,
            },
            resources: Resources { cpus: 1, memory_bytes: 1 << 20 },
            mounts: Vec::new(),
            networks: hostname
                .map(|h| vec![NetworkAttachmentRequest { network_id: "default".to_string(), hostname: h.to_string(), mac: None }])
                .unwrap_or_default(),
            dns: None,
            published_ports: Vec::new(),
            published_sockets: Vec::new(),
            runtime_handler: "test".to_string(),
            labels: HashMap::new(),
            auto_remove: false,
        }
    }

    fn test_manager(tmp: &tempfile::TempDir) -> ContainerManager {
        let store: EntityStore<ContainerConfig> = EntityStore::new(tmp.path()).unwrap();
        ContainerManager::new(store)
    }

    #[test]
    fn register_then_get_round_trips_as_stopped() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(&tmp);
        manager.register(sample_config("c1", None)).unwrap();
        let (_, state) = manager.get("c1").unwrap();
        assert_eq!(state.status, crate::containers::state::ContainerStatus::Stopped);
        assert!(tmp.path().join("c1").join("config.json").is_file());
    }

    #[test]
    fn register_twice_fails_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(&tmp);
        manager.register(sample_config("c1", None)).unwrap();
        let err = manager.register(sample_config("c1", None)).unwrap_err();
        assert_eq!(err.kind_code(), "exists");
    }

    #[test]
    fn remove_forgets_container_and_deletes_config() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(&tmp);
        manager.register(sample_config("c1", None)).unwrap();
        manager.remove("c1").unwrap();
        assert!(manager.get("c1").is_err());
        assert!(!tmp.path().join("c1").exists());
    }

    #[test]
    fn clear_client_removes_set_client() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(&tmp);
        manager.register(sample_config("c1", None)).unwrap();
        manager.set_client("c1", Arc::new(NoopSandboxClient)).unwrap();
        assert!(manager.client_for("c1").unwrap().is_some());

        manager.clear_client("c1").unwrap();
        assert!(manager.client_for("c1").unwrap().is_none());
    }

    #[test]
    fn hostnames_in_use_collects_across_containers() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(&tmp);
        manager.register(sample_config("c1", Some("svc"))).unwrap();
        manager.register(sample_config("c2", Some("db"))).unwrap();
        let hostnames = manager.hostnames_in_use().unwrap();
        assert!(hostnames.contains("svc"));
        assert!(hostnames.contains("db"));
    }
}
