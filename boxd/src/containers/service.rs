//! §4.F Containers service: the largest single component, grounded in the
//! teacher's `runtime/core.rs` + `litebox/manager.rs` + `litebox/lifecycle.rs`
//! + `litebox/box_impl.rs` quartet — the in-memory cache with
//! database-first persistence, the double-checked-locking idempotent
//! bootstrap (`litebox/lifecycle.rs::ensure_ready`), and the `CleanupGuard`
//! RAII pattern (`litebox/init/types.rs`) for failure-path cleanup.

use super::bundle::BundleLayout;
use super::config::ContainerConfig;
use super::exitmonitor::ExitMonitor;
use super::manager::ContainerManager;
use super::plugin::lookup_plugin;
use super::sandbox_client::{SandboxClient, StdioConfig, UnixSandboxClient};
use super::state::ContainerStatus;
use crate::lockmap::LockMap;
use crate::network::NetworksService;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::supervisor::ServiceSupervisor;
use boxd_shared::errors::{CoreError, CoreResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

pub struct StopOptions {
    pub timeout: std::time::Duration,
    pub signal: i32,
}

/// The label domain every helper is registered under (§4.G).
const SUPERVISOR_DOMAIN: &str = "io.boxd.sandbox";

struct ContainersServiceInner {
    manager: ContainerManager,
    bundles_root: PathBuf,
    supervisor: Arc<dyn ServiceSupervisor>,
    networks: NetworksService,
    exit_monitor: Arc<ExitMonitor>,
    /// §5's intra-operation lock, bounding the multi-suspension sequences:
    /// create, delete, bootstrap, exit-handling.
    op_lock: AsyncMutex<()>,
    /// Per-hostname locking for `create`'s collision check (§8: "concurrent
    /// create of two containers with colliding hostnames: exactly one
    /// succeeds"). Redundant with `op_lock` today (the whole service is
    /// already single-writer) but keeps the collision-resolution logic
    /// correct independent of how finely `op_lock` ends up scoped later.
    hostname_locks: LockMap<String>,
}

#[derive(Clone)]
pub struct ContainersService {
    inner: Arc<ContainersServiceInner>,
}

impl ContainersService {
    pub fn new(
        manager: ContainerManager,
        bundles_root: PathBuf,
        supervisor: Arc<dyn ServiceSupervisor>,
        networks: NetworksService,
    ) -> Self {
        Self {
            inner: Arc::new(ContainersServiceInner {
                manager,
                bundles_root,
                supervisor,
                networks,
                exit_monitor: Arc::new(ExitMonitor::new()),
                op_lock: AsyncMutex::new(()),
                hostname_locks: LockMap::new(),
            }),
        }
    }

    /// §4.F boot: enumerate bundle directories, decode each config, verify
    /// its runtime plugin still exists, admit a `stopped` snapshot.
    /// Bundles that fail to decode are removed from disk (stronger than
    /// the generic entity-store skip-and-warn, because a container bundle
    /// with no readable config is unrecoverable debris, not a transient
    /// listing nuisance).
    pub async fn boot(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.inner.bundles_root)?;
        for entry in std::fs::read_dir(&self.inner.bundles_root)?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            let layout = BundleLayout::new(&self.inner.bundles_root, &id);

            match std::fs::read(layout.config_path()).ok().and_then(|b| serde_json::from_slice::<ContainerConfig>(&b).ok()) {
                Some(cfg) if lookup_plugin(&cfg.runtime_handler).is_ok() => {
                    if let Err(e) = self.inner.manager.register_recovered(cfg) {
                        tracing::warn!(container_id = %id, error = %e, "failed to admit recovered container");
                    }
                }
                _ => {
                    tracing::warn!(container_id = %id, "bundle failed to decode or names an unknown runtime; removing");
                    let _ = layout.cleanup();
                }
            }
        }
        Ok(())
    }

    /// §4.F `create`. `progress` receives `task_started`/`task_finished`
    /// around the bundle-materialization work (§9); pass
    /// [`crate::progress::NullSink`] when nothing is watching.
    pub async fn create(&self, cfg: ContainerConfig, progress: &dyn ProgressSink) -> CoreResult<()> {
        if !super::config::validate_container_id(&cfg.id) {
            return Err(CoreError::InvalidArgument(format!(
                "container id '{}' must match [a-zA-Z0-9][a-zA-Z0-9_.-]+",
                cfg.id
            )));
        }

        let task = format!("container.create.{}", cfg.id);
        progress.emit(ProgressEvent::TaskStarted { task: task.clone() });
        let result = self.create_inner(cfg).await;
        progress.emit(ProgressEvent::TaskFinished { task, ok: result.is_ok() });
        result
    }

    async fn create_inner(&self, cfg: ContainerConfig) -> CoreResult<()> {
        let _op_guard = self.inner.op_lock.lock().await;

        if self.inner.manager.get(&cfg.id).is_ok() {
            return Err(CoreError::Exists(format!("container '{}' already exists", cfg.id)));
        }

        let mut requested_hostnames: Vec<&str> = cfg.networks.iter().map(|n| n.hostname.as_str()).collect();
        requested_hostnames.sort_unstable();
        let mut hostname_guards = Vec::with_capacity(requested_hostnames.len());
        for hostname in requested_hostnames {
            hostname_guards.push(self.inner.hostname_locks.lock(hostname.to_string()).await);
        }

        let existing_hostnames = self.inner.manager.hostnames_in_use()?;
        let colliding: Vec<&str> = cfg
            .networks
            .iter()
            .map(|n| n.hostname.as_str())
            .filter(|h| existing_hostnames.contains(*h))
            .collect();
        if !colliding.is_empty() {
            return Err(CoreError::Exists(format!("hostname(s) already exist: {colliding:?}")));
        }

        lookup_plugin(&cfg.runtime_handler)?;

        let id = cfg.id.clone();
        let layout = BundleLayout::new(&self.inner.bundles_root, &id);

        // The manager's `register` is what actually brings the bundle
        // directory into existence (via its `EntityStore`, writing
        // `config.json` in the same motion); it must run before
        // `layout.create()`'s own directory creation so the guard below
        // has something to both roll back.
        self.inner.manager.register(cfg.clone())?;
        let mut guard = CreateGuard { manager: self.inner.manager.clone(), layout: layout.clone(), id: id.clone(), armed: true };

        layout.create()?;
        std::fs::write(
            layout.kernel_metadata_path(),
            serde_json::to_vec_pretty(&serde_json::json!({ "platform": cfg.image.platform }))?,
        )?;
        std::fs::write(layout.create_options_path(), serde_json::to_vec_pretty(&serde_json::json!({}))?)?;

        guard.armed = false;
        Ok(())
    }

    /// §4.F `bootstrap`: idempotent double-checked-locking init. `progress`
    /// receives `task_started`/`task_finished` around the helper-launch and
    /// handshake (§9); pass [`crate::progress::NullSink`] when nothing is
    /// watching.
    pub async fn bootstrap(&self, id: &str, stdio: StdioConfig, progress: &dyn ProgressSink) -> CoreResult<()> {
        if self.inner.manager.client_for(id)?.is_some() {
            return Ok(());
        }

        let _op_guard = self.inner.op_lock.lock().await;
        if self.inner.manager.client_for(id)?.is_some() {
            return Ok(());
        }

        let (cfg, _state) = self.inner.manager.get(id)?;
        let plugin = lookup_plugin(&cfg.runtime_handler)?;

        let task = format!("container.bootstrap.{id}");
        progress.emit(ProgressEvent::TaskStarted { task: task.clone() });

        let result: CoreResult<()> = async {
            let args = plugin.helper_args(&cfg);
            let state_root = BundleLayout::new(&self.inner.bundles_root, id).root().to_path_buf();
            let (_label, transport) = self
                .inner
                .supervisor
                .register(plugin.helper_binary(), &state_root, &args, SUPERVISOR_DOMAIN, plugin.name(), id)
                .await?;

            let client: Arc<dyn SandboxClient> = Arc::new(UnixSandboxClient::new(transport));
            client.bootstrap(stdio).await?;
            self.inner.manager.set_client(id, client)?;
            Ok(())
        }
        .await;

        progress.emit(ProgressEvent::TaskFinished { task, ok: result.is_ok() });

        if result.is_err() {
            let _ = self.cleanup(id).await;
        }
        result
    }

    /// §4.F `start_process`.
    pub async fn start_process(&self, id: &str, process_id: &str) -> CoreResult<()> {
        let (_cfg, state) = self.inner.manager.get(id)?;
        let is_init = process_id == id;

        if is_init && state.status == ContainerStatus::Running {
            return Ok(());
        }

        let client = self
            .inner
            .manager
            .client_for(id)?
            .ok_or_else(|| CoreError::InvalidState(format!("container '{id}' has not been bootstrapped")))?;
        client.start_process(process_id).await?;

        if is_init {
            let attachments = self.allocate_networks(id).await?;
            self.inner.manager.update_state(id, |s| s.mark_running(attachments))?;

            let wait_client = client.clone();
            let wait_process_id = process_id.to_string();
            let service = self.clone();
            self.inner
                .exit_monitor
                .track(
                    id.to_string(),
                    move || async move { wait_client.wait(&wait_process_id).await.unwrap_or(-1) },
                    move |container_id, exit_code| {
                        tokio::spawn(async move {
                            service.handle_exit(&container_id, exit_code).await;
                        });
                    },
                )
                .await;
        }
        Ok(())
    }

    async fn allocate_networks(&self, id: &str) -> CoreResult<Vec<crate::network::Attachment>> {
        let (cfg, _state) = self.inner.manager.get(id)?;
        let mut attachments = Vec::with_capacity(cfg.networks.len());
        for req in &cfg.networks {
            attachments.push(self.inner.networks.allocate(&req.network_id, &req.hostname).await?);
        }
        Ok(attachments)
    }

    pub async fn kill(&self, id: &str, process_id: &str, signal: i32) -> CoreResult<()> {
        let client = self
            .inner
            .manager
            .client_for(id)?
            .ok_or_else(|| CoreError::InvalidState(format!("container '{id}' has not been bootstrapped")))?;
        client.kill(process_id, signal).await
    }

    /// §4.F `stop`: idempotent.
    pub async fn stop(&self, id: &str, options: StopOptions) -> CoreResult<()> {
        let client = match self.inner.manager.client_for(id)? {
            Some(c) => c,
            None => return Ok(()),
        };

        let result = tokio::time::timeout(options.timeout, client.kill(id, options.signal)).await;
        match result {
            Ok(Ok(())) | Err(_) => {}
            Ok(Err(e)) if e.kind_code() == "interrupted" => {}
            Ok(Err(e)) => return Err(e),
        }

        self.handle_exit(id, -1).await;
        Ok(())
    }

    pub async fn wait(&self, id: &str, process_id: &str) -> CoreResult<i32> {
        let client = self
            .inner
            .manager
            .client_for(id)?
            .ok_or_else(|| CoreError::InvalidState(format!("container '{id}' has not been bootstrapped")))?;
        client.wait(process_id).await
    }

    pub async fn resize(&self, id: &str, process_id: &str, cols: u16, rows: u16) -> CoreResult<()> {
        let client = self
            .inner
            .manager
            .client_for(id)?
            .ok_or_else(|| CoreError::InvalidState(format!("container '{id}' has not been bootstrapped")))?;
        client.resize(process_id, cols, rows).await
    }

    /// §4.F `delete`.
    pub async fn delete(&self, id: &str, force: bool) -> CoreResult<()> {
        let _op_guard = self.inner.op_lock.lock().await;
        let (cfg, state) = self.inner.manager.get(id)?;

        match state.status {
            ContainerStatus::Stopping => {
                return Err(CoreError::InvalidState(format!("container '{id}' is stopping")));
            }
            ContainerStatus::Running if !force => {
                return Err(CoreError::InvalidState(format!("container '{id}' is running")));
            }
            ContainerStatus::Running => {
                self.stop(id, StopOptions { timeout: std::time::Duration::ZERO, signal: libc::SIGKILL }).await?;
            }
            ContainerStatus::Stopped => {}
        }

        let _ = cfg;
        self.cleanup(id).await
    }

    /// §4.F cleanup: stop exit tracking, deregister the helper, delete the
    /// bundle, drop the in-memory entry.
    async fn cleanup(&self, id: &str) -> CoreResult<()> {
        self.inner.exit_monitor.stop_tracking(id).await;

        if let Some(client) = self.inner.manager.client_for(id).ok().flatten() {
            if let Err(e) = client.shutdown().await {
                tracing::warn!(container_id = %id, error = %e, "failed to gracefully shut down sandbox during cleanup");
            }
        }
        let _ = self.inner.supervisor.deregister(&format!("{SUPERVISOR_DOMAIN}.{id}")).await;

        let layout = BundleLayout::new(&self.inner.bundles_root, id);
        if let Err(e) = layout.cleanup() {
            tracing::warn!(container_id = %id, error = %e, "failed to remove bundle directory during cleanup");
        }
        self.inner.manager.remove(id)
    }

    /// §4.F exit handling: entered from the sandbox's wait returning, an
    /// explicit stop, or `delete --force`.
    async fn handle_exit(&self, id: &str, _exit_code: i32) {
        self.inner.exit_monitor.stop_tracking(id).await;

        let client = self.inner.manager.client_for(id).ok().flatten();
        if let Some(client) = client {
            if let Err(e) = client.shutdown().await {
                tracing::debug!(container_id = %id, error = %e, "sandbox shutdown during exit handling failed (may already be dead)");
            }
        }
        let _ = self.inner.supervisor.deregister(&format!("{SUPERVISOR_DOMAIN}.{id}")).await;

        let auto_remove = self.inner.manager.get(id).map(|(cfg, _)| cfg.auto_remove).unwrap_or(false);
        if self.inner.manager.update_state(id, |s| s.mark_stopped()).is_err() {
            return;
        }
        let _ = self.inner.manager.clear_client(id);

        if auto_remove {
            if let Err(e) = self.cleanup(id).await {
                tracing::warn!(container_id = %id, error = %e, "auto_remove cleanup failed");
            }
        }
    }

    /// The container-list critical section the Networks service's
    /// `delete` acquires (§4.E, §5).
    pub fn with_container_list<R>(&self, op: impl FnOnce(&[ContainerConfig]) -> R) -> CoreResult<R> {
        self.inner.manager.with_container_list(op)
    }

    /// Whether any container currently references `network_id` — the
    /// closure the composition root hands to `NetworksService::delete`.
    pub fn references_network(&self, network_id: &str) -> CoreResult<bool> {
        self.with_container_list(|configs| {
            configs.iter().any(|c| c.networks.iter().any(|n| n.network_id == network_id))
        })
    }
}

fn _assert_send_sync<T: Send + Sync>() {}
const _: fn() = || {
    _assert_send_sync::<ContainersService>();
};

struct CreateGuard {
    manager: ContainerManager,
    layout: BundleLayout,
    id: String,
    armed: bool,
}

impl Drop for CreateGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.layout.cleanup() {
            tracing::warn!(error = %e, "failed to clean up bundle after failed create");
        }
        if let Err(e) = self.manager.remove(&self.id) {
            tracing::warn!(error = %e, "failed to unregister container after failed create");
        }
    }
}
