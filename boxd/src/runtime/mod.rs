//! Composition root, analogous to the teacher's `BoxliteRuntime`
//! (`runtime/core.rs`): wires the Containers service, Networks service,
//! Content store, and entity stores together and exposes the §6 IPC
//! route methods as plain async functions (the actual framing that turns
//! these into request/response messages is out of scope, per §6).

use crate::containers::{ContainerConfig, ContainerManager, ContainersService, StdioConfig, StopOptions};
use crate::content::{ContentStore, Digest};
use crate::entitystore::EntityStore;
use crate::network::{NetworkConfig, NetworksService};
use crate::progress::ProgressSink;
use crate::supervisor::{ProcessSupervisor, ServiceSupervisor};
use boxd_shared::errors::CoreResult;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

pub struct PlatformPaths {
    pub app_root: PathBuf,
    pub content_root: PathBuf,
}

impl PlatformPaths {
    pub fn containers_root(&self) -> PathBuf {
        self.app_root.join("containers")
    }

    pub fn networks_root(&self) -> PathBuf {
        self.app_root.join("networks")
    }
}

#[derive(Clone)]
pub struct Platform {
    containers: ContainersService,
    networks: NetworksService,
    content: Arc<ContentStore>,
}

impl Platform {
    /// Builds a platform rooted at `paths`, with the given supervisor
    /// (tests may substitute a stub; production uses `ProcessSupervisor`).
    pub fn new(paths: &PlatformPaths, supervisor: Arc<dyn ServiceSupervisor>) -> CoreResult<Self> {
        let network_store: EntityStore<NetworkConfig> = EntityStore::new(paths.networks_root())?;
        let container_store: EntityStore<ContainerConfig> = EntityStore::new(paths.containers_root())?;
        let content = Arc::new(ContentStore::new(&paths.content_root)?);

        let manager = ContainerManager::new(container_store);
        let networks = NetworksService::new(network_store);
        let containers = ContainersService::new(manager, paths.containers_root(), supervisor, networks.clone());

        Ok(Self { containers, networks, content })
    }

    pub fn with_default_supervisor(paths: &PlatformPaths) -> CoreResult<Self> {
        Self::new(paths, Arc::new(ProcessSupervisor::new()))
    }

    /// Boots both actor services: Networks first (Containers' boot only
    /// needs the runtime plugin registry, not a running Networks service,
    /// but booting network helpers first means any container whose init
    /// process starts immediately after boot sees attachable networks).
    /// Materializes the `default` network if this is the very first boot
    /// (§3 lifecycle summary); a failure to start it is logged, matching
    /// the boot-time treatment of every other network.
    pub async fn boot(&self) -> CoreResult<()> {
        self.networks.boot().await?;

        if !self.networks.contains(crate::network::types::DEFAULT_NETWORK_ID).await {
            if let Err(e) = self.networks.create(NetworkConfig::default_builtin()).await {
                tracing::warn!(error = %e, "failed to create default network on first boot");
            }
        }

        self.containers.boot().await?;
        Ok(())
    }

    pub fn containers(&self) -> &ContainersService {
        &self.containers
    }

    pub fn networks(&self) -> &NetworksService {
        &self.networks
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    // ---- §6 container route set ----

    /// `progress` receives `task_started`/`task_finished` events for the
    /// bundle-materialization work; pass `&*null_sink()` (or any
    /// `ProgressSink`) if nothing is consuming them.
    pub async fn container_create(&self, cfg: ContainerConfig, progress: &dyn ProgressSink) -> CoreResult<()> {
        self.containers.create(cfg, progress).await
    }

    /// As [`Platform::container_create`], for the bootstrap step.
    pub async fn container_bootstrap(&self, id: &str, stdio: StdioConfig, progress: &dyn ProgressSink) -> CoreResult<()> {
        self.containers.bootstrap(id, stdio, progress).await
    }

    pub async fn container_start_process(&self, id: &str, process_id: &str) -> CoreResult<()> {
        self.containers.start_process(id, process_id).await
    }

    pub async fn container_kill(&self, id: &str, process_id: &str, signal: i32) -> CoreResult<()> {
        self.containers.kill(id, process_id, signal).await
    }

    pub async fn container_stop(&self, id: &str, options: StopOptions) -> CoreResult<()> {
        self.containers.stop(id, options).await
    }

    pub async fn container_wait(&self, id: &str, process_id: &str) -> CoreResult<i32> {
        self.containers.wait(id, process_id).await
    }

    pub async fn container_resize(&self, id: &str, process_id: &str, cols: u16, rows: u16) -> CoreResult<()> {
        self.containers.resize(id, process_id, cols, rows).await
    }

    pub async fn container_delete(&self, id: &str, force: bool) -> CoreResult<()> {
        self.containers.delete(id, force).await
    }

    pub fn container_list(&self) -> CoreResult<Vec<ContainerConfig>> {
        Ok(self.containers.with_container_list(|configs| configs.to_vec())?)
    }

    // ---- §6 network route set ----

    pub async fn network_create(&self, cfg: NetworkConfig) -> CoreResult<()> {
        self.networks.create(cfg).await?;
        Ok(())
    }

    /// §4.E step 3/§5: the cross-service call into the Containers
    /// service's container-list critical section, passed as a closure so
    /// `network` never depends on `containers`.
    pub async fn network_delete(&self, id: &str) -> CoreResult<()> {
        let containers = self.containers.clone();
        self.networks.delete(id, move |network_id| containers.references_network(network_id)).await
    }

    pub async fn network_lookup(&self, hostname: &str) -> Option<crate::network::Attachment> {
        self.networks.lookup(hostname).await
    }

    // ---- §6 content store route set ----

    pub fn content_get(&self, digest: &Digest) -> Option<PathBuf> {
        self.content.get(digest)
    }

    pub fn content_new_ingest_session(&self) -> CoreResult<(String, PathBuf)> {
        self.content.new_ingest_session()
    }

    pub fn content_complete_ingest_session(&self, session_id: &str) -> CoreResult<Vec<Digest>> {
        self.content.complete_ingest_session(session_id)
    }

    pub fn content_cancel_ingest_session(&self, session_id: &str) -> CoreResult<()> {
        self.content.cancel_ingest_session(session_id)
    }

    pub fn content_delete_by_digests(&self, digests: &[Digest]) -> CoreResult<(HashSet<Digest>, u64)> {
        self.content.delete_by_digests(digests)
    }

    pub fn content_delete_keeping(&self, keep: &HashSet<Digest>) -> CoreResult<(HashSet<Digest>, u64)> {
        self.content.delete_keeping(keep)
    }
}

/// `<app_root>` layout per §6: `containers/`, `networks/`; content root is
/// independently configurable.
pub fn default_paths(app_root: impl Into<PathBuf>, content_root: impl Into<PathBuf>) -> PlatformPaths {
    PlatformPaths { app_root: app_root.into(), content_root: content_root.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::plugin::NetworkPlugin;
    use crate::network::types::{NetworkMode, NetworkRunningStatus};
    use crate::supervisor::derive_label;
    use async_trait::async_trait;
    use boxd_shared::Transport;
    use ipnetwork::IpNetwork;

    struct NoopBridgePlugin;

    #[async_trait]
    impl NetworkPlugin for NoopBridgePlugin {
        fn name(&self) -> &'static str {
            "bridge"
        }

        async fn register(
            &self,
            _network_id: &str,
            _mode: NetworkMode,
            ipv4_subnet: Option<IpNetwork>,
            ipv6_subnet: Option<IpNetwork>,
            _variant: Option<&str>,
        ) -> CoreResult<Transport> {
            let _ = (ipv4_subnet, ipv6_subnet);
            Ok(Transport::unix("/tmp/runtime-test-bridge.sock"))
        }

        async fn query_state(&self, _transport: &Transport) -> CoreResult<NetworkRunningStatus> {
            Ok(NetworkRunningStatus { ipv4_subnet: None, ipv4_gateway: None, ipv6_subnet: None })
        }

        async fn deregister(&self, _transport: &Transport) -> CoreResult<()> {
            Ok(())
        }
    }

    static NOOP_BRIDGE: NoopBridgePlugin = NoopBridgePlugin;
    inventory::submit! { &NOOP_BRIDGE as &dyn NetworkPlugin }

    struct NoopSupervisor;

    #[async_trait]
    impl ServiceSupervisor for NoopSupervisor {
        async fn register(
            &self,
            _binary: &str,
            _state_root: &std::path::Path,
            _args: &[String],
            domain: &str,
            plugin_name: &str,
            instance_id: &str,
        ) -> CoreResult<(String, Transport)> {
            Ok((derive_label(domain, plugin_name, instance_id), Transport::unix("/tmp/runtime-test-supervisor.sock")))
        }

        async fn deregister(&self, _full_label: &str) -> CoreResult<()> {
            Ok(())
        }
    }

    fn test_platform(tmp: &tempfile::TempDir) -> Platform {
        let paths = default_paths(tmp.path().join("app"), tmp.path().join("content"));
        Platform::new(&paths, Arc::new(NoopSupervisor)).unwrap()
    }

    #[tokio::test]
    async fn boot_creates_default_network_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let platform = test_platform(&tmp);
        platform.boot().await.unwrap();
        assert!(platform.networks().contains("default").await);
    }

    #[tokio::test]
    async fn boot_is_idempotent_across_restarts() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let platform = test_platform(&tmp);
            platform.boot().await.unwrap();
        }
        // Second boot against the same app_root must not fail trying to
        // recreate `default`.
        let platform = test_platform(&tmp);
        platform.boot().await.unwrap();
        assert!(platform.networks().contains("default").await);
    }

    #[tokio::test]
    async fn network_delete_rejects_builtin_default() {
        let tmp = tempfile::tempdir().unwrap();
        let platform = test_platform(&tmp);
        platform.boot().await.unwrap();
        let err = platform.network_delete("default").await.unwrap_err();
        assert_eq!(err.kind_code(), "invalid_state");
    }

    #[tokio::test]
    async fn container_create_rejects_unknown_runtime_handler() {
        use crate::containers::{ProcessSpec, Resources};
        use crate::containers::config::{ImageReference, Platform as ImagePlatform};

        let tmp = tempfile::tempdir().unwrap();
        let platform = test_platform(&tmp);
        platform.boot().await.unwrap();

        let cfg = ContainerConfig {
            id: "c1".to_string(),
            image: ImageReference {
                reference: "example/image:latest".to_string(),
                platform: ImagePlatform { os: "linux".to_string(), arch: "amd64".to_string(), variant: None },
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
            networks: Vec::new(),
            dns: None,
            published_ports: Vec::new(),
            published_sockets: Vec::new(),
            runtime_handler: "does-not-exist".to_string(),
            labels: std::collections::HashMap::new(),
            auto_remove: false,
        };

        let err = platform.container_create(cfg, &*crate::progress::null_sink()).await.unwrap_err();
        assert_eq!(err.kind_code(), "unsupported");
    }

    #[tokio::test]
    async fn container_create_rejects_malformed_id() {
        use crate::containers::{ProcessSpec, Resources};
        use crate::containers::config::{ImageReference, Platform as ImagePlatform};

        let tmp = tempfile::tempdir().unwrap();
        let platform = test_platform(&tmp);
        platform.boot().await.unwrap();

        let cfg = ContainerConfig {
            id: "_leading-underscore".to_string(),
            image: ImageReference {
                reference: "example/image:latest".to_string(),
                platform: ImagePlatform { os: "linux".to_string(), arch: "amd64".to_string(), variant: None },
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
            networks: Vec::new(),
            dns: None,
            published_ports: Vec::new(),
            published_sockets: Vec::new(),
            runtime_handler: "runc".to_string(),
            labels: std::collections::HashMap::new(),
            auto_remove: false,
        };

        let err = platform.container_create(cfg, &*crate::progress::null_sink()).await.unwrap_err();
        assert_eq!(err.kind_code(), "invalid_argument");
    }
}
