//! §4.G Service supervisor adapter: the abstraction the core consumes to
//! launch and tear down helper processes (network plugins, sandbox
//! helpers), grounded in the teacher's `VmmController`/`VmmHandler` split
//! (`vmm/controller/{mod,handler}.rs`) — spawn vs. runtime-management as
//! separate traits, here collapsed into a single register/deregister pair
//! since the core only needs label-scoped lifecycle, not an ongoing metrics
//! handle.
//!
//! Concrete supervisors (launchd, systemd) are out of scope (§4.G); only
//! the trait and a process-spawning default implementation live here.

use async_trait::async_trait;
use boxd_shared::errors::{CoreError, CoreResult};
use boxd_shared::Transport;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Mutex;

/// How long `deregister` waits after `SIGTERM` before escalating to
/// `SIGKILL` (§4.G).
const DEREGISTER_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Deterministically derives the supervisor label for a helper instance
/// from `{domain, plugin_name, instance_id}` (§4.G).
pub fn derive_label(domain: &str, plugin_name: &str, instance_id: &str) -> String {
    format!("{domain}.{plugin_name}.{instance_id}")
}

#[async_trait]
pub trait ServiceSupervisor: Send + Sync {
    /// Launches `binary` with `args` under a label derived from
    /// `{domain, plugin_name, instance_id}`; returns the transport the
    /// caller should use to reach the helper. `state_root` is the
    /// instance's persistent directory, passed through for supervisor
    /// adapters (launchd/systemd unit state, working directory) that need
    /// it; `ProcessSupervisor` doesn't use it.
    async fn register(
        &self,
        binary: &str,
        state_root: &Path,
        args: &[String],
        domain: &str,
        plugin_name: &str,
        instance_id: &str,
    ) -> CoreResult<(String, Transport)>;

    /// Terminates the helper and forgets the label. Idempotent: calling
    /// with an unknown label is not an error.
    async fn deregister(&self, full_label: &str) -> CoreResult<()>;
}

/// Default supervisor: spawns helper binaries as direct child processes of
/// the core, tracked in-process. A stand-in for the launchd/systemd
/// integrations named but left unimplemented by §4.G.
pub struct ProcessSupervisor {
    children: Mutex<HashMap<String, Child>>,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self { children: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl ServiceSupervisor for ProcessSupervisor {
    async fn register(
        &self,
        binary: &str,
        _state_root: &Path,
        args: &[String],
        domain: &str,
        plugin_name: &str,
        instance_id: &str,
    ) -> CoreResult<(String, Transport)> {
        let label = derive_label(domain, plugin_name, instance_id);
        let socket_path = std::env::temp_dir().join(format!("{label}.sock"));

        let child = tokio::process::Command::new(binary)
            .args(args)
            .arg("--socket")
            .arg(&socket_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CoreError::Internal(format!("failed to spawn helper '{binary}': {e}")))?;

        self.children.lock().await.insert(label.clone(), child);
        Ok((label, Transport::unix(socket_path)))
    }

    /// `SIGTERM`, then, after a grace period, `SIGKILL` (§4.G).
    async fn deregister(&self, full_label: &str) -> CoreResult<()> {
        let child = self.children.lock().await.remove(full_label);
        let Some(mut child) = child else {
            return Ok(());
        };

        let Some(pid) = child.id() else {
            if let Err(e) = child.start_kill() {
                tracing::warn!(label = %full_label, error = %e, "failed to signal helper during deregister");
            }
            return Ok(());
        };

        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }
        tokio::time::sleep(DEREGISTER_GRACE_PERIOD).await;

        if crate::util::process::is_process_alive(pid) && !crate::util::process::kill_process(pid) {
            tracing::warn!(label = %full_label, pid, "failed to force-kill helper after grace period");
        }
        let _ = child.wait().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_label_joins_domain_plugin_instance() {
        assert_eq!(derive_label("com.example", "bridge", "net-1"), "com.example.bridge.net-1");
    }

    #[tokio::test]
    async fn deregister_unknown_label_is_not_an_error() {
        let sup = ProcessSupervisor::new();
        assert!(sup.deregister("never-registered").await.is_ok());
    }
}
