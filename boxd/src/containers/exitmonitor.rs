//! §4.H Exit monitor: one background wait per tracked container id.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub struct ExitMonitor {
    waits: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Default for ExitMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExitMonitor {
    pub fn new() -> Self {
        Self { waits: Mutex::new(HashMap::new()) }
    }

    /// Starts `wait_fn` in the background; on completion, invokes
    /// `on_exit` with the returned exit code. Replaces any wait already
    /// tracked for `id` (at most one wait per id is active).
    pub async fn track<F, Fut, C>(&self, id: impl Into<String>, wait_fn: F, on_exit: C)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = i32> + Send + 'static,
        C: FnOnce(String, i32) + Send + 'static,
    {
        let id = id.into();
        let key = id.clone();
        let handle = tokio::spawn(async move {
            let exit_code = wait_fn().await;
            on_exit(id, exit_code);
        });

        let mut waits = self.waits.lock().await;
        if let Some(old) = waits.insert(key, handle) {
            old.abort();
        }
    }

    pub async fn stop_tracking(&self, id: &str) {
        if let Some(handle) = self.waits.lock().await.remove(id) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn track_invokes_callback_with_exit_code() {
        let monitor = Arc::new(ExitMonitor::new());
        let observed = Arc::new(AtomicI32::new(-1));
        let observed_clone = observed.clone();

        monitor
            .track("c1", || async { 7 }, move |_id, code| {
                observed_clone.store(code, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(observed.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn stop_tracking_cancels_outstanding_wait() {
        let monitor = Arc::new(ExitMonitor::new());
        let observed = Arc::new(AtomicI32::new(-1));
        let observed_clone = observed.clone();

        monitor
            .track(
                "c1",
                || async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    1
                },
                move |_id, code| {
                    observed_clone.store(code, Ordering::SeqCst);
                },
            )
            .await;

        monitor.stop_tracking("c1").await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(observed.load(Ordering::SeqCst), -1);
    }

    #[tokio::test]
    async fn second_track_replaces_first_for_same_id() {
        let monitor = Arc::new(ExitMonitor::new());
        let observed = Arc::new(AtomicI32::new(-1));

        let o1 = observed.clone();
        monitor
            .track(
                "c1",
                || async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    1
                },
                move |_id, code| o1.store(code, Ordering::SeqCst),
            )
            .await;

        let o2 = observed.clone();
        monitor.track("c1", || async { 9 }, move |_id, code| o2.store(code, Ordering::SeqCst)).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(observed.load(Ordering::SeqCst), 9);
    }
}
