//! Structured progress events (§9 design notes: "the core produces
//! structured events (`task_started`, `items_progress`, `task_finished`);
//! terminal rendering is a consumer. Core code must not depend on a
//! terminal being present.").
//!
//! Long-running operations (container create, bootstrap) accept an
//! `&dyn ProgressSink` and emit events to it; callers that don't care pass
//! [`NullSink`].

use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    TaskStarted { task: String },
    ItemsProgress { task: String, completed: u64, total: Option<u64> },
    TaskFinished { task: String, ok: bool },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event. The default when a caller supplies none.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Convenience: wraps a `tracing`-backed sink so every event is also logged,
/// independent of whatever terminal consumer (if any) is attached.
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::TaskStarted { task } => {
                tracing::debug!(task = %task, "task_started")
            }
            ProgressEvent::ItemsProgress { task, completed, total } => {
                tracing::debug!(task = %task, completed, total = ?total, "items_progress")
            }
            ProgressEvent::TaskFinished { task, ok } => {
                tracing::debug!(task = %task, ok, "task_finished")
            }
        }
    }
}

pub type SharedProgressSink = Arc<dyn ProgressSink>;

pub fn null_sink() -> SharedProgressSink {
    Arc::new(NullSink)
}
