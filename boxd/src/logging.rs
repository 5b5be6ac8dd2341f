//! Structured logging setup.
//!
//! The core reads zero environment variables (§6), so the filter directive
//! that would normally come from `RUST_LOG` is an explicit parameter here;
//! an external collaborator (the CLI, a supervisor unit file) is
//! responsible for plumbing whatever convention it wants through to this
//! call.

use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs a global `tracing` subscriber writing to a non-blocking rolling
/// file appender under `log_dir`, plus an ANSI-formatted stderr layer.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init(log_dir: &Path, filter_directive: &str) {
    if LOG_GUARD.get().is_some() {
        return;
    }

    let _ = std::fs::create_dir_all(log_dir);
    let file_appender = tracing_appender::rolling::daily(log_dir, "boxd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_new(filter_directive)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .finish();

    // Ignore failure: a subscriber may already be installed by the embedding
    // process (e.g. a test harness), which is not an error for us.
    let _ = tracing::subscriber::set_global_default(subscriber);
    let _ = LOG_GUARD.set(guard);
}
