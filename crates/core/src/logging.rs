//! Logging bootstrap for embeddings of the engine.
//!
//! The engine itself only emits `tracing` events; whether they go anywhere
//! is the embedding's call. Hosts that have no subscriber of their own call
//! [`init_logging`] once at attach time.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a tracing subscriber writing daily-rolled files named after
/// `component` under the shadeload log directory, optionally mirrored to
/// stderr. `RUST_LOG` overrides the default filter. The returned guard must
/// outlive the embedding or buffered lines are lost.
pub fn init_logging(component: &str, to_stderr: bool) -> WorkerGuard {
    let log_dir = log_directory();
    let _ = std::fs::create_dir_all(&log_dir);

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, component));

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shadeload=info"));
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);
    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if to_stderr {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_ansi(true))
            .init();
    } else {
        registry.init();
    }

    guard
}

/// `SHADELOAD_LOG_DIR` when set, `~/.shadeload/logs` otherwise. A build-tool
/// embedding must be steerable away from `HOME` when that is read-only.
fn log_directory() -> PathBuf {
    if let Ok(dir) = std::env::var("SHADELOAD_LOG_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".shadeload/logs")
}
