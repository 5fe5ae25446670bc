//! Tracing setup shared by both binaries.
//!
//! The subscriber starts at `info` (or `RUST_LOG`) before the config is
//! read; [`apply_logging_level`] swaps in `logging.level` afterwards.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Installs the global subscriber for `service`. Later calls are no-ops.
pub fn init_tracing(service: &'static str) {
    init_tracing_with_level(service, "info");
}

pub fn init_tracing_with_level(service: &'static str, level: &str) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let (filter_layer, handle) = reload::Layer::new(filter);
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }

    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();
    if installed {
        tracing::info!(service, "Tracing initialized");
    }
}

/// Applies the configured level. `RUST_LOG`, when set, keeps precedence.
pub fn apply_logging_level(level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                tracing::warn!(error = %e, "Failed to apply logging level");
            }
        }
        Err(e) => tracing::warn!(level, error = %e, "Ignoring invalid logging level"),
    }
}
