//! Logging setup.
//!
//! Library code logs through the `log` facade; records are bridged into a
//! `tracing` subscriber so they share output with pipeline spans.

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(json: bool) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = Registry::default().with(filter);

        let installed = if json {
            tracing::subscriber::set_global_default(
                registry.with(fmt::layer().json().with_writer(std::io::stderr)),
            )
        } else {
            tracing::subscriber::set_global_default(
                registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)),
            )
        };
        if let Err(e) = installed {
            eprintln!("Failed to install tracing subscriber: {}", e);
            return;
        }

        if let Err(e) = tracing_log::LogTracer::init() {
            eprintln!("Failed to bridge log records: {}", e);
        }
    });
}
