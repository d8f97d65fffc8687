//! Log output setup.
//!
//! Logs always go to stderr: stdout carries the RPC protocol.

use tracing_subscriber::EnvFilter;

use crate::types::settings::LoggingSettings;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` overrides the configured level. Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init(settings: &LoggingSettings) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if settings.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}
