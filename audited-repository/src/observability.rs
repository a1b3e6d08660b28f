//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Install a JSON subscriber filtered by `service.log_level`
///
/// An unparsable level falls back to `info`. `RUST_LOG` style directives such
/// as `audited_repository=debug` are accepted.
///
/// # Errors
///
/// Returns [`Error::Internal`] when a global subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter =
        EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize tracing: {}", e)))?;

    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        "Tracing initialized"
    );

    Ok(())
}

/// Shutdown hook for applications that called [`init_tracing`]
///
/// Call it once as the process stops, after the last repository call. The
/// JSON subscriber writes synchronously, so there is nothing to flush and
/// this only records the final shutdown event.
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}
