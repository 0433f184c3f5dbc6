//! Shared configuration, error categories and logging setup for SunAlert.

pub mod config;
pub mod error;

pub use config::{Config, ConfigIssue, MirrorConfig, StorageConfig, UvConfig, ValidationResult};
pub use error::{DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt};

use anyhow::Result;

/// Install the tracing subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!("Logging initialized");
    Ok(())
}
