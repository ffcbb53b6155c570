pub mod config;
pub mod error;

pub use config::{
    Config, FailurePolicy, RemoteConfig, RetrySettings, SearchConfig, SearchMode, SyncConfig,
    ToggleOrdering, ValidationResult,
};
pub use error::{AppError, ConfigError, NetworkError, PatternError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging for the task list client
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("Tasklist core initialized");
    Ok(())
}
