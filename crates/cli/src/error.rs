//! Error types for CLI operations.

use contracts::ContractError;
use data_provider::ProviderError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse or validation error
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// Scenario step failed
    #[error("Scenario failed during {stage}: {source}")]
    Scenario {
        stage: &'static str,
        #[source]
        source: ProviderError,
    },

    /// The hero could not be spawned
    #[error("No hero vehicle could be spawned")]
    NoHero,
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn scenario(stage: &'static str) -> impl FnOnce(ProviderError) -> Self {
        move |source| Self::Scenario { stage, source }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
