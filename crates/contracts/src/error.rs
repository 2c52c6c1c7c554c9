//! Layered error definitions
//!
//! Categorized by source: config / blueprint / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Blueprint Errors =====
    /// Attribute does not exist on the blueprint
    #[error("blueprint '{blueprint}' has no attribute '{attribute}'")]
    AttributeNotFound { blueprint: String, attribute: String },

    /// Attribute exists but is read-only
    #[error("attribute '{attribute}' of blueprint '{blueprint}' is not modifiable")]
    AttributeNotModifiable { blueprint: String, attribute: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create missing-attribute error
    pub fn attribute_not_found(blueprint: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            blueprint: blueprint.into(),
            attribute: attribute.into(),
        }
    }
}
