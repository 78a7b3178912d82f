//! Layered error definitions
//!
//! Categorized by source: config / input / store

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

    // ===== Input Errors =====
    /// Series command without timestamp
    #[error("series command for entity '{entity}' has no timestamp")]
    MissingTimestamp { entity: String },

    // ===== Store Errors =====
    /// Store write error
    #[error("store {operation} failed: {message}")]
    StoreWrite { operation: String, message: String },

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

    /// Create missing timestamp error
    pub fn missing_timestamp(entity: impl Into<String>) -> Self {
        Self::MissingTimestamp {
            entity: entity.into(),
        }
    }

    /// Create store write error
    pub fn store_write(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreWrite {
            operation: operation.into(),
            message: message.into(),
        }
    }
}
