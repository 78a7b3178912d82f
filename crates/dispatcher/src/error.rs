//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Store client creation error
    #[error("failed to create store client '{kind}': {message}")]
    StoreCreation { kind: String, message: String },

    /// Dispatch loop no longer accepts input of this kind
    #[error("dispatch loop closed, cannot queue {input} batch")]
    Closed { input: &'static str },

    /// Retry abandoned through the cancellation token
    #[error("'{task}' cancelled before completion")]
    Cancelled { task: String },

    /// Invalid input or store error (from contract)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a store creation error
    pub fn store_creation(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreCreation {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a cancelled error
    pub fn cancelled(task: impl Into<String>) -> Self {
        Self::Cancelled { task: task.into() }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
