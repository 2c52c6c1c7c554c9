//! Data provider error types

use contracts::{ActorId, ContractError};
use thiserror::Error;

/// Data provider specific error
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Identity already present in a registry
    #[error("actor {actor_id} already registered in {registry}, cannot register twice")]
    DuplicateRegistration {
        actor_id: ActorId,
        registry: &'static str,
    },

    /// Operation needs a world binding that was never made (or was cleaned up)
    #[error("world not bound: {operation} requires set_world first")]
    UnboundWorld { operation: &'static str },

    /// Simulator rejected every spawn attempt
    #[error("failed to spawn '{model}': {message}")]
    SpawnFailure { model: String, message: String },

    /// Neither the requested pattern nor the fallback matched a blueprint
    #[error("no blueprint matches '{pattern}'")]
    BlueprintNotFound { pattern: String },

    /// Frame counter did not reach the expected value in time
    #[error(
        "frame barrier timed out after {waited_ms}ms: expected frame {expected}, last seen {last_seen}"
    )]
    FrameBarrierTimeout {
        expected: u64,
        last_seen: u64,
        waited_ms: u64,
    },

    /// Frame counter moved past the expected value
    #[error("frame barrier overshoot: expected frame {expected}, simulator reports {actual}")]
    FrameMismatch { expected: u64, actual: u64 },

    /// Collaborator-side failure
    #[error("simulator error: {message}")]
    Simulator { message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ProviderError {
    /// Create spawn failure error
    pub fn spawn_failure(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SpawnFailure {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Create simulator error
    pub fn simulator(message: impl Into<String>) -> Self {
        Self::Simulator {
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ProviderError>;
