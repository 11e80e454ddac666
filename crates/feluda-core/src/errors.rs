//! Cross-cutting error types for Feluda.
//!
//! This module defines errors that can originate from any crate in the system.
//! Domain-specific errors (e.g., `GeometryError`, `EnvError`) are defined in
//! their respective crates. The umbrella `EngineError` lives in
//! `feluda-engine` where the estimation errors converge.

use thiserror::Error;

/// Errors that can be raised by any Feluda crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (schema, format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Random ID generation failed.
    #[error("ID generation failed: {0}")]
    IdGeneration(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`].
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}
