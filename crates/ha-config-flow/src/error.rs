//! Config flow errors

use ha_config_entries::ConfigEntriesError;
use thiserror::Error;

use crate::schema::SchemaError;

/// Errors surfaced by the flow manager and individual flows
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Invalid handler specified: {0}")]
    UnknownHandler(String),

    #[error("Invalid flow specified: {0}")]
    UnknownFlow(String),

    #[error("Handler {handler} has no step {step_id} in its current state")]
    UnknownStep { handler: String, step_id: String },

    #[error("User input malformed: {0}")]
    InvalidInput(#[from] SchemaError),

    #[error("Failed to persist config entry: {0}")]
    Persist(#[from] ConfigEntriesError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    pub fn unknown_step(handler: impl Into<String>, step_id: impl Into<String>) -> Self {
        FlowError::UnknownStep {
            handler: handler.into(),
            step_id: step_id.into(),
        }
    }
}
