//! Validation errors for world model values.

use thiserror::Error;

/// Structural invariant violations detected while building model values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("character key mismatch: {key} != {id}")]
    CharacterKeyMismatch { key: String, id: String },

    #[error("event key mismatch: {key} != {id}")]
    EventKeyMismatch { key: String, id: String },

    #[error("{entity}.{field} must not be empty")]
    EmptyField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity}.{field} out of range: {value}")]
    OutOfRange {
        entity: &'static str,
        field: &'static str,
        value: f64,
    },

    #[error("{entity}.{field} contains duplicate entry: {value}")]
    DuplicateEntry {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Reject an empty string field.
pub(crate) fn require_non_empty(
    value: &str,
    entity: &'static str,
    field: &'static str,
) -> Result<()> {
    if value.is_empty() {
        return Err(ModelError::EmptyField { entity, field });
    }
    Ok(())
}
