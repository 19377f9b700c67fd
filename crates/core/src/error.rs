use crate::page::PageRef;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("A page with {field} '{value}' already exists")]
    DuplicateField { field: String, value: String },

    #[error("Conflict on '{field}': {message}")]
    Conflict { field: String, message: String },

    /// Another page already holds the homepage flag. Carries the holder so
    /// callers can offer a confirm-and-swap flow.
    #[error("Page '{}' (id {}) is already the homepage", existing.slug, existing.id)]
    HomepageConflict { existing: PageRef },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Transform for root prop '{from}' failed: {message}")]
    Transform { from: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a field-scoped validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The request field this error is scoped to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            CoreError::Validation { field, .. }
            | CoreError::DuplicateField { field, .. }
            | CoreError::Conflict { field, .. } => Some(field),
            CoreError::HomepageConflict { .. } => Some("isHomepage"),
            CoreError::Transform { from, .. } => Some(from),
            _ => None,
        }
    }
}
