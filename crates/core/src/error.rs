use crate::types::ProjectId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: ProjectId },

    /// A pipeline step was requested before the artifact it builds on exists
    /// (outline, manuscript, or an original image to refine).
    #[error("Cannot {action}: {artifact} not found")]
    Prerequisite {
        action: &'static str,
        artifact: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::Prerequisite`].
    pub fn prerequisite(action: &'static str, artifact: impl Into<String>) -> Self {
        Self::Prerequisite {
            action,
            artifact: artifact.into(),
        }
    }
}
