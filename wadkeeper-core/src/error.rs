use thiserror::Error;

/// Errors reported by a [`crate::MetadataStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A record failed validation before being written
    #[error("Invalid {entity}: {reason}")]
    Invalid {
        entity: &'static str,
        reason: String,
    },

    /// The storage backend failed
    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            entity,
            reason: reason.into(),
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
