//! Error types shared by the handover crates

use thiserror::Error;

/// Result alias used across the handover crates
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Backing store failed (connection, query, decode)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored or configured handover criteria could not be used
    #[error("Invalid handover criteria ({field}): {message}")]
    InvalidCriteria { field: String, message: String },

    /// Conditional lead update lost against a concurrent writer
    #[error("Lead {lead_id} was modified concurrently (expected version {expected})")]
    VersionConflict { lead_id: String, expected: u64 },

    /// A single notification could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn lead_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            entity: "Lead",
            id: id.into(),
        }
    }

    pub fn invalid_criteria(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidCriteria {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for errors where re-reading the record and retrying can succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::VersionConflict { .. })
    }
}
