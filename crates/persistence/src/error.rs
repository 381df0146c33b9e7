//! Persistence error types

use scylla::transport::errors::{NewSessionError, QueryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Connection error: {0}")]
    Connection(#[from] NewSessionError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict on {id}: expected {expected}")]
    VersionConflict { id: String, expected: u64 },
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::InvalidData(err.to_string())
    }
}

impl From<PersistenceError> for handover_core::Error {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(id) => handover_core::Error::NotFound {
                entity: "Record",
                id,
            },
            PersistenceError::VersionConflict { id, expected } => {
                handover_core::Error::VersionConflict {
                    lead_id: id,
                    expected,
                }
            },
            other => handover_core::Error::Storage(other.to_string()),
        }
    }
}
