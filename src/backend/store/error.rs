/**
 * Store Errors
 */

use thiserror::Error;

use crate::shared::SharedError;

/// Errors raised by the document store and its query translation
#[derive(Debug, Error)]
pub enum StoreError {
    /// A client query key that the caller did not allow-list
    #[error("Query validation issue: `{0}` is not an allowed query key")]
    QueryNotAllowed(String),

    /// A malformed query value (bad operator, page, limit or sort)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A write violating a unique field
    #[error("Duplicate key: a document with this `{field}` already exists")]
    Duplicate { field: String },

    /// A collection name with no registered schema
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Schema validation failure
    #[error(transparent)]
    Validation(#[from] SharedError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Corrupt document: {0}")]
    Serialization(#[from] serde_json::Error),
}
