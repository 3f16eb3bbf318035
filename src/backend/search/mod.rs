//! Full-text search
//!
//! `SearchCtrl` keeps a tantivy index per search key on disk so documents
//! survive restarts.

pub mod controller;
pub mod index;

use thiserror::Error;

pub use controller::SearchCtrl;
pub use index::{Hit, SearchIndex, SearchParams, SearchResults, SearchSchema};

/// Indexes known to the application
pub fn schemas() -> Vec<SearchSchema> {
    vec![SearchSchema::new(
        "users",
        ["firstName", "lastName", "email", "userName"],
    )]
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Unknown search index: {0}")]
    UnknownIndex(String),

    #[error("Unknown search property: {0}")]
    UnknownProperty(String),

    #[error("Document with id {0} already indexed")]
    DuplicateId(String),

    #[error("Invalid search document: {0}")]
    InvalidDocument(String),

    #[error("Search index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("Search persistence failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Search encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}
