/**
 * Backend Error Types
 *
 * `BackendError` aggregates the errors of every backend concern so handlers
 * can use `?` throughout and still produce a sensible HTTP status.
 *
 * # Status Mapping
 *
 * - query and validation problems map to 400
 * - unique-field conflicts map to 409
 * - authentication failures map to 401 with the `{status, reason}` body
 * - storage, search persistence, mail and config failures map to 500
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::mailer::MailError;
use crate::backend::search::SearchError;
use crate::backend::store::StoreError;
use crate::backend::upload::UploadError;
use crate::shared::{ConfigError, SharedError};

#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error with an explicit status
    #[error("Handler error: {message}")]
    HandlerError { status: StatusCode, message: String },

    /// Authentication or role check failure
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    SharedError(#[from] SharedError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// 401 used by the `auth` middleware
    pub fn unauthorized() -> Self {
        Self::Unauthorized { reason: "Unauthorized" }
    }

    /// 401 used by role checks
    pub fn forbidden_role() -> Self {
        Self::Unauthorized { reason: "unauthorized" }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(err) => match err {
                StoreError::QueryNotAllowed(_)
                | StoreError::InvalidQuery(_)
                | StoreError::Validation(_) => StatusCode::BAD_REQUEST,
                StoreError::Duplicate { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Search(err) => match err {
                SearchError::UnknownProperty(_)
                | SearchError::DuplicateId(_)
                | SearchError::InvalidDocument(_) => StatusCode::BAD_REQUEST,
                SearchError::UnknownIndex(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Mail(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upload(_) => StatusCode::BAD_REQUEST,
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } | SharedError::FrameError { .. } => {
                    StatusCode::BAD_REQUEST
                }
            },
            Self::SerializationError(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; internal failures are not described in detail
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::Unauthorized { reason } => reason.to_string(),
            Self::Store(StoreError::QueryNotAllowed(_)) => "Query validation issue".to_string(),
            Self::Store(StoreError::Validation(SharedError::ValidationError { message, .. })) => {
                message.clone()
            }
            other if other.status_code().is_server_error() => "Something went wrong".to_string(),
            other => other.to_string(),
        }
    }
}
