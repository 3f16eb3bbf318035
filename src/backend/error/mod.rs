//! Backend Error Module
//!
//! - **`types`** - `BackendError` and its status mapping
//! - **`conversion`** - `IntoResponse` for JSON error bodies

pub mod conversion;
pub mod types;

pub use conversion::error_response;
pub use types::BackendError;

pub type BackendResult<T> = Result<T, BackendError>;
