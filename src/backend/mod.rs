//! Backend Module
//!
//! All server-side code: the Axum application, its middleware, the
//! document store, search, sockets, mail and the sample services.
//!
//! # Architecture
//!
//! - **`server`** - `App` composition, `AppState`, boot and shutdown
//! - **`routes`** - router assembly, health and auth routes
//! - **`middleware`** - auth, role checks, rate limit, body extraction
//! - **`auth`** - JWT sessions, password hashing, auth handlers
//! - **`store`** - document collections over SQLite with query translation
//! - **`search`** - persisted BM25 search indexes
//! - **`socket`** - WebSocket sessions and event dispatch
//! - **`mailer`** - SMTP mail
//! - **`upload`** - image uploads
//! - **`cache`** - on-disk driver cache
//! - **`hooks`** - start and shutdown callbacks
//! - **`services`** - sample `user` and `demo` services
//! - **`utils`** - small helpers
//! - **`error`** - `BackendError` and its HTTP mapping
//!
//! # Request Flow
//!
//! ```text
//! request -> trace -> cors -> body limit -> rate limit -> [auth -> role] -> handler -> Collection -> SQLite
//! ```
//!
//! WebSocket clients connect to `/socket`; frames are `{"event", "data"}`
//! objects dispatched by event name.

/// Server setup and composition
pub mod server;

/// Route configuration
pub mod routes;

/// Middleware for request processing
pub mod middleware;

/// Authentication
pub mod auth;

/// Document store
pub mod store;

/// Full-text search
pub mod search;

/// WebSocket layer
pub mod socket;

/// Outgoing mail
pub mod mailer;

/// Image uploads
pub mod upload;

/// Driver cache
pub mod cache;

/// Lifecycle hooks
pub mod hooks;

/// Sample services
pub mod services;

/// Helpers
pub mod utils;

/// Backend error types
pub mod error;

pub use error::{BackendError, BackendResult};
pub use server::{App, AppState};
