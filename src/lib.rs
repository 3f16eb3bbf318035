//! CoreDevs - Backend Starter Framework
//!
//! CoreDevs wires together the pieces a REST + WebSocket backend usually needs
//! on top of a document database: an Axum HTTP server, a middleware stack,
//! a WebSocket event layer, a generic document-store CRUD abstraction, a small
//! full-text search index, file uploads, email and process lifecycle hooks.
//!
//! # Module Structure
//!
//! - **`shared`** - Platform-agnostic types
//!   - Settings and configuration errors
//!   - Socket frames
//!   - Shared error types
//!
//! - **`backend`** - Server-side code
//!   - `App` composition, state, graceful shutdown
//!   - Document store (`store`) with the query-translation layer
//!   - Search controller, socket server, mailer, uploads, driver cache
//!   - Sample `user` and `demo` services
//!
//! # Usage
//!
//! ```rust,no_run
//! use coredevs::backend::server::App;
//! use coredevs::backend::services::{DemoService, UserService};
//! use coredevs::shared::Settings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! App::new(settings)
//!     .await?
//!     .service(UserService)
//!     .service(DemoService)
//!     .start()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! All server state lives in `AppState`, which is cheap to clone: the database
//! pool, search indexes, socket sessions and driver cache are shared through
//! `Arc` and `tokio::sync::RwLock`.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
pub mod backend;
