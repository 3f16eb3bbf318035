//! Route Configuration Module
//!
//! - **`router`** - router assembly and the layer stack
//! - **`api_routes`** - authentication endpoints and the socket upgrade
//! - **`health`** - `/health` and `/info`
//!
//! Service routes are mounted by `App::service`; see `backend::services`.

/// Main router creation
pub mod router;

/// API endpoint handlers
pub mod api_routes;

/// Health checker
pub mod health;

pub use router::{cors_layer, create_router};
