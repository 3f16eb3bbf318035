//! Server Module
//!
//! - **`state`** - `AppState` and its `FromRef` implementations
//! - **`config`** - boot dependencies (client dir, database)
//! - **`init`** - `App` composition and serving
//! - **`shutdown`** - signal handling and persistence on exit
//!
//! # Example
//!
//! ```rust,no_run
//! use coredevs::backend::server::App;
//! use coredevs::backend::services::UserService;
//! use coredevs::shared::Settings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = App::new(Settings::load()?).await?.service(UserService);
//! let router = app.router()?;
//! # Ok(())
//! # }
//! ```

/// Application state management
pub mod state;

/// Boot dependencies
pub mod config;

/// Server initialization
pub mod init;

/// Graceful shutdown
pub mod shutdown;

pub use init::App;
pub use state::AppState;
