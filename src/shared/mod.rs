//! Shared Module
//!
//! Types that do not depend on the server runtime: settings, socket frames and
//! the shared error type. Everything here is plain data and serializes with
//! serde.

/// Socket frame types
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use event::SocketFrame;
pub use error::SharedError;
pub use config::{
    ConfigError, Environment, RateLimitSettings, Settings, SettingsBuilder, SmtpSettings,
};
