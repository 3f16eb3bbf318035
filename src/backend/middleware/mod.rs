//! Request middleware
//!
//! - **`auth`** - JWT cookie authentication and role checks
//! - **`cookie`** - auth cookie parsing and `Set-Cookie` values
//! - **`payload`** - JSON / urlencoded / multipart body extractor
//! - **`rate_limit`** - global request quota
//!
//! CORS, body size limit and access logging come from `tower_http` layers
//! assembled in `routes::router`.

pub mod auth;
pub mod cookie;
pub mod payload;
pub mod rate_limit;

pub use auth::{auth, check_role, CurrentUser};
pub use payload::{upload_cleanup_middleware, Payload, UploadScope};
pub use rate_limit::{build_limiter, rate_limit_middleware, GlobalRateLimiter};
