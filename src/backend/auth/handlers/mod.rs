//! Authentication Handlers
//!
//! - **`signup`** - POST /api/auth/signup
//! - **`login`** - POST /api/auth/login
//! - **`logout`** - POST /api/auth/logout
//! - **`get_me`** - GET /api/auth/me

pub mod login;
pub mod me;
pub mod signup;
pub mod types;

use axum::{
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::error;

pub use login::login;
pub use me::{get_me, logout};
pub use signup::signup;

use crate::backend::auth::sessions::create_token;
use crate::backend::error::BackendError;
use crate::backend::middleware::cookie::auth_cookie;
use crate::backend::server::state::AppState;
use crate::backend::store::{Document, Schema};
use types::AuthResponse;

/// Issue a token for `user`, set it as the auth cookie and echo it in the body
pub(crate) fn respond_with_token(
    state: &AppState,
    schema: &Schema,
    user: &Document,
    status: StatusCode,
) -> Result<Response, BackendError> {
    let email = user.get_str("email").unwrap_or_default();
    let token = create_token(&state.settings.secret, &user.id, email).map_err(|e| {
        error!("Failed to create token: {:?}", e);
        BackendError::internal("Server error")
    })?;
    let cookie = auth_cookie(&token, state.settings.environment);
    let body = AuthResponse {
        token,
        user: schema.present(user),
    };
    Ok((status, [(SET_COOKIE, cookie)], Json(body)).into_response())
}
