/**
 * Login Handler
 *
 * POST /api/auth/login
 *
 * Looks the user up by email (or user name), verifies the bcrypt hash and
 * answers with the token both as the `coredevs` cookie and in the body.
 * Every credential failure is the same 401.
 */

use axum::{extract::State, http::StatusCode, response::Json, response::Response};
use bcrypt::verify;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::backend::auth::handlers::respond_with_token;
use crate::backend::auth::handlers::types::LoginRequest;
use crate::backend::error::BackendError;
use crate::backend::middleware::auth::DEACTIVE;
use crate::backend::server::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, BackendError> {
    info!("Login request for: {}", request.email);
    let users = state.users()?;

    let key = if request.email.contains('@') { "email" } else { "userName" };
    let mut filter = Map::new();
    filter.insert(key.to_string(), Value::String(request.email.clone()));

    let user = users.find_one(filter, None).await?.ok_or_else(|| {
        warn!("User not found: {}", request.email);
        BackendError::unauthorized()
    })?;

    let hash = user.get_str("password").unwrap_or_default();
    let valid = verify(&request.password, hash).unwrap_or_else(|e| {
        error!(user = %user.id, "Password verification error: {:?}", e);
        false
    });
    if !valid {
        warn!("Invalid password for user: {}", request.email);
        return Err(BackendError::unauthorized());
    }
    if user.get_str("status") == Some(DEACTIVE) {
        warn!(user = %user.id, "Deactivated user tried to log in");
        return Err(BackendError::unauthorized());
    }

    info!(user = %user.id, "User logged in");
    respond_with_token(&state, users.schema(), &user, StatusCode::OK)
}
