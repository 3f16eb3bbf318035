/**
 * Signup Handler
 *
 * POST /api/auth/signup
 *
 * 1. Validate email format and password length
 * 2. Hash the password with bcrypt
 * 3. Create the user from the posted profile with the configured default role
 * 4. Mirror the user into the `users` search index
 * 5. Set the auth cookie and return `{token, user}`
 */

use axum::{extract::State, http::StatusCode, response::Json, response::Response};
use serde_json::Value;
use tracing::{info, warn};

use crate::backend::auth::handlers::respond_with_token;
use crate::backend::auth::handlers::types::SignupRequest;
use crate::backend::auth::hash_password;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::backend::services::user::{search_document, USERS};

const MIN_PASSWORD_LEN: usize = 8;

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Response, BackendError> {
    info!("Signup request for: {}", request.email);

    if !request.email.contains('@') {
        warn!("Invalid email format: {}", request.email);
        return Err(BackendError::bad_request("Invalid email format"));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        warn!("Password too short");
        return Err(BackendError::bad_request("Password must be at least 8 characters"));
    }

    let password_hash = hash_password(&request.password, state.settings.environment)?;

    let mut body = request.profile;
    body.insert("email".into(), Value::String(request.email));
    body.insert("password".into(), Value::String(password_hash));
    body.insert("role".into(), Value::String(state.settings.default_role.clone()));

    let users = state.users()?;
    let user = users.create(body, None).await?;

    if let Err(e) = state.search.insert(USERS, search_document(&user)).await {
        warn!(user = %user.id, "Failed to index new user: {}", e);
    }

    info!(user = %user.id, "User signed up");
    respond_with_token(&state, users.schema(), &user, StatusCode::CREATED)
}
