/**
 * Current User and Logout Handlers
 *
 * GET /api/auth/me (behind `auth`) returns the signed-in user.
 * POST /api/auth/logout expires the auth cookie.
 */

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::backend::error::BackendError;
use crate::backend::middleware::cookie::clear_auth_cookie;
use crate::backend::middleware::CurrentUser;
use crate::backend::server::state::AppState;

pub async fn get_me(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Value>, BackendError> {
    let users = state.users()?;
    Ok(Json(users.schema().present(&user)))
}

pub async fn logout() -> Response {
    ([(SET_COOKIE, clear_auth_cookie())], Json(json!({ "message": "Logged out" }))).into_response()
}
