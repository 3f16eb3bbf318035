/**
 * Authentication Middleware
 *
 * Protects routes that require a signed-in user. The JWT comes from the
 * `coredevs` cookie (or, in development, an `Authorization: Bearer` header),
 * the user document is loaded and attached to the request as `CurrentUser`.
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::backend::auth::decode_auth_token;
use crate::backend::error::BackendError;
use crate::backend::middleware::cookie::auth_token;
use crate::backend::server::state::AppState;
use crate::backend::store::Document;

/// Status value that locks an account out
pub const DEACTIVE: &str = "deactive";

/// Signed-in user, available to handlers behind `auth`
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Document);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn role(&self) -> Option<&str> {
        self.0.get_str("role")
    }
}

pub async fn auth(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, BackendError> {
    let token = auth_token(request.headers(), state.settings.environment).ok_or_else(|| {
        warn!(path = %request.uri().path(), "Missing auth token");
        BackendError::unauthorized()
    })?;

    let user = decode_auth_token(&state.store, &state.settings.secret, &token)
        .await
        .ok_or_else(BackendError::unauthorized)?;

    if user.get_str("status") == Some(DEACTIVE) {
        warn!(user = %user.id, "Deactivated user rejected");
        return Err(BackendError::unauthorized());
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Role gate to stack after `auth`
///
/// ```rust,ignore
/// .route_layer(middleware::from_fn(|req, next| check_role(&["admin"], req, next)))
/// ```
pub async fn check_role(allowed: &'static [&'static str], request: Request, next: Next) -> Result<Response, BackendError> {
    let permitted = request
        .extensions()
        .get::<CurrentUser>()
        .and_then(CurrentUser::role)
        .map(|role| allowed.contains(&role))
        .unwrap_or(false);
    if !permitted {
        warn!(path = %request.uri().path(), "Role not allowed");
        return Err(BackendError::forbidden_role());
    }
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            warn!("CurrentUser not found in request extensions");
            BackendError::unauthorized()
        })
    }
}
