/**
 * API Routes
 *
 * ## Authentication
 * - `POST /api/auth/signup` - User registration
 * - `POST /api/auth/login` - User login
 * - `POST /api/auth/logout` - Clear the auth cookie
 * - `GET /api/auth/me` - Current user (requires authentication)
 *
 * ## Realtime
 * - `GET /socket` - WebSocket upgrade
 */

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::backend::auth::{get_me, login, logout, signup};
use crate::backend::middleware::auth;
use crate::backend::server::state::AppState;
use crate::backend::socket::socket_handler;

pub fn configure_api_routes(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(get_me))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    let auth_routes = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected);

    router
        .nest("/api/auth", auth_routes)
        .route("/socket", get(socket_handler))
}
