//! User service
//!
//! - `GET /user?message=` emits `message` to every socket session
//! - `/users` CRUD behind `auth`; update and delete need an admin role
//! - `GET /users/search?term=` queries the `users` search index
//! - socket event `user` answers the caller with its username

pub mod handlers;
pub mod schema;

use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{delete, get},
    Router,
};
use serde_json::json;

use crate::backend::middleware::{auth, check_role};
use crate::backend::server::state::AppState;
use crate::backend::services::Service;
use crate::backend::socket::EventRegistry;
use crate::backend::store::Schema;

pub use schema::{search_document, user_schema, ADMIN_ROLES, ROLES, USERS};

pub struct UserService;

impl Service for UserService {
    fn name(&self) -> &str {
        "user"
    }

    fn schemas(&self) -> Vec<Schema> {
        vec![user_schema()]
    }

    fn routes(&self, state: &AppState) -> Router<AppState> {
        let admin_only = middleware::from_fn(|req: Request, next: Next| check_role(ADMIN_ROLES, req, next));

        let users = Router::new()
            .route("/users", get(handlers::list_users))
            .route("/users/search", get(handlers::search_users))
            .route(
                "/users/{id}",
                get(handlers::get_user).merge(
                    delete(handlers::delete_user)
                        .patch(handlers::update_user)
                        .put(handlers::update_user)
                        .layer(admin_only),
                ),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), auth));

        Router::new()
            .route("/user", get(handlers::hello))
            .merge(users)
    }

    fn events(&self) -> EventRegistry {
        EventRegistry::new().on("user", |ctx| async move {
            ctx.session.emit("user", json!({ "username": "CoreDevs" }));
        })
    }
}
