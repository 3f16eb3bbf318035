//! Services
//!
//! A service bundles the collection schemas it owns, its HTTP routes and its
//! socket events. `App::service` registers the schemas, mounts the router
//! under `prefix()` and hands the events to the socket server.

pub mod demo;
pub mod user;

use axum::Router;

use crate::backend::server::state::AppState;
use crate::backend::socket::{EventRegistry, SocketMiddleware};
use crate::backend::store::Schema;

pub use demo::DemoService;
pub use user::UserService;

pub trait Service: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Mount point; `/` merges the routes at the root
    fn prefix(&self) -> &str {
        "/"
    }

    fn schemas(&self) -> Vec<Schema> {
        Vec::new()
    }

    fn routes(&self, state: &AppState) -> Router<AppState>;

    fn events(&self) -> EventRegistry {
        EventRegistry::new()
    }

    fn socket_middlewares(&self) -> Vec<SocketMiddleware> {
        Vec::new()
    }
}
