/**
 * Application State
 *
 * `AppState` is the single state type behind every router. It is cheap to
 * clone: each field is a shared handle.
 *
 * # State Extraction
 *
 * The `FromRef` implementations let handlers and middleware extract just the
 * part they need, e.g. `State(socket): State<SocketServer>`.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::cache::DriverCache;
use crate::backend::error::BackendError;
use crate::backend::mailer::Mailer;
use crate::backend::middleware::GlobalRateLimiter;
use crate::backend::search::SearchCtrl;
use crate::backend::services::user::USERS;
use crate::backend::socket::SocketServer;
use crate::backend::store::{Collection, Store};
use crate::shared::Settings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,

    /// Document store with the registered collection schemas
    pub store: Store,

    /// Full-text indexes, persisted on shutdown
    pub search: Arc<SearchCtrl>,

    pub socket: SocketServer,

    /// `None` when no SMTP relay is configured
    pub mailer: Option<Mailer>,

    pub drivers: Arc<DriverCache>,

    /// `None` when rate limiting is disabled
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    /// The `users` collection
    pub fn users(&self) -> Result<Collection, BackendError> {
        Ok(self.store.collection(USERS)?)
    }
}

impl FromRef<AppState> for Arc<Settings> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.settings.clone()
    }
}

impl FromRef<AppState> for Store {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Arc<SearchCtrl> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.search.clone()
    }
}

impl FromRef<AppState> for SocketServer {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.socket.clone()
    }
}

impl FromRef<AppState> for Option<Arc<GlobalRateLimiter>> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.rate_limiter.clone()
    }
}
