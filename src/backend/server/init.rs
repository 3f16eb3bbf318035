/**
 * Application Composition
 *
 * `App` boots the shared services, collects services, routes, socket events
 * and hooks, and finally serves the router.
 *
 * # Initialization Process
 *
 * 1. Ensure the static client directory exists
 * 2. Connect to the database and run migrations
 * 3. Start the search controller (restore indexes from disk)
 * 4. Load the driver cache
 * 5. Create the socket server, the mailer and the rate limiter
 *
 * # Shutdown
 *
 * On SIGINT or SIGTERM the server drains in-flight requests, runs every
 * hook's `on_shutdown`, saves the search indexes and writes the driver cache.
 */

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::backend::cache::DriverCache;
use crate::backend::error::BackendError;
use crate::backend::hooks::{Hook, Hooks};
use crate::backend::mailer::Mailer;
use crate::backend::middleware::build_limiter;
use crate::backend::routes::create_router;
use crate::backend::search::{self, SearchCtrl};
use crate::backend::server::config::{ensure_client_dir, load_database};
use crate::backend::server::shutdown::{persist, shutdown_signal};
use crate::backend::server::state::AppState;
use crate::backend::services::Service;
use crate::backend::socket::{EventRegistry, SocketMiddleware, SocketServer};
use crate::shared::Settings;

pub struct App {
    state: AppState,
    routes: Router<AppState>,
    events: EventRegistry,
    socket_middlewares: Vec<SocketMiddleware>,
    hooks: Hooks,
}

impl App {
    pub async fn new(settings: Settings) -> Result<Self, BackendError> {
        let settings = Arc::new(settings);
        info!(environment = ?settings.environment, "Initializing CoreDevs server");

        ensure_client_dir(&settings.client_dir).await?;
        let store = load_database(&settings).await?;

        let search = Arc::new(SearchCtrl::new(settings.search_dir(), search::schemas()));
        search.start().await?;

        let drivers = Arc::new(DriverCache::new(settings.cache_dir()));
        drivers.born().await?;

        let mailer = match &settings.smtp {
            Some(smtp) => Some(Mailer::new(smtp)?),
            None => {
                warn!("SMTP not configured. Mail features will be disabled.");
                None
            }
        };

        let rate_limiter = build_limiter(&settings.rate_limit);
        if rate_limiter.is_none() {
            warn!("Rate limiting disabled");
        }

        let state = AppState {
            settings,
            store,
            search,
            socket: SocketServer::new(),
            mailer,
            drivers,
            rate_limiter,
        };

        Ok(Self {
            state,
            routes: Router::new(),
            events: EventRegistry::new(),
            socket_middlewares: Vec::new(),
            hooks: Hooks::new(),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Register a service's schemas, routes and socket events
    pub fn service(mut self, service: impl Service) -> Self {
        for schema in service.schemas() {
            self.state.store.register(schema);
        }

        let router = service.routes(&self.state);
        self.routes = match service.prefix() {
            "" | "/" => self.routes.merge(router),
            prefix => self.routes.nest(prefix, router),
        };

        self.events.merge(service.events());
        self.socket_middlewares.extend(service.socket_middlewares());
        info!(service = service.name(), "=> Service loaded");
        self
    }

    /// Add routes with direct access to the application state
    ///
    /// ```rust,ignore
    /// app.configure(|router, state| {
    ///     let search = state.search.clone();
    ///     router.route("/ping", get(|| async { "pong" }))
    /// })
    /// ```
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(Router<AppState>, &AppState) -> Router<AppState>,
    {
        let routes = std::mem::take(&mut self.routes);
        self.routes = configure(routes, &self.state);
        self
    }

    pub fn socket_middleware(mut self, middleware: SocketMiddleware) -> Self {
        self.socket_middlewares.push(middleware);
        self
    }

    pub fn hook(mut self, hook: impl Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    fn build(self) -> Result<(Router, AppState, Hooks), BackendError> {
        self.state.socket.listen(self.events, self.socket_middlewares);
        let router = create_router(self.state.clone(), self.routes)?;
        Ok((router, self.state, self.hooks))
    }

    /// Finish composition and return the router without serving it
    pub fn router(self) -> Result<Router, BackendError> {
        self.build().map(|(router, _, _)| router)
    }

    /// Serve on `0.0.0.0:<port>` until SIGINT or SIGTERM
    ///
    /// HTTP/1.1 and cleartext HTTP/2 are accepted on the same port.
    pub async fn start(self) -> Result<(), BackendError> {
        let port = self.state.settings.port;
        let (router, state, hooks) = self.build()?;

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        info!("=> Listening on {}", port);

        hooks.start(&state).await;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        hooks.shutdown(&state).await;
        persist(&state).await;
        info!("Server stopped");
        Ok(())
    }
}
