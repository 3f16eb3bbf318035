/**
 * Router Configuration
 *
 * Combines every route group into the application router and wraps it in
 * the middleware stack.
 *
 * # Route Order
 *
 * 1. Health routes (`/health`, `/info`)
 * 2. API routes (`/api/auth/...`, `/socket`)
 * 3. Service and `configure` routes
 * 4. Static client files as fallback
 *
 * # Layers (outermost first)
 *
 * 1. `TraceLayer` access log
 * 2. CORS for the configured origin, credentials allowed
 * 3. Body size limit
 * 4. Global rate limit
 * 5. Removal of the request's uploaded files
 */

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::backend::error::BackendError;
use crate::backend::middleware::{rate_limit_middleware, upload_cleanup_middleware};
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::routes::health::configure_health_routes;
use crate::backend::server::state::AppState;

/// CORS for `origin`; `*` mirrors the request origin since credentials are allowed
pub fn cors_layer(origin: &str) -> Result<CorsLayer, BackendError> {
    let allow_origin = if origin == "*" {
        AllowOrigin::mirror_request()
    } else {
        let value = HeaderValue::from_str(origin.trim_end_matches('/'))
            .map_err(|_| BackendError::internal(format!("Invalid CORS origin: {}", origin)))?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]))
}

/// Create the application router
///
/// `extra` carries the routes mounted by services and `App::configure`.
pub fn create_router(app_state: AppState, extra: Router<AppState>) -> Result<Router, BackendError> {
    let settings = app_state.settings.clone();

    let router = configure_health_routes(Router::new());
    let router = configure_api_routes(router, &app_state);
    let router = router.merge(extra);

    // Static client
    let router = router.fallback_service(ServeDir::new(&settings.client_dir));

    let router = router
        .layer(middleware::from_fn(upload_cleanup_middleware))
        .layer(middleware::from_fn_with_state(
            app_state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(settings.body_limit))
        .layer(RequestBodyLimitLayer::new(settings.body_limit))
        .layer(cors_layer(&settings.origin)?)
        .layer(TraceLayer::new_for_http());

    Ok(router.with_state(app_state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_origins() {
        assert!(cors_layer("http://localhost:3000").is_ok());
        assert!(cors_layer("*").is_ok());
        assert!(cors_layer("bad\norigin").is_err());
    }
}
