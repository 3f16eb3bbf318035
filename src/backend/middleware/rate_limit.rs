/**
 * Rate Limiting
 *
 * One global token bucket: `requests` per `period_secs`, refilled evenly
 * across the window, with bursts up to `requests`.
 */

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use governor::{Quota, RateLimiter};
use serde_json::json;

use crate::shared::RateLimitSettings;

pub type GlobalRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// `None` when disabled or misconfigured
pub fn build_limiter(settings: &RateLimitSettings) -> Option<Arc<GlobalRateLimiter>> {
    if !settings.enabled {
        return None;
    }
    let burst = NonZeroU32::new(settings.requests)?;
    let window = Duration::from_secs(settings.period_secs);
    let quota = Quota::with_period(window / settings.requests)?.allow_burst(burst);
    Some(Arc::new(RateLimiter::direct(quota)))
}

pub async fn rate_limit_middleware(
    State(limiter): State<Option<Arc<GlobalRateLimiter>>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(limiter) = &limiter {
        if limiter.check().is_err() {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Too many requests, please try again later.",
                    "status": 429,
                })),
            )
                .into_response();
        }
    }
    next.run(request).await
}
