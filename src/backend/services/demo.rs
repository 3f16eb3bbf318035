//! Demo service
//!
//! A minimal service showing a route-level middleware and a form upload.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::{self, Next},
    response::{Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tracing::info;

use crate::backend::error::BackendError;
use crate::backend::middleware::Payload;
use crate::backend::server::state::AppState;
use crate::backend::services::Service;
use crate::backend::upload::image_up;

pub const DEMO_HEADER: &str = "x-coredevs-demo";

pub struct DemoService;

impl Service for DemoService {
    fn name(&self) -> &str {
        "demo"
    }

    fn routes(&self, _state: &AppState) -> Router<AppState> {
        Router::new().route(
            "/demo",
            get(demo_get)
                .route_layer(middleware::from_fn(demo_middleware))
                .post(demo_post),
        )
    }
}

/// Tags responses so clients can see the middleware ran
pub async fn demo_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(DEMO_HEADER, HeaderValue::from_static("passed"));
    response
}

pub async fn demo_get() -> Json<Value> {
    Json(json!({ "message": "Demo service is up" }))
}

/// POST /demo: echoes the payload, storing `image` when one was uploaded
pub async fn demo_post(
    State(state): State<AppState>,
    Payload(mut body): Payload,
) -> Result<Json<Value>, BackendError> {
    let link = body.get("image").and_then(Value::as_str).map(str::to_string);
    let settings = &state.settings;
    if let Some(image) = image_up(&settings.uploads_dir(), &settings.images_dir(), link.as_deref()).await? {
        info!(image = %image, "Demo image saved");
        body.insert("image".to_string(), Value::String(image));
    }
    Ok(Json(Value::Object(body)))
}
