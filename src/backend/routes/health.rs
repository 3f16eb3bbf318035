//! Health checker
//!
//! - `GET /health` - `{"status":"UP"}`
//! - `GET /info` - build name and version

use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::backend::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Info {
    pub build: BuildInfo,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

pub async fn info() -> Json<Info> {
    Json(Info {
        build: BuildInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    })
}

pub fn configure_health_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/health", get(health)).route("/info", get(info))
}
