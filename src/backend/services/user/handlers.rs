/**
 * User Handlers
 */

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::backend::auth::hash_password;
use crate::backend::error::BackendError;
use crate::backend::middleware::{CurrentUser, Payload};
use crate::backend::search::{SearchParams, SearchResults};
use crate::backend::server::state::AppState;
use crate::backend::services::user::{search_document, USERS};
use crate::backend::store::FindQuery;

/// Client query keys accepted by `GET /users`
const LIST_QUERY: [&str; 9] = [
    "id", "role", "status", "online", "gender", "search", "sortBy", "page", "limit",
];

#[derive(Debug, Deserialize)]
pub struct HelloQuery {
    pub message: Option<String>,
}

/// GET /user
pub async fn hello(State(state): State<AppState>, Query(query): Query<HelloQuery>) -> Json<Value> {
    let message = query.message.map(Value::String).unwrap_or(Value::Null);
    state.socket.emit("message", message);
    Json(json!({ "message": "Hello!" }))
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, BackendError> {
    let users = state.users()?;
    let mut query: Map<String, Value> = params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    let paginate = !matches!(query.remove("paginate"), Some(Value::String(v)) if v == "false");

    let result = users
        .find(FindQuery::new().allow(LIST_QUERY).query(query).paginate(paginate))
        .await?;
    Ok(Json(result.present(users.schema())))
}

/// GET /users/{id}
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, BackendError> {
    let users = state.users()?;
    let user = users
        .find_one(id_filter(id), None)
        .await?
        .ok_or_else(|| BackendError::not_found("User not found"))?;
    Ok(Json(users.schema().present(&user)))
}

/// PATCH /users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    current: CurrentUser,
    Payload(mut body): Payload,
) -> Result<Json<Value>, BackendError> {
    let users = state.users()?;
    body.remove("id");
    if let Some(Value::String(password)) = body.get("password") {
        let hashed = hash_password(password, state.settings.environment)?;
        body.insert("password".to_string(), Value::String(hashed));
    }

    let user = users
        .update(id_filter(id), body, None)
        .await?
        .ok_or_else(|| BackendError::not_found("User not found"))?;

    state.search.remove(USERS, &user.id).await;
    if let Err(e) = state.search.insert(USERS, search_document(&user)).await {
        warn!(user = %user.id, "Failed to reindex user: {}", e);
    }

    info!(user = %user.id, by = %current.id(), "User updated");
    Ok(Json(users.schema().present(&user)))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    current: CurrentUser,
) -> Result<Json<Value>, BackendError> {
    let users = state.users()?;
    let user = users
        .remove(id_filter(id))
        .await?
        .ok_or_else(|| BackendError::not_found("User not found"))?;
    state.search.remove(USERS, &user.id).await;

    info!(user = %user.id, by = %current.id(), "User deleted");
    Ok(Json(users.schema().present(&user)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub term: String,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// GET /users/search
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, BackendError> {
    let params = SearchParams {
        term: query.term,
        properties: None,
        limit: query.limit,
        offset: query.offset,
    };
    Ok(Json(state.search.search(USERS, params).await?))
}

fn id_filter(id: String) -> Map<String, Value> {
    let mut filter = Map::new();
    filter.insert("id".to_string(), Value::String(id));
    filter
}
