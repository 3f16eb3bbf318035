/**
 * Request Payload Extractor
 *
 * `Payload` accepts the three body encodings browsers and API clients send
 * and always yields a JSON object:
 *
 * - `application/json` (must be an object)
 * - `application/x-www-form-urlencoded`
 * - `multipart/form-data`; file parts are written to the uploads directory
 *   and replaced by their stored path
 *
 * Requests without a recognised content type produce an empty object.
 * Repeated keys collect into an array.
 *
 * Uploaded files only live for the request: `upload_cleanup_middleware`
 * deletes whatever the extractor wrote once the response is ready, so
 * handlers must copy what they keep.
 */

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    middleware::Next,
    response::Response,
    Form, Json,
};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(pub Map<String, Value>);

impl Payload {
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// Files written by `Payload` during one request
#[derive(Debug, Clone, Default)]
pub struct UploadScope(Arc<Mutex<Vec<PathBuf>>>);

impl UploadScope {
    fn record(&self, path: PathBuf) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(path);
    }

    fn take(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Remove the request's uploaded files after the handler ran
pub async fn upload_cleanup_middleware(mut request: Request, next: Next) -> Response {
    let scope = UploadScope::default();
    request.extensions_mut().insert(scope.clone());

    let response = next.run(request).await;

    for path in scope.take() {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Removed upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), "Failed to remove upload: {}", e),
        }
    }
    response
}

fn push(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

impl FromRequest<AppState> for Payload {
    type Rejection = BackendError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| BackendError::bad_request(e.body_text()))?;
            return match value {
                Value::Object(map) => Ok(Payload(map)),
                _ => Err(BackendError::bad_request("Request body must be a JSON object")),
            };
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| BackendError::bad_request(e.body_text()))?;
            let mut map = Map::new();
            for (key, value) in pairs {
                push(&mut map, key, Value::String(value));
            }
            return Ok(Payload(map));
        }

        if content_type.starts_with("multipart/form-data") {
            let scope = req.extensions().get::<UploadScope>().cloned();
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| BackendError::bad_request(e.body_text()))?;
            return read_multipart(multipart, &state.settings.uploads_dir(), scope.as_ref())
                .await
                .map(Payload);
        }

        Ok(Payload::default())
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    uploads_dir: &Path,
    scope: Option<&UploadScope>,
) -> Result<Map<String, Value>, BackendError> {
    let mut map = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BackendError::bad_request(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let text = field
                .text()
                .await
                .map_err(|e| BackendError::bad_request(e.body_text()))?;
            push(&mut map, name, Value::String(text));
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| BackendError::bad_request(e.body_text()))?;
        if bytes.is_empty() && file_name.is_empty() {
            continue;
        }
        let stored = store_upload(uploads_dir, &file_name, &bytes).await?;
        debug!(field = %name, file = %file_name, stored = %stored.display(), "Stored upload");
        if let Some(scope) = scope {
            scope.record(stored.clone());
        }
        push(&mut map, name, Value::String(stored.to_string_lossy().into_owned()));
    }
    Ok(map)
}

/// Write an uploaded file under a random name, keeping a sane extension
async fn store_upload(uploads_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, BackendError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let target = uploads_dir.join(format!("{}{}", uuid::Uuid::new_v4().simple(), ext));

    tokio::fs::create_dir_all(uploads_dir).await.map_err(|e| {
        error!("Failed to create uploads dir: {}", e);
        BackendError::from(e)
    })?;
    tokio::fs::write(&target, bytes).await?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_collects_repeated_keys() {
        let mut map = Map::new();
        push(&mut map, "tag".into(), json!("a"));
        push(&mut map, "tag".into(), json!("b"));
        push(&mut map, "tag".into(), json!("c"));
        push(&mut map, "name".into(), json!("x"));
        assert_eq!(Value::Object(map), json!({"tag": ["a", "b", "c"], "name": "x"}));
    }

    #[tokio::test]
    async fn test_store_upload_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store_upload(dir.path(), "photo.jpg", b"data").await.unwrap();
        assert_eq!(stored.extension().unwrap(), "jpg");
        assert_eq!(std::fs::read(&stored).unwrap(), b"data");

        let stored = store_upload(dir.path(), "weird.j/pg", b"x").await.unwrap();
        assert!(!stored.to_string_lossy().contains("j/pg"));
        assert_eq!(stored.parent().unwrap(), dir.path());
    }
}
