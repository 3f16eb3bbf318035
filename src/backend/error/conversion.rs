/**
 * Error Conversion
 *
 * Errors render as JSON:
 *
 * ```json
 * { "error": "Error message", "status": 400 }
 * ```
 *
 * Authentication failures keep the shape clients check for:
 *
 * ```json
 * { "status": 401, "reason": "Unauthorized" }
 * ```
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::backend::error::types::BackendError;

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!(status = status.as_u16(), "{}", self);
        }

        let body = match &self {
            BackendError::Unauthorized { reason } => json!({
                "status": status.as_u16(),
                "reason": reason,
            }),
            other => json!({
                "error": other.message(),
                "status": status.as_u16(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Convenience for handlers that only need a status and message
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    BackendError::handler(status, message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_body() {
        let response = error_response(StatusCode::NOT_FOUND, "User not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body, json!({"error": "User not found", "status": 404}));
    }

    #[tokio::test]
    async fn test_unauthorized_body() {
        let response = BackendError::unauthorized().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body, json!({"status": 401, "reason": "Unauthorized"}));
    }
}
