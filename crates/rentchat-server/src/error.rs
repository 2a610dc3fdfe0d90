use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rentchat_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage is down; the client should retry with backoff.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => ServerError::BadRequest(msg),
            StoreError::ThreadNotFound(id) => ServerError::NotFound(format!("thread {id}")),
            e if e.is_transient() => ServerError::Unavailable(e.to_string()),
            e => ServerError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Unavailable(detail) => {
                tracing::warn!(error = %detail, "store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Store temporarily unavailable, try again".to_string(),
                )
            }
            ServerError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_status() {
        let cases = [
            (StoreError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (StoreError::ThreadNotFound("t".into()), StatusCode::NOT_FOUND),
            (StoreError::Unavailable("closed".into()), StatusCode::SERVICE_UNAVAILABLE),
            (StoreError::Migration("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                StoreError::Json(serde_json::from_str::<u32>("x").unwrap_err()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let resp = ServerError::from(err).into_response();
            assert_eq!(resp.status(), status);
        }
    }
}
