use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Database(_) | AppError::Email(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Converts AppError into the JSON error envelope.
///
/// Infrastructure failures are logged here and replaced by a generic
/// message so driver details never reach clients.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(msg) | AppError::Email(msg) | AppError::Internal(msg) => {
                tracing::error!(code = self.code(), "request failed: {msg}");
                "Internal server error".to_string()
            }
            AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg)
            | AppError::Auth(msg)
            | AppError::Unavailable(msg)
            | AppError::Timeout(msg) => msg.clone(),
            AppError::Validation(_) => self.to_string(),
        };

        let mut body = serde_json::json!({
            "success": false,
            "error": message,
            "code": self.code(),
        });

        match &self {
            AppError::Validation(details) => {
                body["details"] = serde_json::json!(details);
            }
            // Listing callers expect a data array even when the read timed out.
            AppError::Timeout(_) => {
                body["data"] = serde_json::json!([]);
            }
            _ => {}
        }

        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
