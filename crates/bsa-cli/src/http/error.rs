use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bsa_api::BsaError;
use bsa_auth::Rejection;
use serde_json::json;

/// Every error a handler can return, rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Details were logged; the client only sees a generic message.
    #[error("Server error")]
    Server,
}

impl From<BsaError> for ApiError {
    fn from(err: BsaError) -> Self {
        match err {
            BsaError::Validation(msg) => Self::BadRequest(msg),
            BsaError::Auth(msg) => Self::Unauthorized(msg),
            BsaError::NotFound(msg) => Self::NotFound(msg),
            BsaError::Conflict(msg) => Self::Conflict(msg),
            BsaError::Connection(_) | BsaError::Internal(_) => {
                tracing::error!(error = %err, "request failed");
                Self::Server
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        Self::BadRequest("Invalid request body".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Rejected(r) => match r {
                Rejection::Unauthenticated => StatusCode::UNAUTHORIZED,
                Rejection::Forbidden => StatusCode::FORBIDDEN,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Server => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
