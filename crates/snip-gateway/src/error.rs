use crate::model::ErrorResponse;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_core::CoreError;
use snip_service::LinkError;
use thiserror::Error;
use tracing::{debug, error};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    InvalidCode(#[from] CoreError),
    #[error("malformed request body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Link(LinkError::InvalidInput(_)) => (StatusCode::BAD_REQUEST, "invalid_input"),
            AppError::Link(LinkError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Link(LinkError::Expired(_)) => (StatusCode::GONE, "expired"),
            AppError::Link(LinkError::CodeSpaceExhausted { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "code_space_exhausted")
            }
            AppError::Link(LinkError::StorageUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
            }
            AppError::Link(LinkError::CacheUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "cache_unavailable")
            }
            AppError::InvalidCode(_) => (StatusCode::BAD_REQUEST, "invalid_short_code"),
            AppError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        if status.is_server_error() {
            error!(error = %self, kind, "request failed");
        } else {
            debug!(error = %self, kind, "request rejected");
        }

        let body = ErrorResponse {
            error: kind.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
