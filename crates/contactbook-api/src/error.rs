use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use contactbook_types::api::ErrorResponse;

pub type Result<T, E = ContactError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ContactError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Contact {0} not found")]
    NotFound(i64),

    /// Photo extension outside the accepted set.
    #[error("{0}")]
    InvalidFormat(String),

    /// Request body over the configured limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ContactError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) | Self::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify an extractor or body-read failure by the status axum gives it.
    fn from_request_failure(status: StatusCode, reason: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(reason)
        } else {
            Self::InvalidArgument(reason)
        }
    }
}

impl From<PathRejection> for ContactError {
    fn from(rejection: PathRejection) -> Self {
        Self::from_request_failure(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ContactError {
    fn from(rejection: QueryRejection) -> Self {
        Self::from_request_failure(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ContactError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::from_request_failure(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ContactError {
    fn from(e: MultipartError) -> Self {
        Self::from_request_failure(e.status(), format!("Malformed form data: {}", e.body_text()))
    }
}

impl From<tokio::task::JoinError> for ContactError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e))
    }
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
