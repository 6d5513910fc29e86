use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use lectern_db::DbError;
use lectern_types::DomainError;

/// Every handler error ends up here and leaves as `{success: false, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Unexpected error: {0:#}")]
    Unexpected(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found", what))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Unexpected(e) => {
                error!("{:#}", e);
                "Server error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(serde_json::json!({ "success": false, "message": message })),
        )
            .into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::DuplicateReview | DomainError::InvalidTransition { .. } => {
                Self::Conflict(err.to_string())
            }
            DomainError::ReviewNotFound(_) => Self::not_found("Review"),
            DomainError::Validation(msg) => Self::Validation(msg),
        }
    }
}

/// Typed failures travel through the db layer inside `anyhow`; recover them
/// here so they keep their status code.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<DomainError>() {
            return e.clone().into();
        }
        match err.downcast_ref::<DbError>() {
            Some(DbError::NotFound(what)) => Self::not_found(what),
            Some(DbError::Conflict(msg)) => Self::Conflict(msg.clone()),
            None => Self::Unexpected(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}
