//! Error taxonomy for the REST layer.
//!
//! Every handler failure is converted to one of these variants and rendered
//! as the standard JSON error shape; nothing escapes as a framework error
//! page. Absent and not-owned resources are deliberately the same variant so
//! responses never leak whether another user's resource exists.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Project not found or access denied")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Project was modified by another session")]
    Conflict,

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(ref source) = self {
            tracing::error!(error = %source, "unhandled internal error");
        }
        let body = json!({
            "success": false,
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => AppError::NotFound,
            StorageError::Conflict => AppError::Conflict,
            other => AppError::Internal(Box::new(other)),
        }
    }
}
