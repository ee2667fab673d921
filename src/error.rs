use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BusinessRule(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Bson(#[from] bson::ser::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::BusinessRule(_) => StatusCode::BAD_REQUEST,
            AppError::Database(e) => {
                error!("store failure: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Bson(e) => {
                error!("serialization failure: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Internal detail stays in the logs.
        let message = match &self {
            AppError::Database(_) | AppError::Bson(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
