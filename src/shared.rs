use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::game::repository::GameRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub game_repository: Arc<dyn GameRepository>,
}

impl AppState {
    pub fn new(game_repository: Arc<dyn GameRepository>) -> Self {
        Self { game_repository }
    }
}

/// A single field-level validation failure, surfaced in 400 bodies
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Flattens `validator` derive output into the field-level error list
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(|e| {
                        let message = e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{field} is invalid"));
                        FieldError::new(field.to_string(), message)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        AppError::Validation(fields)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                let body = Json(json!({
                    "success": false,
                    "message": "Validation failed",
                    "errors": errors,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            AppError::NotFound(message) => {
                let body = Json(json!({
                    "success": false,
                    "message": message,
                }));
                (StatusCode::NOT_FOUND, body).into_response()
            }
            AppError::DatabaseError(detail) => {
                // Storage details are logged, never exposed to clients
                warn!(error = %detail, "Storage failure");
                let body = Json(json!({
                    "success": false,
                    "message": "Internal server error",
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
            AppError::Internal => {
                let body = Json(json!({
                    "success": false,
                    "message": "Internal server error",
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// Fallback handler for unknown routes
pub async fn route_not_found(uri: axum::http::Uri) -> Response {
    let body = Json(json!({
        "success": false,
        "message": format!("Route {} not found", uri.path()),
    }));
    (StatusCode::NOT_FOUND, body).into_response()
}
