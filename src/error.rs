use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::ErrorCode;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Everything except the guard outcomes is reported as a 400.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message for the `{"error": ...}` body.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg) => msg.clone(),
            AppError::Database(e) => store_message(e),
            AppError::Pool(_) => "Could not reach the database".to_string(),
            AppError::Password(_) | AppError::Token(_) | AppError::Internal(_) => {
                "Something went wrong".to_string()
            }
            AppError::Io(_) => "Could not store the uploaded file".to_string(),
        }
    }
}

/// Best-effort readable text for a store failure. Unique violations name the
/// offending field ("Email already exists").
fn store_message(err: &rusqlite::Error) -> String {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) if e.code == ErrorCode::ConstraintViolation => {
            if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
                let field = columns
                    .split(',')
                    .next()
                    .and_then(|c| c.trim().rsplit('.').next())
                    .unwrap_or("Field");
                return format!("{} already exists", capitalize(field));
            }
            if msg.starts_with("FOREIGN KEY constraint failed") {
                return "Referenced document does not exist".to_string();
            }
            msg.clone()
        }
        rusqlite::Error::QueryReturnedNoRows => "Document not found".to_string(),
        other => other.to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {}", e),
            AppError::Pool(e) => tracing::error!("Pool error: {}", e),
            AppError::Password(e) => tracing::error!("Password hashing error: {}", e),
            AppError::Token(e) => tracing::error!("Token error: {}", e),
            AppError::Io(e) => tracing::error!("I/O error: {}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            _ => {}
        }

        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
