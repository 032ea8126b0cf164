use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not authorized to access this resource")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Food database error: {0}")]
    Upstream(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Database error: {0}")]
    Database(sqlx::Error),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a BTreeMap<String, String>>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::Duplicate(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) | AppError::InvalidCredentials | AppError::Jwt(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::Duplicate(_) => "duplicate",
            AppError::Unauthorized(_) | AppError::InvalidCredentials | AppError::Jwt(_) => {
                "unauthorized"
            }
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Upstream(_) => "upstream_error",
            AppError::ServiceUnavailable(_) => "service_unavailable",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    /// A validation error on a single field.
    pub fn field(field: &str, msg: impl Into<String>) -> Self {
        AppError::Validation(BTreeMap::from([(field.to_string(), msg.into())]))
    }
}

impl From<JsonRejection> for AppError {
    fn from(r: JsonRejection) -> Self {
        let field = match &r {
            JsonRejection::MissingJsonContentType(_) => "content_type",
            _ => "body",
        };
        debug!(error = %r.body_text(), "rejected json body");
        AppError::field(field, r.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(r: QueryRejection) -> Self {
        debug!(error = %r.body_text(), "rejected query string");
        AppError::field("query", r.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(r: PathRejection) -> Self {
        AppError::field("path", r.body_text())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource"),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                let msg = match db.constraint() {
                    Some("users_email_key") => "Email already registered".to_string(),
                    Some(c) => format!("Duplicate value violates {c}"),
                    None => "Duplicate value".to_string(),
                };
                AppError::Duplicate(msg)
            }
            other => AppError::Database(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                AppError::Database(e) => error!(error = %e, "database error"),
                AppError::Internal(e) => error!(error = ?e, "internal error"),
                other => error!(error = %other, "server error"),
            }
        }

        // Server errors never leak their source to the client.
        let message = match &self {
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let fields = match &self {
            AppError::Validation(f) => Some(f),
            _ => None,
        };
        let body = ErrorBody {
            error: self.code(),
            message,
            fields,
        };
        (status, Json(body)).into_response()
    }
}

/// Collects per-field validation messages; the first message for a field wins.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, msg: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| msg.into());
    }

    pub fn check(&mut self, ok: bool, field: &str, msg: &str) {
        if !ok {
            self.add(field, msg);
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<f64>) {
        if let Some(v) = value {
            self.check(v.is_finite() && v >= 0.0, field, "must be a non-negative number");
        }
    }

    pub fn finish(self) -> AppResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0))
        }
    }
}
