//! # API Errors
//!
//! The last step of the error chain: every failure leaves a handler as an
//! [`ApiError`], which renders the status code and the error envelope.
//!
//! ```text
//! ValidationError ─► CoreError ─► DbError ─► ApiError ─► HTTP
//!
//! ┌──────────────────────────────────┬────────┬──────────────────────┐
//! │ Source                           │ Status │ code                 │
//! ├──────────────────────────────────┼────────┼──────────────────────┤
//! │ ValidationError, bad JSON/query  │ 400    │ VALIDATION_ERROR     │
//! │ *NotFound                        │ 404    │ NOT_FOUND            │
//! │ InsufficientStock                │ 409    │ INSUFFICIENT_STOCK   │
//! │ UNIQUE/FK, already cancelled, in │ 409    │ CONFLICT             │
//! │ use                              │        │                      │
//! │ bad credentials, token           │ 401    │ UNAUTHORIZED         │
//! │ role too low                     │ 403    │ FORBIDDEN            │
//! │ anything else from storage       │ 500    │ DATABASE_ERROR       │
//! └──────────────────────────────────┴────────┴──────────────────────┘
//! ```
//!
//! Storage details are logged, never returned.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kasir_core::{CoreError, ValidationError};
use kasir_db::DbError;
use serde::Serialize;
use tracing::error;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("{0}")]
    Conflict(String),

    /// Bad credentials, inactive account, missing or invalid token.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// Storage failure; the message is logged, not sent.
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InsufficientStock(_) | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Database(_) => "A database error occurred".to_string(),
            ApiError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(detail) | ApiError::Internal(detail) = &self {
            error!(code = self.code(), error = %detail, "Request failed");
        }

        let body = ErrorBody {
            success: false,
            code: self.code(),
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => v.into(),
            CoreError::ProductNotFound(_)
            | CoreError::CategoryNotFound(_)
            | CoreError::TransactionNotFound(_)
            | CoreError::UserNotFound(_) => ApiError::NotFound(err.to_string()),
            CoreError::InsufficientStock { .. } => ApiError::InsufficientStock(err.to_string()),
            CoreError::AlreadyCancelled { .. }
            | CoreError::CategoryInUse { .. }
            | CoreError::UserHasTransactions { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ApiError::Conflict(err.to_string())
            }
            DbError::CheckViolation { .. } => ApiError::Validation(err.to_string()),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_mapping() {
        let err: ApiError = DbError::Domain(CoreError::InsufficientStock {
            product: "Avo Coffee".to_string(),
            available: 1,
            requested: 3,
        })
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
        assert!(err.to_string().contains("Avo Coffee"));

        let err: ApiError = DbError::Domain(CoreError::AlreadyCancelled {
            code: "TRX-20261016-0001".to_string(),
        })
        .into();
        assert_eq!(err.code(), "CONFLICT");

        let err: ApiError = DbError::from(ValidationError::required("items")).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_errors_are_opaque() {
        let err: ApiError = DbError::QueryFailed("disk I/O error at page 7".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert!(!err.public_message().contains("page 7"));
    }

    #[test]
    fn test_duplicate_is_conflict() {
        let err: ApiError = DbError::duplicate("email", "admin@kasir.com").into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "CONFLICT");
    }
}
