//! HTTP error payloads and mapping from crate errors.
use crate::error::SheetTablesError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use serde::Serialize;
use std::fmt::Display;

/// Error envelope returned by every endpoint: `{ "error": message }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// Logs `cause` and hides it behind the fixed `message` of the endpoint.
    pub fn internal(message: &str, cause: impl Display) -> Self {
        tracing::error!(error = %cause, "{}", message);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_owned(),
        }
    }

    /// Maps a crate error; anything that is not a caller mistake becomes
    /// `fallback` with status 500.
    pub fn from_error(error: SheetTablesError, fallback: &str) -> Self {
        match error {
            SheetTablesError::ValidationError(message) => Self::bad_request(message),
            SheetTablesError::NotFoundError(message) => Self::not_found(message),
            other => Self::internal(fallback, other),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(ErrorBody { error: &self.message })
    }
}

/// Convenience alias for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;
