use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::users::UserError;

pub type AppResult<T> = Result<T, AppError>;

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

/// Every failure a handler or guard can produce.
///
/// `Operational` errors are expected outcomes (bad input, rejected credentials)
/// and their message is shown to the client as is. `Unexpected` errors are
/// logged and answered with a generic 500.
#[derive(thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Operational { status: StatusCode, message: String },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Operational {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Operational { status, .. } => *status,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::Invalid(v) => AppError::bad_request(v.to_string()),
            UserError::DuplicateEmail => {
                AppError::new(StatusCode::CONFLICT, "Email already registered")
            }
            UserError::Unexpected(e) => AppError::Unexpected(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(
            status = %rejection.status(),
            error = %rejection.body_text(),
            "request body rejected"
        );
        AppError::bad_request(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Operational { message, .. } => message,
            AppError::Unexpected(e) => {
                error!(error = ?e, "unexpected error");
                "Something went very wrong!".to_string()
            }
        };
        let label = if status.is_client_error() { "fail" } else { "error" };
        (
            status,
            Json(ErrorBody {
                status: label,
                message,
            }),
        )
            .into_response()
    }
}
