use std::borrow::Cow;

use clima::validation::ValidationErrors;

use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use serde::{Deserialize, Serialize};

// Title of a validation problem.
pub(crate) const VALIDATION_TITLE: &str = "One or more validation errors occurred.";

/// Error codes carried by an [`ErrorResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The device secret is missing or not authorized.
    Unauthorized,
}

impl ErrorCode {
    const fn status(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

/// A response describing why a request was refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A human-readable description.
    pub error: Cow<'static, str>,
    /// A stable error code.
    pub code: ErrorCode,
}

impl ErrorResponse {
    /// Creates an [`ErrorResponse`] for an unauthorized device.
    #[must_use]
    pub const fn unauthorized() -> Self {
        Self {
            error: Cow::Borrowed("Unauthorized"),
            code: ErrorCode::Unauthorized,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// A response listing validation failures by field.
///
/// ```json
/// {
///     "title": "One or more validation errors occurred.",
///     "status": 400,
///     "errors": { "FirmwareVersion": ["..."] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationProblem {
    /// Problem summary.
    pub title: Cow<'static, str>,
    /// `HTTP` status code.
    pub status: u16,
    /// Failures grouped by field name.
    pub errors: ValidationErrors,
}

impl ValidationProblem {
    /// Creates a [`ValidationProblem`].
    #[must_use]
    pub fn new(errors: ValidationErrors) -> Self {
        Self {
            title: Cow::Borrowed(VALIDATION_TITLE),
            status: StatusCode::BAD_REQUEST.as_u16(),
            errors,
        }
    }
}

impl IntoResponse for ValidationProblem {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}
