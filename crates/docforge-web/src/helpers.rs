//! Helper types for route handlers.
//!
//! Conversion errors from the core become a JSON body with a stable code
//! and an HTTP status chosen from the error's kind.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docforge_core::{Error, ErrorClass};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, ApiError>;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    detail: String,
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }
}

/// HTTP status for a conversion error.
pub const fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Decoding(_)
        | Error::EmptyMerge
        | Error::ImageTooLarge { .. }
        | Error::Conversion(_) => StatusCode::BAD_REQUEST,
        Error::ConversionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        Error::ToolMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Rendering(_)
        | Error::IoWrite { .. }
        | Error::IoRead { .. }
        | Error::IoReadFailure { .. }
        | Error::ConfigLoad(_)
        | Error::ConfigInvalid { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err.class() {
            ErrorClass::ClientInput => warn!("Rejected request: {}", err),
            ErrorClass::Server | ErrorClass::Environment => error!("Request failed: {}", err),
        }

        Self {
            status: status_for(&err),
            code: err.code(),
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code.to_string(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}
