//! HTTP API handlers.

pub mod envision;
pub mod health;
pub mod scenarios;
pub mod simulate;

use axum::http::StatusCode;
use envision_core::EnvisionError;

/// Map an engine error to a status code: bad input is the caller's fault.
pub(crate) fn error_response(error: EnvisionError) -> (StatusCode, String) {
    let status = if error.is_configuration() || matches!(error, EnvisionError::Serialization(_)) {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, error.to_string())
}
