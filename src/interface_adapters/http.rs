// Shared HTTP response types for consistent API error payloads.

use crate::domain::SimError;
use axum::{Json, http::StatusCode};
use tracing::debug;

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
    // Stable error kind, same as the WebSocket `error.kind`.
    pub kind: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn status_for(err: &SimError) -> StatusCode {
    match err {
        SimError::DuplicateEntity { .. } => StatusCode::CONFLICT,
        SimError::NotFound { .. }
        | SimError::UnknownBody { .. }
        | SimError::UnknownTemplate { .. } => StatusCode::NOT_FOUND,
        SimError::InvalidParameter { .. } | SimError::UnknownCommand { .. } => {
            StatusCode::BAD_REQUEST
        }
        SimError::EngineFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SimError::SessionClosed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn error_response(err: SimError) -> ApiError {
    let status = status_for(&err);
    debug!(kind = err.kind(), status = status.as_u16(), error = %err, "request rejected");
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EngineError;

    #[test]
    fn when_errors_are_mapped_then_statuses_follow_their_kind() {
        let cases = [
            (SimError::DuplicateEntity { id: "a".into() }, 409),
            (SimError::NotFound { id: "a".into() }, 404),
            (SimError::UnknownTemplate { name: "x".into() }, 404),
            (SimError::UnknownBody { id: "a".into() }, 404),
            (SimError::invalid("mass", "must be >= 0"), 400),
            (
                SimError::EngineFailure(EngineError::Diverged { handle: 1 }),
                500,
            ),
            (SimError::SessionClosed, 503),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err).as_u16(), status, "{err}");
        }
    }
}
