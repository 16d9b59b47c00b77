use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Failure taxonomy for the service.  `Parse` failures inside the streaming
/// decode loop are logged and skipped rather than surfaced; everywhere else
/// these map straight onto HTTP statuses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Network/HTTP failure reaching an external collaborator.  Not retried.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed frame, payload, or request parameter.
    #[error("parse error: {0}")]
    Parse(String),

    /// A record or field that fails validation (un-coercible date, past
    /// callback date).  Excluded or rejected, never fatal to a computation.
    #[error("data error: {0}")]
    Data(String),

    /// An invalid state-transition request, e.g. toggling a record that is
    /// neither pending nor urgent.  Callers may swallow this as a no-op.
    #[error("operation rejected: {0}")]
    OperationRejected(&'static str),

    #[error("not found: {0}")]
    NotFound(&'static str),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            AppError::Parse(_) => StatusCode::BAD_REQUEST,
            AppError::Data(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::OperationRejected(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        error!(error=%self, "request failed");
        (status, self.to_string()).into_response()
    }
}
