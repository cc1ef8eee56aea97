use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced across the HTTP boundary, per spec.md §7's error
/// taxonomy: validation and not-found propagate to the caller as a 4xx
/// class with a machine-readable `code`; everything else collapses to 500.
/// Unlike `acteon-server::error::ServerError`, this implements
/// `IntoResponse` directly, since SPEC_FULL.md's ambient surface has no
/// separate error-mapping middleware layer.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    State(#[from] legator_state::StateError),

    #[error(transparent)]
    Engine(#[from] legator_rules::EngineError),

    #[error(transparent)]
    Routing(#[from] legator_routing::RoutingError),

    #[error(transparent)]
    Notify(#[from] legator_notifier::NotifyError),

    #[error(transparent)]
    Tracker(#[from] legator_tracker::TrackerError),

    #[error("request timed out waiting for a result")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ServerError {
    fn code_and_status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::State(legator_state::StateError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            Self::State(legator_state::StateError::Backend(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "backend_error")
            }
            Self::Tracker(legator_tracker::TrackerError::UnknownRequest(_)) => {
                (StatusCode::NOT_FOUND, "unknown_request")
            }
            Self::Timeout => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Self::Notify(legator_notifier::NotifyError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            Self::Engine(_) | Self::Routing(_) | Self::Notify(_) | Self::Io(_) | Self::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.code_and_status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(error = %message, code, "request failed");
        } else {
            tracing::warn!(error = %message, code, "request rejected");
        }
        (status, Json(ErrorBody { code, message })).into_response()
    }
}
