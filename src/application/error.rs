use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{domain::error::DomainError, infra::error::InfraError};

use super::scheduler::RenderError;
use super::transport::TransportError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<TransportError> for AppError {
    fn from(error: TransportError) -> Self {
        Self::Render(RenderError::Transport(error))
    }
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(_) => StatusCode::BAD_REQUEST,
            AppError::Render(RenderError::Transport(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Render(RenderError::Encode(_))
            | AppError::Infra(_)
            | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(_) => "Request could not be processed",
            AppError::Render(RenderError::Transport(_)) => "Output stream unavailable",
            AppError::Render(RenderError::Encode(_)) => "Page could not be rendered",
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), self.presentation_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_errors_map_to_bad_request() {
        let error = AppError::from(DomainError::invalid_argument("pagelet.id", "empty"));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn configuration_errors_are_reported_as_misconfiguration() {
        let error = AppError::from(InfraError::configuration("server.port: must be positive"));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.presentation_message(), "Service misconfigured");
        assert!(error.to_string().contains("server.port"));
    }

    #[test]
    fn transport_errors_surface_as_render_failures() {
        let error = AppError::from(TransportError::Closed);
        assert!(matches!(
            error,
            AppError::Render(RenderError::Transport(TransportError::Closed))
        ));
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
