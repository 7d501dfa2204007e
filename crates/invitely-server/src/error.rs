//! Error handling for the API server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use invitely::InvitelyError;
use invitely_deploy::{ArchiveError, DeployError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request passed parsing but is not acceptable. The message is shown
    /// to the client as is.
    #[error("{0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Theme not found")]
    ThemeNotFound,

    #[error("Build failed: {0}")]
    Build(InvitelyError),

    #[error("Packaging failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Deploy failed: {0}")]
    Deploy(#[from] DeployError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InvitelyError> for ApiError {
    fn from(error: InvitelyError) -> Self {
        if error.is_theme_not_found() {
            ApiError::ThemeNotFound
        } else {
            ApiError::Build(error)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::ThemeNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Build(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.user_message()),
            ApiError::Archive(_) | ApiError::Deploy(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ApiError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
            ),
            ApiError::Internal(_) | ApiError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

// Convenience functions for common errors
impl ApiError {
    pub fn validation(msg: &str) -> Self {
        Self::Validation(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invitely::ThemeError;
    use invitely_deploy::HostingError;

    #[test]
    fn unknown_theme_maps_to_not_found() {
        let err: ApiError = InvitelyError::from(ThemeError::NotFound {
            name: "x".into(),
        })
        .into();
        assert!(matches!(err, ApiError::ThemeNotFound));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_is_a_bad_request() {
        let response = ApiError::validation("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn deploy_failures_are_server_errors() {
        let err = ApiError::from(DeployError::Upload {
            site_id: "s".into(),
            source: HostingError::Transport("reset".into()),
        });
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
