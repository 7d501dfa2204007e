//! Error types for the invitely library
//!
//! Errors are organized by pipeline stage. Asset embedding failures are not
//! represented here: the embedder recovers from them per field and never
//! surfaces them to the caller.

use thiserror::Error;

/// Main error type for the invitely library
///
/// Every variant is terminal for the publish request that produced it and is
/// raised before any remote side effect is attempted.
#[derive(Error, Debug)]
pub enum InvitelyError {
    /// Theme lookup failures
    #[error("Theme error: {0}")]
    Theme(#[from] ThemeError),

    /// Markup and client bundle production
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Final document assembly and minification
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Configuration payload (de)serialization
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

/// Theme registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThemeError {
    #[error("Theme not found: {name}")]
    NotFound { name: String },
}

/// Errors raised while producing markup or the client bundle
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Theme template failed to render: {reason}")]
    Markup { reason: String },

    #[error("Client bundle build failed with {error_count} error(s): {message}")]
    BundleBuildFailed { error_count: usize, message: String },
}

/// Errors raised while assembling the final HTML document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Stylesheet minification failed: {reason}")]
    CssMinify { reason: String },

    #[error("HTML minification failed: {reason}")]
    HtmlMinify { reason: String },
}

/// Configuration payload errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("JSON serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Shorthand result type for invitely operations
pub type Result<T> = std::result::Result<T, InvitelyError>;

impl From<serde_json::Error> for InvitelyError {
    fn from(error: serde_json::Error) -> Self {
        InvitelyError::Data(DataError::Serialization {
            reason: error.to_string(),
        })
    }
}

impl From<askama::Error> for InvitelyError {
    fn from(error: askama::Error) -> Self {
        InvitelyError::Render(RenderError::Markup {
            reason: error.to_string(),
        })
    }
}

impl InvitelyError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            InvitelyError::Theme(ThemeError::NotFound { .. }) => "Theme not found".to_string(),
            InvitelyError::Render(RenderError::BundleBuildFailed { .. }) => {
                "Failed to build the interactive bundle".to_string()
            }
            InvitelyError::Render(e) => format!("Render error: {}", e),
            InvitelyError::Document(e) => format!("Failed to assemble document: {}", e),
            InvitelyError::Data(e) => format!("Data error: {}", e),
        }
    }

    /// Whether this error comes from an unknown theme identifier
    pub fn is_theme_not_found(&self) -> bool {
        matches!(self, InvitelyError::Theme(ThemeError::NotFound { .. }))
    }
}
