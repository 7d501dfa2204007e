//! Error types for archive building and deployment

use std::time::Duration;

use thiserror::Error;

/// Failures while packaging a site archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive build failed: {0}")]
    BuildFailed(String),
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(error: zip::result::ZipError) -> Self {
        ArchiveError::BuildFailed(error.to_string())
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(error: std::io::Error) -> Self {
        ArchiveError::BuildFailed(error.to_string())
    }
}

/// Failures reported by a hosting provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostingError {
    #[error("Site already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for HostingError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            HostingError::Decode(error.to_string())
        } else {
            HostingError::Transport(error.to_string())
        }
    }
}

/// Deployment errors, by stage
#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Could not resolve destination {name}: {source}")]
    Resolve {
        name: String,
        #[source]
        source: HostingError,
    },

    #[error("Upload to {site_id} failed: {source}")]
    Upload {
        site_id: String,
        #[source]
        source: HostingError,
    },

    #[error("Redirect table update failed: {0}")]
    Redirects(#[source] HostingError),
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeployError>;
