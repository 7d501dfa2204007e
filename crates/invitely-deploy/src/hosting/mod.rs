//! Hosting provider abstraction
//!
//! The deploy pipeline only needs five remote operations. They are expressed
//! as a trait so the HTTP client can be swapped for [`MemoryHosting`] in
//! tests.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HostingError;

pub mod memory;
pub mod netlify;

pub use memory::MemoryHosting;
pub use netlify::NetlifyClient;

/// Raw deploy record as returned by the provider
pub type DeployRecord = serde_json::Value;

/// A destination site on the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub ssl_url: Option<String>,
}

impl SiteRecord {
    /// Public base URL, preferring HTTPS
    pub fn public_url(&self) -> &str {
        self.ssl_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.url)
    }
}

/// Remote operations of a static hosting provider
#[async_trait]
pub trait HostingProvider: Send + Sync {
    /// One page of the sites whose name matches `name`. Pages start at 1.
    /// Providers may return fuzzy matches and fewer than `per_page` sites
    /// even when more pages follow; an empty page ends the listing.
    async fn list_sites(
        &self,
        name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SiteRecord>, HostingError>;

    /// Create a site. An existing name is `HostingError::AlreadyExists`.
    async fn create_site(&self, name: &str) -> Result<SiteRecord, HostingError>;

    /// Publish a zip archive as the new content of a site
    async fn deploy_archive(
        &self,
        site_id: &str,
        archive: Vec<u8>,
    ) -> Result<DeployRecord, HostingError>;

    /// Raw content of a deployed file
    async fn fetch_file(&self, site_id: &str, path: &str) -> Result<String, HostingError>;

    /// Drop cached responses for a site
    async fn purge_cache(&self, site_id: &str) -> Result<(), HostingError>;
}

/// Bound a remote call by `limit`
pub async fn with_timeout<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, HostingError>
where
    F: Future<Output = Result<T, HostingError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| HostingError::Timeout {
            operation,
            after: limit,
        })?
}
