//! Deployment coordinator
//!
//! Publishes an archive to the per-slug destination and routes the slug from
//! the main site to it:
//!
//! `Start → ResolveDestination → Upload → UpdateRedirects → (PurgeCache) → Done`
//!
//! Any failure before the upload finishes ends in `Failed` with no redirect
//! change. After the upload, redirect and purge failures are logged and
//! reported in the outcome but never undo a publish.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{DeployError, HostingError, Result};
use crate::hosting::{DeployRecord, HostingProvider, SiteRecord, with_timeout};
use crate::redirects::{HostedRedirects, LedgerOutcome, RedirectLedger, RedirectRule};

/// Prefix of every per-slug destination name
pub const DESTINATION_PREFIX: &str = "invite-";

/// Sites requested per listing page
pub const SITE_PAGE_SIZE: u32 = 100;

/// Listing pages read before giving up on finding a destination
const MAX_LISTING_PAGES: u32 = 50;

/// Name of the destination site for a slug
pub fn destination_name(slug: &str) -> String {
    format!("{DESTINATION_PREFIX}{slug}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    Start,
    ResolveDestination,
    Upload,
    UpdateRedirects,
    PurgeCache,
    Done,
    Failed,
}

impl DeployStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStage::Start => "start",
            DeployStage::ResolveDestination => "resolve_destination",
            DeployStage::Upload => "upload",
            DeployStage::UpdateRedirects => "update_redirects",
            DeployStage::PurgeCache => "purge_cache",
            DeployStage::Done => "done",
            DeployStage::Failed => "failed",
        }
    }
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment settings
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Provider id of the main site holding the redirect table
    pub main_site_id: String,
    /// Public URL of the main site
    pub main_site_url: String,
    /// Purge the destination cache after publishing
    pub edge_cache: bool,
    /// Upper bound for each remote call
    pub request_timeout: Duration,
}

/// Result of a successful deployment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    pub site_url: String,
    pub main_url: String,
    pub edge_cache_enabled: bool,
    pub redirects_updated: bool,
    /// Raw deploy record of the provider
    pub deploy: DeployRecord,
}

/// Drives a deployment through its stages
pub struct Deployer {
    provider: Arc<dyn HostingProvider>,
    ledger: RedirectLedger,
    config: DeployConfig,
}

impl Deployer {
    /// Deployer whose redirect table is the main site's `_redirects`
    pub fn new(provider: Arc<dyn HostingProvider>, config: DeployConfig) -> Self {
        let store = HostedRedirects::new(
            provider.clone(),
            config.main_site_id.clone(),
            config.request_timeout,
        );
        Self::with_ledger(provider, RedirectLedger::new(Arc::new(store)), config)
    }

    pub fn with_ledger(
        provider: Arc<dyn HostingProvider>,
        ledger: RedirectLedger,
        config: DeployConfig,
    ) -> Self {
        Self {
            provider,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Public URL of a slug on the main site
    pub fn main_url(&self, slug: &str) -> String {
        format!("{}/{}", self.config.main_site_url.trim_end_matches('/'), slug)
    }

    /// Publish `archive` for `slug`
    ///
    /// # Errors
    ///
    /// - `DeployError::Resolve` if the destination cannot be found or created
    /// - `DeployError::Upload` if the provider rejects the archive
    pub async fn deploy(&self, slug: &str, archive: Vec<u8>) -> Result<DeployOutcome> {
        let started = Instant::now();
        let name = destination_name(slug);
        enter(slug, DeployStage::Start);

        enter(slug, DeployStage::ResolveDestination);
        let site = self.resolve_destination(&name).await.map_err(|source| {
            fail(
                slug,
                DeployStage::ResolveDestination,
                DeployError::Resolve { name, source },
            )
        })?;

        enter(slug, DeployStage::Upload);
        let deploy = with_timeout(
            "deploy_archive",
            self.config.request_timeout,
            self.provider.deploy_archive(&site.id, archive),
        )
        .await
        .map_err(|source| {
            fail(
                slug,
                DeployStage::Upload,
                DeployError::Upload {
                    site_id: site.id.clone(),
                    source,
                },
            )
        })?;

        enter(slug, DeployStage::UpdateRedirects);
        let rule = RedirectRule::for_slug(slug, site.public_url());
        let redirects_updated = match self.ledger.append_if_absent(&rule).await {
            Ok(LedgerOutcome::Appended | LedgerOutcome::Corrected | LedgerOutcome::AlreadyPresent) => true,
            Err(e) => {
                warn!(slug, stage = %DeployStage::UpdateRedirects, error = %e, "redirect table not updated");
                false
            }
        };

        if self.config.edge_cache {
            enter(slug, DeployStage::PurgeCache);
            let purged = with_timeout(
                "purge_cache",
                self.config.request_timeout,
                self.provider.purge_cache(&site.id),
            )
            .await;
            if let Err(e) = purged {
                warn!(slug, stage = %DeployStage::PurgeCache, error = %e, "cache purge failed");
            }
        }

        info!(
            slug,
            stage = %DeployStage::Done,
            site_id = %site.id,
            redirects_updated,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "deploy finished"
        );

        Ok(DeployOutcome {
            site_url: site.public_url().to_string(),
            main_url: self.main_url(slug),
            edge_cache_enabled: self.config.edge_cache,
            redirects_updated,
            deploy,
        })
    }

    /// Find the destination site, creating it when absent
    async fn resolve_destination(&self, name: &str) -> std::result::Result<SiteRecord, HostingError> {
        if let Some(site) = self.find_site(name).await? {
            return Ok(site);
        }

        let created = with_timeout(
            "create_site",
            self.config.request_timeout,
            self.provider.create_site(name),
        )
        .await;

        match created {
            Ok(site) => {
                info!(name, site_id = %site.id, "created destination site");
                Ok(site)
            }
            Err(HostingError::AlreadyExists(_)) => {
                info!(name, "destination created concurrently, resolving again");
                self.find_site(name)
                    .await?
                    .ok_or_else(|| HostingError::NotFound(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Page through the listing until a site with exactly `name` shows up.
    /// Name filters are fuzzy, so the exact match can sit on any page.
    async fn find_site(&self, name: &str) -> std::result::Result<Option<SiteRecord>, HostingError> {
        for page in 1..=MAX_LISTING_PAGES {
            let sites = with_timeout(
                "list_sites",
                self.config.request_timeout,
                self.provider.list_sites(name, page, SITE_PAGE_SIZE),
            )
            .await?;
            if sites.is_empty() {
                return Ok(None);
            }
            if let Some(site) = sites.into_iter().find(|site| site.name == name) {
                return Ok(Some(site));
            }
        }

        warn!(name, pages = MAX_LISTING_PAGES, "site listing not exhausted, assuming absent");
        Ok(None)
    }
}

fn enter(slug: &str, stage: DeployStage) {
    info!(slug, stage = %stage, "deploy stage");
}

fn fail(slug: &str, at: DeployStage, error: DeployError) -> DeployError {
    error!(slug, stage = %DeployStage::Failed, failed_at = %at, error = %error, "deploy failed");
    error
}
