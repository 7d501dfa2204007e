//! In-memory hosting provider for tests and local development

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{DeployRecord, HostingProvider, SiteRecord};
use crate::archive::read_entry;
use crate::error::HostingError;

#[derive(Debug, Default)]
struct State {
    sites: Vec<SiteRecord>,
    /// Every upload in order: site id, archive bytes
    deploys: Vec<(String, Vec<u8>)>,
    purges: Vec<String>,
    failing_sites: HashSet<String>,
    /// File fetch attempts per site id
    fetches: HashMap<String, usize>,
}

/// Hosting provider keeping sites and deploys in memory
///
/// Fetching a file reads it from the latest archive deployed to the site.
#[derive(Debug)]
pub struct MemoryHosting {
    domain: String,
    state: Mutex<State>,
    fail_fetches: AtomicBool,
    stale_listings: AtomicUsize,
    page_size_limit: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl MemoryHosting {
    /// Sites get the URL `https://<name>.<domain>`
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            state: Mutex::new(State::default()),
            fail_fetches: AtomicBool::new(false),
            stale_listings: AtomicUsize::new(0),
            page_size_limit: AtomicUsize::new(0),
            latency: Mutex::new(None),
        }
    }

    /// Register an existing site, such as the main site
    pub fn with_site(self, id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let site = self.site_record(id.into(), &name);
        self.lock().sites.push(site);
        self
    }

    /// Make uploads to one site fail
    pub fn fail_uploads_to(&self, site_id: impl Into<String>) {
        self.lock().failing_sites.insert(site_id.into());
    }

    /// Make file fetches fail
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Hide every site from the next `count` listings, as an eventually
    /// consistent listing would
    pub fn stale_listings(&self, count: usize) {
        self.stale_listings.store(count, Ordering::SeqCst);
    }

    /// Cap listing pages at `limit` sites whatever the caller asks for, as
    /// providers with a server-side maximum do. Zero removes the cap.
    pub fn page_size_limit(&self, limit: usize) {
        self.page_size_limit.store(limit, Ordering::SeqCst);
    }

    /// Delay every operation
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut slot) = self.latency.lock() {
            *slot = latency;
        }
    }

    /// All sites, in creation order
    pub fn sites(&self) -> Vec<SiteRecord> {
        self.lock().sites.clone()
    }

    /// Find a site by exact name
    pub fn site_named(&self, name: &str) -> Option<SiteRecord> {
        self.lock().sites.iter().find(|s| s.name == name).cloned()
    }

    /// Number of successful uploads to a site
    pub fn deploy_count(&self, site_id: &str) -> usize {
        self.lock()
            .deploys
            .iter()
            .filter(|(id, _)| id == site_id)
            .count()
    }

    /// Number of file fetches against a site, failed ones included
    pub fn fetch_count(&self, site_id: &str) -> usize {
        self.lock().fetches.get(site_id).copied().unwrap_or(0)
    }

    /// Latest archive deployed to a site
    pub fn latest_archive(&self, site_id: &str) -> Option<Vec<u8>> {
        self.lock()
            .deploys
            .iter()
            .rev()
            .find(|(id, _)| id == site_id)
            .map(|(_, archive)| archive.clone())
    }

    /// File content from the latest archive of a site
    pub fn deployed_file(&self, site_id: &str, path: &str) -> Option<String> {
        self.latest_archive(site_id)
            .and_then(|archive| read_entry(&archive, path.trim_start_matches('/')))
    }

    /// Site ids purged so far
    pub fn purges(&self) -> Vec<String> {
        self.lock().purges.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn site_record(&self, id: String, name: &str) -> SiteRecord {
        let url = format!("https://{}.{}", name, self.domain);
        SiteRecord {
            id,
            name: name.to_string(),
            url: url.clone(),
            ssl_url: Some(url),
        }
    }

    async fn simulate_latency(&self) {
        let latency = self.latency.lock().ok().and_then(|slot| *slot);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl HostingProvider for MemoryHosting {
    async fn list_sites(
        &self,
        name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SiteRecord>, HostingError> {
        self.simulate_latency().await;
        let stale = self
            .stale_listings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(Vec::new());
        }

        let limit = self.page_size_limit.load(Ordering::SeqCst);
        let mut page_size = per_page.max(1) as usize;
        if limit > 0 {
            page_size = page_size.min(limit);
        }
        let skip = (page.max(1) as usize - 1) * page_size;

        Ok(self
            .lock()
            .sites
            .iter()
            .filter(|site| site.name.contains(name))
            .skip(skip)
            .take(page_size)
            .cloned()
            .collect())
    }

    async fn create_site(&self, name: &str) -> Result<SiteRecord, HostingError> {
        self.simulate_latency().await;
        let mut state = self.lock();
        if state.sites.iter().any(|site| site.name == name) {
            return Err(HostingError::AlreadyExists(name.to_string()));
        }
        let site = self.site_record(format!("site-{}", state.sites.len() + 1), name);
        state.sites.push(site.clone());
        Ok(site)
    }

    async fn deploy_archive(
        &self,
        site_id: &str,
        archive: Vec<u8>,
    ) -> Result<DeployRecord, HostingError> {
        self.simulate_latency().await;
        let mut state = self.lock();
        if state.failing_sites.contains(site_id) {
            return Err(HostingError::Status {
                status: 500,
                body: "upload rejected".to_string(),
            });
        }
        if !state.sites.iter().any(|site| site.id == site_id) {
            return Err(HostingError::NotFound(site_id.to_string()));
        }
        state.deploys.push((site_id.to_string(), archive));
        let id = format!("deploy-{}", state.deploys.len());
        Ok(json!({ "id": id, "site_id": site_id, "state": "uploaded" }))
    }

    async fn fetch_file(&self, site_id: &str, path: &str) -> Result<String, HostingError> {
        self.simulate_latency().await;
        *self.lock().fetches.entry(site_id.to_string()).or_default() += 1;
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(HostingError::Status {
                status: 503,
                body: "files endpoint unavailable".to_string(),
            });
        }
        self.deployed_file(site_id, path)
            .ok_or_else(|| HostingError::NotFound(format!("{site_id}/{path}")))
    }

    async fn purge_cache(&self, site_id: &str) -> Result<(), HostingError> {
        self.simulate_latency().await;
        self.lock().purges.push(site_id.to_string());
        Ok(())
    }
}
