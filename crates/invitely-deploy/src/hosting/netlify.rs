//! Netlify API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::{DeployRecord, HostingProvider, SiteRecord};
use crate::error::HostingError;

pub const DEFAULT_API_URL: &str = "https://api.netlify.com/api/v1";

/// Accept header that makes the files endpoint return raw content
const RAW_FILE_ACCEPT: &str = "application/vnd.bitballoon.v1.raw";

#[derive(Clone, Debug)]
pub struct NetlifyClient {
    client: Client,
    base: Url,
    token: String,
}

impl NetlifyClient {
    /// Create a client for `api_url` authenticated with a personal access
    /// token. Every request is bounded by `timeout`.
    pub fn new(api_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, HostingError> {
        let base = Url::parse(&format!("{}/", api_url.trim_end_matches('/')))
            .map_err(|e| HostingError::Transport(format!("invalid API URL {api_url}: {e}")))?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base,
            token: token.into(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("invitely/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, path: &str) -> Result<Url, HostingError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HostingError::Transport(e.to_string()))
    }

    fn site_listing_url(&self, name: &str, page: u32, per_page: u32) -> Result<Url, HostingError> {
        let mut url = self.url("sites")?;
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("filter", "all")
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.token)
    }

    async fn error_for(resp: Response) -> HostingError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        HostingError::Status {
            status: status.as_u16(),
            body,
        }
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, HostingError> {
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| HostingError::Decode(e.to_string()))
    }
}

#[async_trait]
impl HostingProvider for NetlifyClient {
    async fn list_sites(
        &self,
        name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SiteRecord>, HostingError> {
        let url = self.site_listing_url(name, page, per_page)?;

        let resp = self.request(Method::GET, url).send().await?;
        let sites: Vec<SiteRecord> = Self::json(resp).await?;
        debug!(name, page, matches = sites.len(), "listed sites");
        Ok(sites)
    }

    async fn create_site(&self, name: &str) -> Result<SiteRecord, HostingError> {
        let url = self.url("sites")?;
        let resp = self
            .request(Method::POST, url)
            .json(&json!({ "name": name }))
            .send()
            .await?;

        if resp.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(HostingError::AlreadyExists(name.to_string()));
        }
        Self::json(resp).await
    }

    async fn deploy_archive(
        &self,
        site_id: &str,
        archive: Vec<u8>,
    ) -> Result<DeployRecord, HostingError> {
        let url = self.url(&format!("sites/{site_id}/deploys"))?;
        let bytes = archive.len();
        let resp = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "application/zip")
            .body(archive)
            .send()
            .await?;

        debug!(site_id, bytes, status = %resp.status(), "uploaded archive");
        Self::json(resp).await
    }

    async fn fetch_file(&self, site_id: &str, path: &str) -> Result<String, HostingError> {
        let url = self.url(&format!("sites/{site_id}/files/{}", path.trim_start_matches('/')))?;
        let resp = self
            .request(Method::GET, url)
            .header(ACCEPT, RAW_FILE_ACCEPT)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(HostingError::NotFound(format!("{site_id}/{path}")));
        }
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(resp.text().await?)
    }

    async fn purge_cache(&self, site_id: &str) -> Result<(), HostingError> {
        let url = self.url("purge")?;
        let resp = self
            .request(Method::POST, url)
            .json(&json!({ "site_id": site_id }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(())
    }
}
