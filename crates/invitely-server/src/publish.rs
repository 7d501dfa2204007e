//! Publish pipeline
//!
//! Resolves the theme, inlines images, renders and assembles the document,
//! packs it and hands it to the deployer. Nothing remote is touched until the
//! archive exists.

use std::time::Instant;

use invitely::{AssetEmbedder, assemble, render, theme};
use invitely_deploy::{ArchiveOptions, Deployer, SiteArchive};
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::models::{PublishRequest, PublishResponse};

/// Runs publish requests end to end
pub struct Publisher {
    embedder: AssetEmbedder,
    deployer: Deployer,
}

impl Publisher {
    pub fn new(embedder: AssetEmbedder, deployer: Deployer) -> Self {
        Self { embedder, deployer }
    }

    pub async fn publish(&self, request: PublishRequest) -> Result<PublishResponse> {
        let started = Instant::now();
        let PublishRequest {
            theme: theme_name,
            data,
            slug,
        } = request;

        // Unknown themes are rejected before any work is done
        let theme = theme::resolve(&theme_name)?;
        info!(slug = %slug, theme = %theme.id, "publishing invitation");

        let config = self.embedder.embed(data).await;

        let edge_cache = self.deployer.config().edge_cache;
        let build_slug = slug.clone();
        let archive = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let output = render(theme.id.as_str(), config, &build_slug)?;
            let html = assemble(&output)?;
            debug!(slug = %build_slug, document_bytes = html.len(), "assembled document");
            Ok(SiteArchive::build(&html, &ArchiveOptions::new(edge_cache))?)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("build task failed: {e}")))??;

        let outcome = self.deployer.deploy(&slug, archive).await?;

        info!(
            slug = %slug,
            site_url = %outcome.site_url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "invitation published"
        );

        Ok(PublishResponse {
            success: true,
            slug,
            site_url: outcome.site_url,
            main_url: outcome.main_url,
            edge_cache_enabled: outcome.edge_cache_enabled,
            deploy: outcome.deploy,
        })
    }
}
