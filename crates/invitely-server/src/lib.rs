//! Invitely HTTP API Server
//!
//! Publishes invitations: renders a themed document from the submitted
//! configuration, deploys it to its own site and routes the slug from the
//! main site to it.

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, response::Json, routing::get};
use invitely::{AssetEmbedder, FsAssetSource};
use invitely_deploy::{DeployConfig, Deployer, HostingProvider, NetlifyClient};
use serde_json::{Value, json};
use time::format_description::well_known::Rfc3339;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod models;
pub mod publish;
pub mod routes;

use config::ServerConfig;
use error::{ApiError, Result};
use publish::Publisher;

/// Main application state
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<Publisher>,
    pub config: ServerConfig,
}

impl AppState {
    /// State publishing through `provider`
    pub fn new(config: ServerConfig, provider: Arc<dyn HostingProvider>) -> Self {
        let embedder = AssetEmbedder::new(Arc::new(FsAssetSource::new(config.assets_dir.clone())))
            .with_max_width(config.image_max_width)
            .with_concurrency(config.embed_concurrency);

        let deployer = Deployer::new(
            provider,
            DeployConfig {
                main_site_id: config.main_site_id.clone(),
                main_site_url: config.main_site_url.clone(),
                edge_cache: config.edge_cache_enabled,
                request_timeout: config.request_timeout(),
            },
        );

        Self {
            publisher: Arc::new(Publisher::new(embedder, deployer)),
            config,
        }
    }

    /// State publishing to Netlify
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let client = NetlifyClient::new(
            &config.netlify_api_url,
            config.netlify_auth_token.clone(),
            config.request_timeout(),
        )
        .map_err(|e| ApiError::Config(format!("Invalid NETLIFY_API_URL value: {e}")))?;

        Ok(Self::new(config, Arc::new(client)))
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.body_limit_bytes();

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // API routes
        .nest("/api", api_routes())
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)), // inlined images make bodies large
        )
        .with_state(state)
}

/// API routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(routes::publish::router())
        .merge(routes::themes::router())
}

/// Health check endpoint
async fn health_check() -> Result<Json<Value>> {
    let timestamp = time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "status": "healthy",
        "service": "invitely-server",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": timestamp
    })))
}
