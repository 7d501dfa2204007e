//! Server configuration management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use invitely_deploy::hosting::netlify::DEFAULT_API_URL;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Personal access token for the hosting provider
    #[serde(skip_serializing)]
    pub netlify_auth_token: String,

    /// Base URL of the hosting provider API
    pub netlify_api_url: String,

    /// Provider id of the main site carrying the redirect table
    pub main_site_id: String,

    /// Public URL of the main site
    pub main_site_url: String,

    /// Directory image references are resolved against
    pub assets_dir: PathBuf,

    /// Ship the edge cache function and purge after deploys
    pub edge_cache_enabled: bool,

    /// Timeout for each hosting provider call in seconds
    pub http_timeout_seconds: u64,

    /// Embedded images wider than this are downscaled
    pub image_max_width: u32,

    /// Number of images embedded concurrently
    pub embed_concurrency: usize,

    /// Maximum request body size in megabytes
    pub body_limit_mb: usize,
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ApiError::Config(format!("Invalid {key} value"))),
        None => Ok(default),
    }
}

fn required_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Config(format!("{key} must be set")))
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            netlify_auth_token: required_var(&lookup, "NETLIFY_AUTH_TOKEN")?,
            netlify_api_url: lookup("NETLIFY_API_URL").unwrap_or(defaults.netlify_api_url),
            main_site_id: required_var(&lookup, "MAIN_SITE_ID")?,
            main_site_url: required_var(&lookup, "MAIN_SITE_URL")?,
            assets_dir: lookup("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.assets_dir),
            edge_cache_enabled: lookup("EDGE_CACHE_ENABLED")
                .map(|s| s.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.edge_cache_enabled),
            http_timeout_seconds: parse_var(&lookup, "HTTP_TIMEOUT_SECONDS", defaults.http_timeout_seconds)?,
            image_max_width: parse_var(&lookup, "IMAGE_MAX_WIDTH", defaults.image_max_width)?,
            embed_concurrency: parse_var(&lookup, "EMBED_CONCURRENCY", defaults.embed_concurrency)?,
            body_limit_mb: parse_var(&lookup, "BODY_LIMIT_MB", defaults.body_limit_mb)?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds.max(1))
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            netlify_auth_token: String::new(),
            netlify_api_url: DEFAULT_API_URL.to_string(),
            main_site_id: String::new(),
            main_site_url: String::new(),
            assets_dir: PathBuf::from("public"),
            edge_cache_enabled: false,
            http_timeout_seconds: 30,
            image_max_width: invitely::embed::DEFAULT_MAX_WIDTH,
            embed_concurrency: invitely::embed::DEFAULT_CONCURRENCY,
            body_limit_mb: 25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("NETLIFY_AUTH_TOKEN", "token"),
        ("MAIN_SITE_ID", "main"),
        ("MAIN_SITE_URL", "https://invitely.netlify.app"),
    ];

    #[test]
    fn applies_defaults() {
        let config = ServerConfig::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.netlify_api_url, DEFAULT_API_URL);
        assert_eq!(config.assets_dir, PathBuf::from("public"));
        assert!(!config.edge_cache_enabled);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.image_max_width, 1080);
        assert_eq!(config.body_limit_bytes(), 25 * 1024 * 1024);
    }

    #[test]
    fn reads_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([("PORT", "8080"), ("EDGE_CACHE_ENABLED", "TRUE"), ("EMBED_CONCURRENCY", "2")]);
        let config = ServerConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.edge_cache_enabled);
        assert_eq!(config.embed_concurrency, 2);
    }

    #[test]
    fn token_is_required() {
        let err = ServerConfig::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ApiError::Config(ref msg) if msg.contains("NETLIFY_AUTH_TOKEN")));
    }

    #[test]
    fn rejects_invalid_numbers() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "eighty"));
        let err = ServerConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ApiError::Config(ref msg) if msg == "Invalid PORT value"));
    }
}
