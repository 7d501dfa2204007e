//! Asset embedding
//!
//! Rewrites image references found anywhere in an invitation configuration
//! into inline `data:` URIs so the published page has no asset dependencies.
//! A reference that cannot be read or re-encoded keeps its original value.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::stream::{self, StreamExt};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// Images wider than this are downscaled before embedding
pub const DEFAULT_MAX_WIDTH: u32 = 1080;

/// Number of references embedded at the same time
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Quality used when re-encoding opaque images
pub const JPEG_QUALITY: u8 = 80;

static IMAGE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(png|jpe?g|gif|webp)$").expect("image reference pattern is valid")
});

/// Whether a configuration string points at an image asset
pub fn is_image_reference(value: &str) -> bool {
    !value.starts_with("data:") && IMAGE_REFERENCE.is_match(value)
}

/// Per-reference failures. These never leave this module.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid asset path: {0}")]
    InvalidPath(String),

    #[error("Asset read failed: {path} - {reason}")]
    Read { path: String, reason: String },

    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Image encode failed: {0}")]
    Encode(String),
}

/// Read access to the static asset store
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Get the raw bytes behind a configuration reference
    async fn read(&self, reference: &str) -> Result<Vec<u8>, AssetError>;
}

/// Asset store rooted at a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a reference to a path inside the root, refusing anything that
    /// could escape it or that names a remote resource.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, AssetError> {
        if reference.contains("://") || reference.starts_with("//") {
            return Err(AssetError::InvalidPath(reference.to_string()));
        }

        let relative = Path::new(reference.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(AssetError::InvalidPath(reference.to_string()));
                }
            }
        }

        if resolved == self.root {
            return Err(AssetError::InvalidPath(reference.to_string()));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl AssetSource for FsAssetSource {
    async fn read(&self, reference: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve(reference)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(path.display().to_string()),
            _ => AssetError::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        })
    }
}

/// In-memory asset store for tests and previews
#[derive(Debug, Default, Clone)]
pub struct InMemoryAssetSource {
    files: HashMap<String, Vec<u8>>,
}

impl InMemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, keyed by its path without a leading slash
    pub fn with_file(mut self, path: impl AsRef<str>, content: Vec<u8>) -> Self {
        self.files
            .insert(path.as_ref().trim_start_matches('/').to_string(), content);
        self
    }
}

#[async_trait]
impl AssetSource for InMemoryAssetSource {
    async fn read(&self, reference: &str) -> Result<Vec<u8>, AssetError> {
        self.files
            .get(reference.trim_start_matches('/'))
            .cloned()
            .ok_or_else(|| AssetError::NotFound(reference.to_string()))
    }
}

/// Replaces image references in a configuration with inline data URIs
#[derive(Clone)]
pub struct AssetEmbedder {
    source: Arc<dyn AssetSource>,
    max_width: u32,
    concurrency: usize,
}

impl AssetEmbedder {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            max_width: DEFAULT_MAX_WIDTH,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Produce a new configuration with every embeddable image inlined
    ///
    /// Never fails: references that cannot be embedded are left as they were.
    pub async fn embed(&self, config: Value) -> Value {
        let mut references = BTreeSet::new();
        collect_references(&config, &mut references);
        if references.is_empty() {
            return config;
        }

        debug!(count = references.len(), "embedding image references");

        let inlined: HashMap<String, String> = stream::iter(references)
            .map(|reference| async move {
                let result = self.inline(&reference).await;
                (reference, result)
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|(reference, result)| async move {
                match result {
                    Ok(data_uri) => Some((reference, data_uri)),
                    Err(e) => {
                        warn!(reference = %reference, error = %e, "keeping original image reference");
                        None
                    }
                }
            })
            .collect()
            .await;

        rewrite(config, &inlined)
    }

    async fn inline(&self, reference: &str) -> Result<String, AssetError> {
        let bytes = self.source.read(reference).await?;
        let max_width = self.max_width;
        let encoded = tokio::task::spawn_blocking(move || reencode(&bytes, max_width))
            .await
            .map_err(|e| AssetError::Encode(e.to_string()))??;

        Ok(format!(
            "data:{};base64,{}",
            encoded.mime,
            STANDARD.encode(&encoded.bytes)
        ))
    }
}

/// Image bytes ready to inline, with the type to declare for them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// Decode an image, shrink it to `max_width` if wider, and re-encode it
///
/// Opaque images become JPEG at [`JPEG_QUALITY`]. Images with transparent
/// pixels become lossless WebP. When the result is not smaller than the
/// input the input bytes are kept as they are.
pub fn reencode(bytes: &[u8], max_width: u32) -> Result<EncodedImage, AssetError> {
    let format = image::guess_format(bytes).map_err(|e| AssetError::Decode(e.to_string()))?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| AssetError::Decode(e.to_string()))?;
    let img = if img.width() > max_width {
        img.resize(max_width, u32::MAX, FilterType::Lanczos3)
    } else {
        img
    };

    let candidate = if has_transparency(&img) {
        encode_webp(&img)?
    } else {
        encode_jpeg(&img)?
    };

    if candidate.bytes.len() < bytes.len() {
        Ok(candidate)
    } else {
        debug!(
            format = ?format,
            source_bytes = bytes.len(),
            encoded_bytes = candidate.bytes.len(),
            "re-encode not smaller, keeping source"
        );
        Ok(EncodedImage {
            bytes: bytes.to_vec(),
            mime: format.to_mime_type(),
        })
    }
}

fn has_transparency(img: &DynamicImage) -> bool {
    img.color().has_alpha() && img.to_rgba8().pixels().any(|pixel| pixel.0[3] < u8::MAX)
}

fn encode_jpeg(img: &DynamicImage) -> Result<EncodedImage, AssetError> {
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
        .map_err(|e| AssetError::Encode(e.to_string()))?;
    Ok(EncodedImage {
        bytes: out,
        mime: ImageFormat::Jpeg.to_mime_type(),
    })
}

fn encode_webp(img: &DynamicImage) -> Result<EncodedImage, AssetError> {
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img.to_rgba8())
        .write_with_encoder(WebPEncoder::new_lossless(&mut out))
        .map_err(|e| AssetError::Encode(e.to_string()))?;
    Ok(EncodedImage {
        bytes: out,
        mime: ImageFormat::WebP.to_mime_type(),
    })
}

fn collect_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => map.values().for_each(|v| collect_references(v, out)),
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, out)),
        Value::String(s) if is_image_reference(s) => {
            out.insert(s.clone());
        }
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => {}
    }
}

fn rewrite(value: Value, inlined: &HashMap<String, String>) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| (key, rewrite(v, inlined)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| rewrite(v, inlined)).collect())
        }
        Value::String(s) => match inlined.get(&s) {
            Some(data_uri) => Value::String(data_uri.clone()),
            None => Value::String(s),
        },
        scalar @ (Value::Number(_) | Value::Bool(_) | Value::Null) => scalar,
    }
}
