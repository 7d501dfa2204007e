//! Deployable site archives
//!
//! Sites are uploaded as a single zip. Entries are accumulated on an
//! in-memory cursor and the archive only exists once [`SiteArchive::finish`]
//! has written the central directory.

use std::io::{Cursor, Read, Write};

use tracing::debug;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;
use crate::redirects::CATCH_ALL_RULE;

pub const INDEX_FILE: &str = "index.html";
pub const REDIRECTS_FILE: &str = "_redirects";
pub const HEADERS_FILE: &str = "_headers";
pub const EDGE_FUNCTION_FILE: &str = ".netlify/edge-functions/edge-cache.js";
pub const EDGE_MANIFEST_FILE: &str = ".netlify/edge-functions/manifest.json";

/// Cache policy for every published file
pub const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

const EDGE_FUNCTION: &str = include_str!("../assets/edge-cache.js");
const EDGE_MANIFEST: &str = r#"{"functions":[{"function":"edge-cache","path":"/*"}],"version":1}"#;

/// What goes into a site archive besides the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Ship the edge caching function
    pub edge_cache: bool,
    /// Marker written to `X-Build-Id`, unique per build
    pub build_id: String,
}

impl ArchiveOptions {
    pub fn new(edge_cache: bool) -> Self {
        Self {
            edge_cache,
            build_id: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::new(false)
    }
}

/// `_headers` content for a build
pub fn headers_file(build_id: &str) -> String {
    format!("/*\n  Cache-Control: {CACHE_CONTROL}\n  X-Build-Id: {build_id}\n")
}

/// Zip archive under construction
pub struct SiteArchive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    entries: usize,
}

impl SiteArchive {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            entries: 0,
        }
    }

    /// Add a file at `path`
    pub fn add_file(&mut self, path: &str, contents: &[u8]) -> Result<(), ArchiveError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);
        self.writer.start_file(path, options)?;
        self.writer.write_all(contents)?;
        self.entries += 1;
        Ok(())
    }

    /// Write the central directory and return the archive bytes
    pub fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        let entries = self.entries;
        let bytes = self.writer.finish()?.into_inner();
        debug!(entries, bytes = bytes.len(), "finished site archive");
        Ok(bytes)
    }

    /// Package a complete invitation site
    pub fn build(html: &str, options: &ArchiveOptions) -> Result<Vec<u8>, ArchiveError> {
        let mut archive = Self::new();
        archive.add_file(INDEX_FILE, html.as_bytes())?;
        archive.add_file(REDIRECTS_FILE, format!("{CATCH_ALL_RULE}\n").as_bytes())?;
        archive.add_file(HEADERS_FILE, headers_file(&options.build_id).as_bytes())?;
        if options.edge_cache {
            archive.add_file(EDGE_FUNCTION_FILE, EDGE_FUNCTION.as_bytes())?;
            archive.add_file(EDGE_MANIFEST_FILE, EDGE_MANIFEST.as_bytes())?;
        }
        archive.finish()
    }

    /// Package a redirect table on its own, for the main site
    pub fn redirects_only(table: &str) -> Result<Vec<u8>, ArchiveError> {
        let mut archive = Self::new();
        archive.add_file(REDIRECTS_FILE, table.as_bytes())?;
        archive.finish()
    }
}

impl Default for SiteArchive {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one text file out of an archive
pub fn read_entry(archive: &[u8], path: &str) -> Option<String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).ok()?;
    let mut file = zip.by_name(path).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    Some(contents)
}

/// Names of every entry in an archive
pub fn entry_names(archive: &[u8]) -> Vec<String> {
    zip::ZipArchive::new(Cursor::new(archive))
        .map(|zip| zip.file_names().map(str::to_string).collect())
        .unwrap_or_default()
}
