//! Client bundle synthesis
//!
//! Each theme ships one self-contained module script: the shared runtime,
//! the theme component and a boot routine that reads the embedded payload
//! and hydrates the root element. The field table and title format are
//! serialised into the script from the same constants the server renders
//! with.

use tracing::debug;

use crate::error::{RenderError, Result};
use crate::minify::minify_js;
use crate::render::{PROP_SOURCES, TITLE_JOINER, TITLE_PREFIX};
use crate::theme::Theme;

/// Id of the `<script type="application/json">` element carrying the payload
pub const PAYLOAD_ELEMENT_ID: &str = "__INVITATION_DATA__";

/// Id of the element the static markup is mounted in
pub const ROOT_ELEMENT_ID: &str = "root";

const ENTRY: &str = include_str!("../assets/entry.js");
const RUNTIME: &str = include_str!("../assets/runtime.js");

/// Build the minified hydration script for a theme
///
/// # Errors
///
/// Returns `RenderError::BundleBuildFailed` if the synthesised module does
/// not parse. Nothing is published in that case.
pub fn build_client_bundle(theme: &Theme) -> Result<String> {
    let source = entry_source(theme)?;
    debug!(theme = %theme.id, bytes = source.len(), "synthesised client entry");

    minify_js(&source).map_err(|e| {
        RenderError::BundleBuildFailed {
            error_count: e.error_count,
            message: e.message,
        }
        .into()
    })
}

/// Unminified bundle source for a theme
pub fn entry_source(theme: &Theme) -> Result<String> {
    let replacements = [
        ("__THEME_ID__", serde_json::to_string(theme.id.as_str())?),
        ("__PROP_SOURCES__", serde_json::to_string(PROP_SOURCES)?),
        ("__TITLE_PREFIX__", serde_json::to_string(TITLE_PREFIX)?),
        ("__TITLE_JOINER__", serde_json::to_string(TITLE_JOINER)?),
        ("__PAYLOAD_ELEMENT_ID__", serde_json::to_string(PAYLOAD_ELEMENT_ID)?),
        ("__ROOT_ELEMENT_ID__", serde_json::to_string(ROOT_ELEMENT_ID)?),
        ("/*__RUNTIME__*/", RUNTIME.to_string()),
        ("/*__COMPONENT__*/", theme.component.to_string()),
    ];

    Ok(replacements
        .iter()
        .fold(ENTRY.to_string(), |source, (placeholder, value)| {
            source.replace(placeholder, value)
        }))
}
