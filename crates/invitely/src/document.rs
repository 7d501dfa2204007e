//! Document assembly
//!
//! Wraps rendered markup into a single self-contained HTML document: inline
//! minified stylesheet, the hydration payload in a JSON data carrier and the
//! client bundle as an inline module script.

use askama::Template;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::bundle::{PAYLOAD_ELEMENT_ID, ROOT_ELEMENT_ID};
use crate::error::{DocumentError, Result};
use crate::minify::{minify_css, minify_html};
use crate::render::{HydrationPayload, RenderOutput};

const BASE_STYLESHEET: &str = include_str!("../assets/base.css");

static SCRIPT_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</(script)").expect("script close pattern is valid"));

/// Opening tag of the payload carrier, with its id quoted or bare
static PAYLOAD_CARRIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?i)<script[^>]*?\sid=(?:"{id}"|'{id}'|{id})(?:\s[^>]*)?>"#,
        id = regex::escape(PAYLOAD_ELEMENT_ID)
    ))
    .expect("payload carrier pattern is valid")
});

#[derive(Template)]
#[template(path = "document.html")]
struct DocumentTemplate<'a> {
    title: &'a str,
    description: &'a str,
    theme_color: &'a str,
    font_url: &'a str,
    stylesheet: &'a str,
    root_id: &'a str,
    markup: &'a str,
    payload_id: &'a str,
    payload: &'a str,
    bundle: &'a str,
}

/// Serialise the payload so it can sit inside a `<script>` element
fn payload_json(payload: &HydrationPayload) -> Result<String> {
    let json = serde_json::to_string(payload)?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// Make a script body safe to inline
fn escape_script(source: &str) -> String {
    SCRIPT_CLOSE.replace_all(source, "<\\/$1").into_owned()
}

/// Build the complete, minified HTML document for a render
///
/// # Errors
///
/// - `DocumentError::CssMinify` if the stylesheet does not parse
/// - `DocumentError::HtmlMinify` if the final pass fails
pub fn assemble(output: &RenderOutput) -> Result<String> {
    let theme = output.theme;

    let stylesheet = minify_css(&format!("{BASE_STYLESHEET}\n{}", theme.stylesheet))
        .map_err(|reason| DocumentError::CssMinify { reason })?;
    let payload = payload_json(&output.payload())?;
    let bundle = escape_script(&output.client_bundle);

    let html = DocumentTemplate {
        title: &output.props.title,
        description: &output.props.description,
        theme_color: theme.meta.primary_color,
        font_url: theme.meta.font_url,
        stylesheet: &stylesheet,
        root_id: ROOT_ELEMENT_ID,
        markup: &output.markup,
        payload_id: PAYLOAD_ELEMENT_ID,
        payload: &payload,
        bundle: &bundle,
    }
    .render()?;

    let document =
        minify_html(&html).map_err(|reason| DocumentError::HtmlMinify { reason })?;

    debug!(
        theme = %theme.id,
        slug = %output.props.slug,
        raw_bytes = html.len(),
        bytes = document.len(),
        "assembled document"
    );

    Ok(document)
}

/// Read the hydration payload back out of an assembled document
///
/// Mirrors what the client bundle does on load.
///
/// Page text may quote the carrier tag (meta attributes are not entity
/// encoded after minification), so the last carrier wins. Only the bundle
/// follows the real one.
pub fn read_payload(document: &str) -> Option<HydrationPayload> {
    let open = PAYLOAD_CARRIER.find_iter(document).last()?;
    let rest = &document[open.end()..];
    let end = rest.find("</script>")?;
    serde_json::from_str(&rest[..end]).ok()
}
