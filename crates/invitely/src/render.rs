//! Template rendering
//!
//! Turns a theme name and an embedded configuration into static markup plus
//! the client bundle that hydrates it. Both sides derive their render props
//! from the same declarative field table ([`PROP_SOURCES`]), which is also
//! shipped to the browser, so server markup and client hydration always see
//! the same props.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::bundle::build_client_bundle;
use crate::error::Result;
use crate::theme::{self, Theme, ThemeId};
use crate::value::lookup_str;

/// Where a render prop comes from in the configuration
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PropSource {
    /// Name of the prop as seen by themes and the client bundle
    pub prop: &'static str,
    /// Candidate dotted paths, first non-blank string wins
    pub paths: &'static [&'static str],
    /// Value used when no candidate path is set
    pub fallback: &'static str,
}

/// Field table shared by the server renderer and the client bundle
pub const PROP_SOURCES: &[PropSource] = &[
    PropSource {
        prop: "brideName",
        paths: &["text.couple.brideFullName", "text.couple.brideName", "text.couple.bride"],
        fallback: "Bride",
    },
    PropSource {
        prop: "groomName",
        paths: &["text.couple.groomFullName", "text.couple.groomName", "text.couple.groom"],
        fallback: "Groom",
    },
    PropSource {
        prop: "eventDate",
        paths: &["text.event.receptionDate", "text.event.akadDate", "text.event.date"],
        fallback: "",
    },
    PropSource {
        prop: "location",
        paths: &[
            "text.event.receptionLocation",
            "text.event.akadLocation",
            "text.event.location",
        ],
        fallback: "",
    },
    PropSource {
        prop: "description",
        paths: &["text.opening.paragraph1", "text.closing.paragraph1", "text.description"],
        fallback: "",
    },
];

pub const TITLE_PREFIX: &str = "The Wedding of ";
pub const TITLE_JOINER: &str = " & ";

/// Normalized props every theme renders from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderProps {
    pub bride_name: String,
    pub groom_name: String,
    pub event_date: String,
    pub location: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    /// Full configuration for theme-specific fields
    pub config: Value,
}

impl RenderProps {
    /// Derive props from an embedded configuration
    pub fn derive(config: Value, slug: &str) -> Self {
        let bride_name = resolve_prop(&config, "brideName");
        let groom_name = resolve_prop(&config, "groomName");
        let title = format!("{TITLE_PREFIX}{bride_name}{TITLE_JOINER}{groom_name}");

        Self {
            event_date: resolve_prop(&config, "eventDate"),
            location: resolve_prop(&config, "location"),
            description: resolve_prop(&config, "description"),
            bride_name,
            groom_name,
            title,
            slug: slug.to_string(),
            config,
        }
    }
}

fn resolve_prop(config: &Value, prop: &str) -> String {
    PROP_SOURCES
        .iter()
        .find(|source| source.prop == prop)
        .map(|source| {
            source
                .paths
                .iter()
                .find_map(|path| lookup_str(config, path))
                .unwrap_or(source.fallback)
                .to_string()
        })
        .unwrap_or_default()
}

/// Data embedded in the published page for the client bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrationPayload {
    pub theme: ThemeId,
    pub slug: String,
    pub data: Value,
}

impl HydrationPayload {
    pub fn from_props(theme: ThemeId, props: &RenderProps) -> Self {
        Self {
            theme,
            slug: props.slug.clone(),
            data: props.config.clone(),
        }
    }
}

/// Output of the render stage
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub theme: &'static Theme,
    pub props: RenderProps,
    /// Static body markup
    pub markup: String,
    /// Minified, self-contained hydration script
    pub client_bundle: String,
}

impl RenderOutput {
    pub fn payload(&self) -> HydrationPayload {
        HydrationPayload::from_props(self.theme.id, &self.props)
    }
}

/// Render static markup for a theme
///
/// Pure function of its inputs: identical arguments give identical markup.
pub fn render_markup(theme: &Theme, props: &RenderProps) -> Result<String> {
    (theme.render)(props)
}

/// Render a theme against an embedded configuration
///
/// # Errors
///
/// - `ThemeError::NotFound` when `theme_name` is not registered
/// - `RenderError::Markup` when the theme template fails
/// - `RenderError::BundleBuildFailed` when the client bundle does not compile
pub fn render(theme_name: &str, config: Value, slug: &str) -> Result<RenderOutput> {
    let theme = theme::resolve(theme_name)?;
    let props = RenderProps::derive(config, slug);

    let markup = render_markup(theme, &props)?;
    let client_bundle = build_client_bundle(theme)?;

    debug!(
        theme = %theme.id,
        slug,
        markup_bytes = markup.len(),
        bundle_bytes = client_bundle.len(),
        "rendered invitation"
    );

    Ok(RenderOutput {
        theme,
        props,
        markup,
        client_bundle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_config() -> Value {
        json!({
            "text": {
                "couple": { "brideFullName": "Ayu", "groomFullName": "Budi" },
                "event": { "receptionLocation": "Jakarta", "receptionDate": "2025-12-25" },
                "closing": { "paragraph1": "Thank you" }
            }
        })
    }

    #[test]
    fn derives_props_from_known_fields() {
        let props = RenderProps::derive(sample_config(), "ayu-budi");

        assert_eq!(props.bride_name, "Ayu");
        assert_eq!(props.groom_name, "Budi");
        assert_eq!(props.event_date, "2025-12-25");
        assert_eq!(props.location, "Jakarta");
        assert_eq!(props.description, "Thank you");
        assert_eq!(props.title, "The Wedding of Ayu & Budi");
        assert_eq!(props.slug, "ayu-budi");
        assert_eq!(props.config, sample_config());
    }

    #[test]
    fn falls_back_when_fields_are_missing_or_blank() {
        let props = RenderProps::derive(
            json!({ "text": { "couple": { "brideFullName": "   " } } }),
            "x",
        );

        assert_eq!(props.bride_name, "Bride");
        assert_eq!(props.groom_name, "Groom");
        assert_eq!(props.title, "The Wedding of Bride & Groom");
        assert_eq!(props.event_date, "");
    }

    #[test]
    fn earlier_paths_take_precedence() {
        let props = RenderProps::derive(
            json!({ "text": { "event": { "akadDate": "2025-01-01", "receptionDate": "2025-01-02" } } }),
            "x",
        );
        assert_eq!(props.event_date, "2025-01-02");
    }

    #[test]
    fn prop_table_covers_every_derived_field() {
        let props = RenderProps::derive(sample_config(), "s");
        let serialized = serde_json::to_value(&props).unwrap();
        let mut keys: Vec<&str> = serialized
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();

        let mut expected: Vec<&str> = PROP_SOURCES.iter().map(|s| s.prop).collect();
        expected.extend(["title", "slug", "config"]);
        expected.sort_unstable();

        assert_eq!(keys, expected);
    }

    #[test]
    fn payload_round_trip_reproduces_props() {
        let props = RenderProps::derive(sample_config(), "ayu-budi");
        let payload = HydrationPayload::from_props(ThemeId::Floral, &props);

        assert_eq!(RenderProps::derive(payload.data, &payload.slug), props);
    }

    #[test]
    fn render_is_deterministic() {
        let first = render("floral", sample_config(), "ayu-budi").unwrap();
        let second = render("floral", sample_config(), "ayu-budi").unwrap();

        assert_eq!(first.markup, second.markup);
        assert_eq!(first.client_bundle, second.client_bundle);
        assert!(first.markup.contains("Ayu"));
        assert!(first.markup.contains("Budi"));
    }

    #[test]
    fn render_rejects_unknown_theme() {
        let err = render("nonexistent", sample_config(), "s").unwrap_err();
        assert!(err.is_theme_not_found());
    }
}
