//! Theme registry
//!
//! The set of themes is closed: every identifier is a [`ThemeId`] variant and
//! maps to exactly one [`Theme`] holding its render function, stylesheet,
//! client component and display metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThemeError};
use crate::render::RenderProps;
use crate::templates;

/// Identifier of a built-in theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    Floral,
    Classic,
    Rustic,
}

impl ThemeId {
    pub const ALL: [ThemeId; 3] = [ThemeId::Floral, ThemeId::Classic, ThemeId::Rustic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeId::Floral => "floral",
            ThemeId::Classic => "classic",
            ThemeId::Rustic => "rustic",
        }
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeId {
    type Err = ThemeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        ThemeId::ALL
            .into_iter()
            .find(|id| id.as_str() == name)
            .ok_or_else(|| ThemeError::NotFound {
                name: s.to_string(),
            })
    }
}

/// Static display metadata of a theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeMeta {
    /// Human-readable name shown in the catalog
    pub label: &'static str,
    pub primary_color: &'static str,
    pub secondary_color: &'static str,
    /// CSS font family used for headings
    pub font_family: &'static str,
    /// Stylesheet that provides `font_family`
    #[serde(skip)]
    pub font_url: &'static str,
}

/// Produces the static body markup of a theme from render props
pub type RenderFn = fn(&RenderProps) -> Result<String>;

/// A renderable theme
#[derive(Debug)]
pub struct Theme {
    pub id: ThemeId,
    pub meta: ThemeMeta,
    /// Static markup renderer
    pub render: RenderFn,
    /// Theme stylesheet, inlined into the published document
    pub stylesheet: &'static str,
    /// Client-side component providing `hydrate(root, props)`
    pub component: &'static str,
}

static THEMES: [Theme; 3] = [
    Theme {
        id: ThemeId::Floral,
        meta: ThemeMeta {
            label: "Floral Garden",
            primary_color: "#b5838d",
            secondary_color: "#fdf0ef",
            font_family: "Great Vibes",
            font_url: "https://fonts.googleapis.com/css2?family=Great+Vibes&family=Lora:wght@400;600&display=swap",
        },
        render: templates::render_floral,
        stylesheet: include_str!("../assets/themes/floral.css"),
        component: include_str!("../assets/themes/floral.js"),
    },
    Theme {
        id: ThemeId::Classic,
        meta: ThemeMeta {
            label: "Classic Gold",
            primary_color: "#a67c00",
            secondary_color: "#fffaf0",
            font_family: "Playfair Display",
            font_url: "https://fonts.googleapis.com/css2?family=Playfair+Display:wght@400;700&family=Lato:wght@400;700&display=swap",
        },
        render: templates::render_classic,
        stylesheet: include_str!("../assets/themes/classic.css"),
        component: include_str!("../assets/themes/classic.js"),
    },
    Theme {
        id: ThemeId::Rustic,
        meta: ThemeMeta {
            label: "Rustic Wood",
            primary_color: "#6b4f3a",
            secondary_color: "#f4ede4",
            font_family: "Amatic SC",
            font_url: "https://fonts.googleapis.com/css2?family=Amatic+SC:wght@400;700&family=Josefin+Sans:wght@400;600&display=swap",
        },
        render: templates::render_rustic,
        stylesheet: include_str!("../assets/themes/rustic.css"),
        component: include_str!("../assets/themes/rustic.js"),
    },
];

/// Get the theme for an identifier
pub fn theme(id: ThemeId) -> &'static Theme {
    match id {
        ThemeId::Floral => &THEMES[0],
        ThemeId::Classic => &THEMES[1],
        ThemeId::Rustic => &THEMES[2],
    }
}

/// Resolve a theme by name
pub fn resolve(name: &str) -> Result<&'static Theme> {
    let id: ThemeId = name.parse()?;
    Ok(theme(id))
}

/// All registered themes, in catalog order
pub fn all() -> &'static [Theme] {
    &THEMES
}
