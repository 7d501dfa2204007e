//! API models for requests and responses

use invitely::{Theme, ThemeMeta};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};

pub const MISSING_FIELDS: &str = "Missing required fields (theme, data, slug)";

/// Longest slug whose destination name `invite-<slug>` is still a DNS label
pub const MAX_SLUG_LEN: usize = 56;

/// Raw publish body as sent by clients
#[derive(Debug, Default, Deserialize)]
pub struct PublishBody {
    pub theme: Option<String>,
    pub data: Option<Value>,
    pub slug: Option<String>,
}

/// Validated publish request
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub theme: String,
    pub data: Value,
    pub slug: String,
}

impl TryFrom<PublishBody> for PublishRequest {
    type Error = ApiError;

    fn try_from(body: PublishBody) -> Result<Self> {
        let theme = body.theme.filter(|theme| !theme.trim().is_empty());
        let slug = body.slug.filter(|slug| !slug.is_empty());
        let data = body.data.filter(|data| !data.is_null());

        let (Some(theme), Some(data), Some(slug)) = (theme, data, slug) else {
            return Err(ApiError::validation(MISSING_FIELDS));
        };
        validate_slug(&slug)?;

        Ok(Self { theme, data, slug })
    }
}

/// Check that a slug can be used as a path segment and a DNS label fragment
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.len() > MAX_SLUG_LEN {
        return Err(ApiError::Validation(format!(
            "Invalid slug: at most {MAX_SLUG_LEN} characters allowed"
        )));
    }
    if !slug
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(ApiError::validation(
            "Invalid slug: only lowercase letters, digits and hyphens allowed",
        ));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(ApiError::validation(
            "Invalid slug: must not start or end with a hyphen",
        ));
    }
    Ok(())
}

/// Successful publish
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    pub slug: String,
    pub site_url: String,
    pub main_url: String,
    pub edge_cache_enabled: bool,
    pub deploy: Value,
}

/// Theme catalog entry
#[derive(Debug, Serialize)]
pub struct ThemeSummary {
    pub id: &'static str,
    #[serde(flatten)]
    pub meta: ThemeMeta,
}

impl From<&Theme> for ThemeSummary {
    fn from(theme: &Theme) -> Self {
        Self {
            id: theme.id.as_str(),
            meta: theme.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> PublishBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_complete_bodies() {
        let request = PublishRequest::try_from(body(json!({
            "theme": "floral",
            "data": {},
            "slug": "ayu-budi"
        })))
        .unwrap();
        assert_eq!(request.slug, "ayu-budi");
        assert_eq!(request.theme, "floral");
    }

    #[test]
    fn missing_fields_use_one_message() {
        for value in [
            json!({ "data": {}, "slug": "a" }),
            json!({ "theme": "floral", "slug": "a" }),
            json!({ "theme": "floral", "data": {} }),
            json!({ "theme": "", "data": {}, "slug": "a" }),
            json!({ "theme": "floral", "data": null, "slug": "a" }),
        ] {
            let err = PublishRequest::try_from(body(value)).unwrap_err();
            assert!(matches!(err, ApiError::Validation(ref msg) if msg == MISSING_FIELDS));
        }
    }

    #[test]
    fn slug_rules() {
        assert!(validate_slug("ayu-budi-2025").is_ok());
        assert!(validate_slug(&"a".repeat(MAX_SLUG_LEN)).is_ok());

        for bad in ["Ayu", "ayu_budi", "-ayu", "ayu-", "a/b", "ayu budi"] {
            assert!(validate_slug(bad).is_err(), "{bad}");
        }
        assert!(validate_slug(&"a".repeat(MAX_SLUG_LEN + 1)).is_err());
    }

    #[test]
    fn theme_summary_is_flat() {
        let summary = ThemeSummary::from(invitely::theme::all().first().unwrap());
        let value = serde_json::to_value(summary).unwrap();
        assert_eq!(value["id"], "floral");
        assert!(value["primaryColor"].is_string());
        assert!(value.get("fontUrl").is_none());
    }
}
