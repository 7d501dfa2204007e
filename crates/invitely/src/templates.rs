//! Askama templates for the built-in themes
//!
//! Every theme renders the same [`InvitationView`]; the view is computed from
//! [`RenderProps`] and a few theme-only fields read from the configuration.
//! The client bundle only depends on the derived props, never on the view.

use askama::Template;
use serde_json::Value;
use time::Date;
use time::macros::format_description;

use crate::error::Result;
use crate::render::RenderProps;
use crate::value::{lookup, lookup_str, lookup_str_list};

/// One ceremony block (akad, reception)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlock {
    pub label: &'static str,
    pub date: String,
    pub time: String,
    pub location: String,
}

/// Bank account for digital gifts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftAccount {
    pub bank: String,
    pub holder: String,
    pub number: String,
}

/// Everything a theme template can show
///
/// Optional fields are empty strings or empty lists when unset.
#[derive(Debug, Clone)]
pub struct InvitationView {
    pub title: String,
    pub slug: String,
    pub bride_name: String,
    pub groom_name: String,
    pub bride_parents: String,
    pub groom_parents: String,
    pub bride_photo: String,
    pub groom_photo: String,
    pub hero_image: String,
    pub greeting: String,
    pub description: String,
    /// Raw event date, read by the countdown
    pub event_date: String,
    /// Human-readable event date
    pub event_date_label: String,
    pub location: String,
    pub maps_url: String,
    pub events: Vec<EventBlock>,
    pub quote: String,
    pub quote_source: String,
    pub gallery: Vec<String>,
    pub gifts: Vec<GiftAccount>,
    pub closing: String,
    pub signature: String,
    pub audio: String,
}

fn text(config: &Value, path: &str) -> String {
    lookup_str(config, path).unwrap_or_default().to_string()
}

fn first_text(config: &Value, paths: &[&str]) -> String {
    paths
        .iter()
        .find_map(|path| lookup_str(config, path))
        .unwrap_or_default()
        .to_string()
}

/// Format an ISO date (`2025-12-25`, optionally followed by a time) as
/// `25 December 2025`. Anything else is returned as given.
pub fn date_label(raw: &str) -> String {
    let day = raw.get(..10).unwrap_or(raw);
    let parsed = Date::parse(day, format_description!("[year]-[month]-[day]"));
    parsed
        .ok()
        .and_then(|date| {
            date.format(format_description!(
                "[day padding:none] [month repr:long] [year]"
            ))
            .ok()
        })
        .unwrap_or_else(|| raw.to_string())
}

fn event_block(config: &Value, label: &'static str, prefix: &str) -> Option<EventBlock> {
    let date = text(config, &format!("text.event.{prefix}Date"));
    let time = text(config, &format!("text.event.{prefix}Time"));
    let location = text(config, &format!("text.event.{prefix}Location"));
    if date.is_empty() && time.is_empty() && location.is_empty() {
        return None;
    }
    Some(EventBlock {
        label,
        date: if date.is_empty() { date } else { date_label(&date) },
        time,
        location,
    })
}

fn gift_accounts(config: &Value) -> Vec<GiftAccount> {
    let Some(Value::Array(accounts)) = lookup(config, "gifts.accounts") else {
        return Vec::new();
    };
    accounts
        .iter()
        .filter_map(|account| {
            let number = text(account, "accountNumber");
            if number.is_empty() {
                return None;
            }
            Some(GiftAccount {
                bank: text(account, "bank"),
                holder: text(account, "accountName"),
                number,
            })
        })
        .collect()
}

impl InvitationView {
    pub fn from_props(props: &RenderProps) -> Self {
        let config = &props.config;
        let events = [("Akad", "akad"), ("Reception", "reception")]
            .into_iter()
            .filter_map(|(label, prefix)| event_block(config, label, prefix))
            .collect();

        Self {
            title: props.title.clone(),
            slug: props.slug.clone(),
            bride_name: props.bride_name.clone(),
            groom_name: props.groom_name.clone(),
            bride_parents: text(config, "text.couple.brideParents"),
            groom_parents: text(config, "text.couple.groomParents"),
            bride_photo: text(config, "images.bride"),
            groom_photo: text(config, "images.groom"),
            hero_image: first_text(config, &["backgrounds.hero", "backgrounds.cover", "images.cover"]),
            greeting: text(config, "text.opening.greeting"),
            description: props.description.clone(),
            event_date: props.event_date.clone(),
            event_date_label: date_label(&props.event_date),
            location: props.location.clone(),
            maps_url: text(config, "text.event.mapsUrl"),
            events,
            quote: text(config, "text.quote.text"),
            quote_source: text(config, "text.quote.source"),
            gallery: lookup_str_list(config, "images.gallery"),
            gifts: gift_accounts(config),
            closing: text(config, "text.closing.paragraph1"),
            signature: text(config, "text.closing.signature"),
            audio: first_text(config, &["audio.src", "audio.url"]),
        }
    }
}

#[derive(Template)]
#[template(path = "floral.html")]
struct FloralTemplate<'a> {
    view: &'a InvitationView,
}

#[derive(Template)]
#[template(path = "classic.html")]
struct ClassicTemplate<'a> {
    view: &'a InvitationView,
}

#[derive(Template)]
#[template(path = "rustic.html")]
struct RusticTemplate<'a> {
    view: &'a InvitationView,
}

pub fn render_floral(props: &RenderProps) -> Result<String> {
    let view = InvitationView::from_props(props);
    Ok(FloralTemplate { view: &view }.render()?)
}

pub fn render_classic(props: &RenderProps) -> Result<String> {
    let view = InvitationView::from_props(props);
    Ok(ClassicTemplate { view: &view }.render()?)
}

pub fn render_rustic(props: &RenderProps) -> Result<String> {
    let view = InvitationView::from_props(props);
    Ok(RusticTemplate { view: &view }.render()?)
}
