use axum::{Json, Router, routing::get};
use invitely::theme;

use crate::{AppState, models::ThemeSummary};

pub fn router() -> Router<AppState> {
    Router::new().route("/themes", get(list_themes))
}

/// Catalog of the available themes
pub async fn list_themes() -> Json<Vec<ThemeSummary>> {
    Json(theme::all().iter().map(ThemeSummary::from).collect())
}
