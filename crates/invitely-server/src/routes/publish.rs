use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use tracing::debug;

use crate::{
    AppState,
    error::{ApiError, Result},
    models::{PublishBody, PublishRequest, PublishResponse},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/publish", post(publish_invitation))
}

/// Render, package and deploy an invitation
pub async fn publish_invitation(
    State(state): State<AppState>,
    body: std::result::Result<Json<PublishBody>, JsonRejection>,
) -> Result<Json<PublishResponse>> {
    let Json(body) = body.map_err(|rejection| {
        debug!(error = %rejection, "rejected publish body");
        ApiError::BadRequest(rejection.body_text())
    })?;
    let request = PublishRequest::try_from(body)?;

    let response = state.publisher.publish(request).await?;
    Ok(Json(response))
}
