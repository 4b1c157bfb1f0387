use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    card::{trailer_link, CastAndCrew, TrailerLink},
    error::AppResult,
    models::{Genre, MediaDetails, MediaRef, MediaType},
    routes::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsResponse {
    pub media: MediaRef,
    pub details: MediaDetails,
    pub credits: CastAndCrew,
    pub trailer: TrailerLink,
}

/// Genre table for a media type
pub async fn genres(
    State(state): State<Arc<AppState>>,
    Path(media_type): Path<MediaType>,
) -> AppResult<Json<Vec<Genre>>> {
    let genres = state.metadata.fetch_genres(media_type).await?;
    Ok(Json(genres))
}

/// Extended metadata with the resolved trailer link
pub async fn details(
    State(state): State<Arc<AppState>>,
    Path((media_type, id)): Path<(MediaType, u64)>,
) -> AppResult<Json<DetailsResponse>> {
    let media = MediaRef { media_type, id };
    let details = state.metadata.fetch_details(media).await?;

    Ok(Json(DetailsResponse {
        media,
        credits: CastAndCrew::from_credits(&details.credits),
        trailer: trailer_link(media, Some(&details), &state.trailer_preference),
        details,
    }))
}
