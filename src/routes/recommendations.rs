use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    card::{CardOptions, CardView, RecommendationCard},
    error::AppResult,
    models::{Genre, RatingValue, Recommendation},
    routes::AppState,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    pub recommendation: Recommendation,
    /// Genre table; fetched from the metadata provider when empty
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub user_rating: Option<RatingValue>,
    #[serde(default)]
    pub include_details: bool,
    #[serde(default = "default_true")]
    pub show_reasons: bool,
    #[serde(default = "default_true")]
    pub show_match_score: bool,
}

/// Renders a recommendation into a card view
pub async fn render_card(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CardRequest>,
) -> AppResult<Json<CardView>> {
    let media = request.recommendation.movie.media_ref();

    let genres = if request.genres.is_empty() {
        state
            .metadata
            .fetch_genres(media.media_type)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(media = %media, error = %e, "Genre lookup failed, rendering without genres");
                Vec::new()
            })
    } else {
        request.genres
    };

    // Rating actions go through the ratings endpoints, not the renderer.
    let mut card = RecommendationCard::new(
        request.recommendation,
        genres,
        request.user_rating,
        |_, _| {},
    )
    .with_options(CardOptions {
        show_reasons: request.show_reasons,
        show_match_score: request.show_match_score,
    })
    .with_trailer_preference(state.trailer_preference.clone());

    if request.include_details {
        card.open_details(state.metadata.as_ref()).await;
    }

    Ok(Json(card.view()))
}
