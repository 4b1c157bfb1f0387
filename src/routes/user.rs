use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::onboarding::OnboardingStatus,
    middleware::request_id::RequestId,
    models::{AuthUser, NewRating, StoredRating, UserProfile},
    routes::AppState,
};

/// Most ratings accepted in one batch request
const MAX_BATCH: usize = 100;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub success: bool,
    pub rating: StoredRating,
    pub onboarding: OnboardingStatus,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub ratings: Vec<NewRating>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub written: usize,
    pub onboarding: OnboardingStatus,
}

#[derive(Debug, Serialize)]
pub struct RatingsResponse {
    pub success: bool,
    pub ratings: Vec<StoredRating>,
}

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub success: bool,
    #[serde(flatten)]
    pub status: OnboardingStatus,
}

/// Profile of the authenticated user; only reachable after onboarding
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state
        .ratings
        .fetch_profile(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        profile,
    }))
}

/// Records one rating
pub async fn rate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<NewRating>,
) -> AppResult<Json<RateResponse>> {
    let body = body.validate()?;

    tracing::info!(
        request_id = %request_id,
        user_id = user.id,
        movie_id = body.movie_id,
        action = body.rating.action_label(),
        "Recording rating"
    );

    let rating = state.ratings.upsert_rating(user.id, body).await?;
    let onboarding = OnboardingStatus::from_count(state.ratings.count_ratings(user.id).await?);

    Ok(Json(RateResponse {
        success: true,
        rating,
        onboarding,
    }))
}

/// Records several ratings in one transaction
pub async fn rate_batch(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<BatchRequest>,
) -> AppResult<Json<BatchResponse>> {
    if body.ratings.is_empty() {
        return Err(AppError::InvalidInput("ratings cannot be empty".to_string()));
    }
    if body.ratings.len() > MAX_BATCH {
        return Err(AppError::InvalidInput(format!(
            "at most {} ratings per batch",
            MAX_BATCH
        )));
    }

    let ratings = body
        .ratings
        .into_iter()
        .map(NewRating::validate)
        .collect::<AppResult<Vec<_>>>()?;

    let written = state.ratings.record_ratings(user.id, ratings).await?;
    let onboarding = OnboardingStatus::from_count(state.ratings.count_ratings(user.id).await?);

    Ok(Json(BatchResponse {
        success: true,
        written,
        onboarding,
    }))
}

pub async fn list_ratings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<RatingsResponse>> {
    let ratings = state.ratings.list_ratings(user.id).await?;
    Ok(Json(RatingsResponse {
        success: true,
        ratings,
    }))
}

/// Onboarding progress, available before onboarding completes
pub async fn onboarding_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<OnboardingResponse>> {
    let count = state.ratings.count_ratings(user.id).await?;
    Ok(Json(OnboardingResponse {
        success: true,
        status: OnboardingStatus::from_count(count),
    }))
}
