use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use crate::{error::AppError, models::AuthUser, routes::AppState};

/// Ratings a user must record before gated routes open up
pub const ONBOARDING_THRESHOLD: i64 = 10;

/// Onboarding progress derived from a rating count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    pub rating_count: i64,
    pub remaining: i64,
    pub complete: bool,
}

impl OnboardingStatus {
    pub fn from_count(rating_count: i64) -> Self {
        let rating_count = rating_count.max(0);
        Self {
            rating_count,
            remaining: (ONBOARDING_THRESHOLD - rating_count).max(0),
            complete: rating_count >= ONBOARDING_THRESHOLD,
        }
    }
}

/// Lets a request through only once its user has rated enough titles
///
/// Expects [`AuthUser`] from the authentication middleware; without it the
/// request is rejected before any store access. The count is recomputed on
/// every request.
pub async fn require_onboarding_complete(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthUser>().copied() else {
        return AppError::Unauthorized("no user on request".to_string()).into_response();
    };

    let count = match state.ratings.count_ratings(user.id).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(user_id = user.id, error = %e, "Onboarding middleware error");
            return AppError::OnboardingCheckFailed.into_response();
        }
    };

    let status = OnboardingStatus::from_count(count);
    if !status.complete {
        tracing::debug!(
            user_id = user.id,
            rating_count = status.rating_count,
            remaining = status.remaining,
            "Onboarding incomplete"
        );
        return AppError::OnboardingIncomplete {
            remaining: status.remaining,
        }
        .into_response();
    }

    next.run(request).await
}
