use axum::{
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    card::TrailerPreference,
    db::Database,
    middleware::{
        auth::{authenticate, JwtKeys},
        onboarding::require_onboarding_complete,
        request_id::{make_span_with_request_id, request_id_middleware},
    },
    services::{providers::MetadataProvider, ratings::RatingRepository},
};

pub mod media;
pub mod recommendations;
pub mod user;

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub ratings: Arc<dyn RatingRepository>,
    pub metadata: Arc<dyn MetadataProvider>,
    pub jwt: JwtKeys,
    pub trailer_preference: TrailerPreference,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

/// Routes under /api, all behind bearer authentication
fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/user", user_routes(state.clone()))
        .route("/media/genres/:media_type", get(media::genres))
        .route("/media/:media_type/:id/details", get(media::details))
        .route("/recommendations/card", post(recommendations::render_card))
        .route_layer(from_fn_with_state(state, authenticate))
}

/// Rating routes stay reachable before onboarding so users can complete it
fn user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let gated = Router::new()
        .route("/profile", get(user::profile))
        .route_layer(from_fn_with_state(state, require_onboarding_complete));

    Router::new()
        .merge(gated)
        .route("/ratings", post(user::rate).get(user::list_ratings))
        .route("/ratings/batch", post(user::rate_batch))
        .route("/onboarding", get(user::onboarding_status))
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let database = if state.db.is_connected() {
        "connected"
    } else {
        "unavailable"
    };
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "database": database })),
    )
}
