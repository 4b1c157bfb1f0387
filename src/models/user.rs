use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity attached to a request by the authentication middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
}

/// Profile payload returned once onboarding is complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub rating_count: i64,
    /// Mean of numeric scores; sentinel actions are excluded
    pub average_rating: Option<f64>,
}
