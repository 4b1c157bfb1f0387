use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MediaType;
use crate::error::{AppError, AppResult};

/// Highest score on the rating scale
pub const MAX_SCORE: f64 = 10.0;

/// Responses other than a numeric score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingAction {
    NotWatched,
    NotInterested,
    Skip,
}

impl RatingAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RatingAction::NotWatched => "not_watched",
            RatingAction::NotInterested => "not_interested",
            RatingAction::Skip => "skip",
        }
    }
}

/// A user's answer for one title: a 0-10 score or a sentinel action
///
/// Serialized untagged, so `8.0` and `"skip"` are both valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatingValue {
    Score(f64),
    Action(RatingAction),
}

impl RatingValue {
    /// Value stored in the `action` column
    pub const RATED: &'static str = "rated";

    pub fn validate(self) -> AppResult<Self> {
        match self {
            RatingValue::Score(score) if !(0.0..=MAX_SCORE).contains(&score) => Err(
                AppError::InvalidInput(format!("Rating must be between 0 and {}", MAX_SCORE)),
            ),
            other => Ok(other),
        }
    }

    pub fn score(self) -> Option<f64> {
        match self {
            RatingValue::Score(score) => Some(score),
            RatingValue::Action(_) => None,
        }
    }

    pub fn action_label(self) -> &'static str {
        match self {
            RatingValue::Score(_) => Self::RATED,
            RatingValue::Action(action) => action.as_str(),
        }
    }

    /// Rebuilds a value from its `(rating, action)` columns
    pub fn from_columns(rating: Option<f64>, action: &str) -> Option<Self> {
        match (action, rating) {
            (Self::RATED, Some(score)) => Some(RatingValue::Score(score)),
            ("not_watched", _) => Some(RatingValue::Action(RatingAction::NotWatched)),
            ("not_interested", _) => Some(RatingValue::Action(RatingAction::NotInterested)),
            ("skip", _) => Some(RatingValue::Action(RatingAction::Skip)),
            _ => None,
        }
    }
}

/// Request body for recording a rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRating {
    pub movie_id: i64,
    pub movie_title: String,
    pub rating: RatingValue,
    #[serde(default = "default_media_type")]
    pub media_type: MediaType,
}

fn default_media_type() -> MediaType {
    MediaType::Movie
}

impl NewRating {
    pub fn validate(self) -> AppResult<Self> {
        if self.movie_id <= 0 {
            return Err(AppError::InvalidInput("movieId must be positive".to_string()));
        }
        if self.movie_title.trim().is_empty() {
            return Err(AppError::InvalidInput("movieTitle is required".to_string()));
        }
        let rating = self.rating.validate()?;
        Ok(Self { rating, ..self })
    }
}

/// A row of `user_ratings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredRating {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub movie_title: String,
    pub media_type: String,
    pub rating: Option<f64>,
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredRating {
    pub fn value(&self) -> Option<RatingValue> {
        RatingValue::from_columns(self.rating, &self.action)
    }
}
