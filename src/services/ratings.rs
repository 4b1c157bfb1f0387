use crate::{
    db::{Database, SqlParam},
    error::{AppError, AppResult},
    models::{NewRating, StoredRating, UserProfile},
};

const COUNT_RATINGS: &str =
    "SELECT COUNT(*)::int8 AS count FROM user_ratings WHERE user_id = $1";

const UPSERT_RATING: &str = r#"
    INSERT INTO user_ratings (user_id, movie_id, movie_title, media_type, rating, action)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (user_id, movie_id, media_type)
    DO UPDATE SET movie_title = EXCLUDED.movie_title,
                  rating = EXCLUDED.rating,
                  action = EXCLUDED.action,
                  updated_at = NOW()
    RETURNING id, user_id, movie_id, movie_title, media_type, rating, action, created_at, updated_at
"#;

const LIST_RATINGS: &str = r#"
    SELECT id, user_id, movie_id, movie_title, media_type, rating, action, created_at, updated_at
    FROM user_ratings
    WHERE user_id = $1
    ORDER BY updated_at DESC, id DESC
"#;

const FETCH_PROFILE: &str = r#"
    SELECT u.id, u.email, u.first_name, u.last_name, u.created_at,
           COUNT(r.id)::int8 AS rating_count,
           AVG(r.rating)::float8 AS average_rating
    FROM users u
    LEFT JOIN user_ratings r ON r.user_id = u.id
    WHERE u.id = $1
    GROUP BY u.id
"#;

/// Storage operations behind the user routes and the onboarding gate
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingRepository: Send + Sync {
    /// Number of ratings (scores and sentinel actions) recorded by the user
    async fn count_ratings(&self, user_id: i64) -> AppResult<i64>;

    /// Inserts the rating, replacing any earlier one for the same title
    async fn upsert_rating(&self, user_id: i64, rating: NewRating) -> AppResult<StoredRating>;

    /// Upserts several ratings atomically, returning how many were written
    async fn record_ratings(&self, user_id: i64, ratings: Vec<NewRating>) -> AppResult<usize>;

    /// The user's ratings, most recently updated first
    async fn list_ratings(&self, user_id: i64) -> AppResult<Vec<StoredRating>>;

    async fn fetch_profile(&self, user_id: i64) -> AppResult<Option<UserProfile>>;
}

#[derive(sqlx::FromRow)]
struct CountRow {
    count: i64,
}

fn upsert_params(user_id: i64, rating: &NewRating) -> Vec<SqlParam> {
    vec![
        SqlParam::Int(user_id),
        SqlParam::Int(rating.movie_id),
        SqlParam::Text(rating.movie_title.clone()),
        SqlParam::Text(rating.media_type.to_string()),
        SqlParam::OptFloat(rating.rating.score()),
        SqlParam::Text(rating.rating.action_label().to_string()),
    ]
}

/// PostgreSQL implementation going through the query facade
///
/// Reads inherit the facade's fallback: with the store down, counts are 0
/// and lists are empty.
#[derive(Clone)]
pub struct PgRatingRepository {
    db: Database,
}

impl PgRatingRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl RatingRepository for PgRatingRepository {
    async fn count_ratings(&self, user_id: i64) -> AppResult<i64> {
        let result = self
            .db
            .query::<CountRow>(COUNT_RATINGS, &[SqlParam::Int(user_id)])
            .await;
        Ok(result.into_first().map(|row| row.count).unwrap_or(0))
    }

    async fn upsert_rating(&self, user_id: i64, rating: NewRating) -> AppResult<StoredRating> {
        self.db
            .query::<StoredRating>(UPSERT_RATING, &upsert_params(user_id, &rating))
            .await
            .into_first()
            // The facade answers empty when the write could not reach the store.
            .ok_or(AppError::DatabaseUnavailable)
    }

    async fn record_ratings(&self, user_id: i64, ratings: Vec<NewRating>) -> AppResult<usize> {
        let written = self
            .db
            .transaction(move |tx| {
                let ratings = ratings.clone();
                Box::pin(async move {
                    for rating in &ratings {
                        sqlx::query(UPSERT_RATING)
                            .bind(user_id)
                            .bind(rating.movie_id)
                            .bind(rating.movie_title.as_str())
                            .bind(rating.media_type.as_str())
                            .bind(rating.rating.score())
                            .bind(rating.rating.action_label())
                            .execute(&mut **tx)
                            .await?;
                    }
                    Ok(ratings.len())
                })
            })
            .await?;

        tracing::info!(user_id, written, "Recorded rating batch");
        Ok(written)
    }

    async fn list_ratings(&self, user_id: i64) -> AppResult<Vec<StoredRating>> {
        Ok(self
            .db
            .query::<StoredRating>(LIST_RATINGS, &[SqlParam::Int(user_id)])
            .await
            .rows)
    }

    async fn fetch_profile(&self, user_id: i64) -> AppResult<Option<UserProfile>> {
        Ok(self
            .db
            .query::<UserProfile>(FETCH_PROFILE, &[SqlParam::Int(user_id)])
            .await
            .into_first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeMode;
    use crate::models::{MediaType, RatingAction, RatingValue};

    fn repo() -> PgRatingRepository {
        PgRatingRepository::new(Database::disconnected(RuntimeMode::Test))
    }

    fn rating(movie_id: i64) -> NewRating {
        NewRating {
            movie_id,
            movie_title: format!("Movie {}", movie_id),
            rating: RatingValue::Score(8.0),
            media_type: MediaType::Movie,
        }
    }

    #[test]
    fn test_upsert_params_for_sentinel() {
        let mut r = rating(4);
        r.rating = RatingValue::Action(RatingAction::NotInterested);
        let params = upsert_params(7, &r);
        assert_eq!(params[0], SqlParam::Int(7));
        assert_eq!(params[3], SqlParam::Text("movie".to_string()));
        assert_eq!(params[4], SqlParam::OptFloat(None));
        assert_eq!(params[5], SqlParam::Text("not_interested".to_string()));
    }

    #[test]
    fn test_count_is_zero_when_store_unreachable() {
        let count = tokio_test::assert_ok!(tokio_test::block_on(repo().count_ratings(1)));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_reads_are_empty_when_store_unreachable() {
        let repo = repo();
        assert!(repo.list_ratings(1).await.unwrap().is_empty());
        assert!(repo.fetch_profile(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writes_report_unavailable() {
        let repo = repo();
        assert!(matches!(
            repo.upsert_rating(1, rating(1)).await,
            Err(AppError::DatabaseUnavailable)
        ));
        assert!(matches!(
            repo.record_ratings(1, vec![rating(1), rating(2)]).await,
            Err(AppError::DatabaseUnavailable)
        ));
    }
}
