use futures::future::BoxFuture;
use sqlx::{pool::PoolConnection, postgres::PgRow, FromRow, Postgres, Transaction};
use std::time::{Duration, Instant};

use super::Database;
use crate::error::{AppError, AppResult};

/// Characters of SQL kept when a statement is logged
const PREVIEW_LEN: usize = 50;

/// Attempts made by [`Database::transaction`] before a deadlock is surfaced
const MAX_TRANSACTION_ATTEMPTS: u32 = 3;

/// Base delay between deadlock retries
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Rows returned by the facade
///
/// An empty result is the fallback answer whenever the store is unreachable
/// or a statement fails.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub rows: Vec<T>,
    pub row_count: u64,
}

impl<T> QueryResult<T> {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            row_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_first(self) -> Option<T> {
        self.rows.into_iter().next()
    }
}

impl<T> Default for QueryResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A positional statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    OptFloat(Option<f64>),
    Text(String),
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<Option<f64>> for SqlParam {
    fn from(v: Option<f64>) -> Self {
        SqlParam::OptFloat(v)
    }
}

/// Binds positional parameters onto a `query` or `query_as` builder
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for param in $params {
            query = match param {
                SqlParam::Int(v) => query.bind(*v),
                SqlParam::OptFloat(v) => query.bind(*v),
                SqlParam::Text(v) => query.bind(v.as_str()),
            };
        }
        query
    }};
}

/// Delay before retrying a failed transaction, or `None` to give up
fn deadlock_retry_delay(error: &AppError, attempt: u32) -> Option<Duration> {
    (error.is_deadlock() && attempt < MAX_TRANSACTION_ATTEMPTS).then(|| RETRY_BACKOFF * attempt)
}

/// First characters of a statement, for logs
pub fn preview(sql: &str) -> String {
    let compact = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    let head: String = compact.chars().take(PREVIEW_LEN).collect();
    format!("{}...", head)
}

impl Database {
    /// Runs a statement and maps its rows
    ///
    /// Store errors are swallowed: when not connected, or when the statement
    /// fails, the error is logged and an empty result is returned.
    pub async fn query<T>(&self, sql: &str, params: &[SqlParam]) -> QueryResult<T>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let Some(pool) = self.pool.as_ref().filter(|_| self.is_connected()) else {
            tracing::warn!(query = %preview(sql), "Database not available, skipping query");
            return QueryResult::empty();
        };

        let start = Instant::now();
        match bind_params!(sqlx::query_as::<_, T>(sql), params)
            .fetch_all(pool)
            .await
        {
            Ok(rows) => {
                let row_count = rows.len() as u64;
                if self.mode.is_development() {
                    tracing::info!(
                        query = %preview(sql),
                        duration_ms = start.elapsed().as_millis() as u64,
                        rows = row_count,
                        "Executed query"
                    );
                }
                QueryResult { rows, row_count }
            }
            Err(e) => {
                tracing::error!(query = %preview(sql), error = %e, "Database query error");
                QueryResult::empty()
            }
        }
    }

    /// Runs a statement without a result set, returning affected rows
    ///
    /// Same fallback policy as [`Database::query`]; 0 on fallback.
    pub async fn execute(&self, sql: &str, params: &[SqlParam]) -> u64 {
        let Some(pool) = self.pool.as_ref().filter(|_| self.is_connected()) else {
            tracing::warn!(query = %preview(sql), "Database not available, skipping statement");
            return 0;
        };

        let start = Instant::now();
        match bind_params!(sqlx::query(sql), params).execute(pool).await {
            Ok(done) => {
                if self.mode.is_development() {
                    tracing::info!(
                        query = %preview(sql),
                        duration_ms = start.elapsed().as_millis() as u64,
                        rows = done.rows_affected(),
                        "Executed statement"
                    );
                }
                done.rows_affected()
            }
            Err(e) => {
                tracing::error!(query = %preview(sql), error = %e, "Database statement error");
                0
            }
        }
    }

    /// Checks out a dedicated connection
    ///
    /// The connection returns to the pool when dropped. Fails with
    /// [`AppError::DatabaseUnavailable`] when not connected or when the
    /// acquire times out.
    pub async fn get_client(&self) -> AppResult<PoolConnection<Postgres>> {
        let pool = self
            .pool
            .as_ref()
            .filter(|_| self.is_connected())
            .ok_or(AppError::DatabaseUnavailable)?;

        pool.acquire().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to acquire database connection");
            AppError::DatabaseUnavailable
        })
    }

    /// Starts a transaction on a dedicated connection
    ///
    /// Dropping the transaction without committing rolls it back and
    /// releases the connection.
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        let pool = self
            .pool
            .as_ref()
            .filter(|_| self.is_connected())
            .ok_or(AppError::DatabaseUnavailable)?;

        pool.begin().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to begin transaction");
            AppError::DatabaseUnavailable
        })
    }

    /// Runs `op` inside a transaction, retrying the whole unit on deadlock
    ///
    /// Commits when `op` succeeds and rolls back otherwise.
    pub async fn transaction<T, F>(&self, mut op: F) -> AppResult<T>
    where
        T: Send,
        F: for<'c> FnMut(&'c mut Transaction<'static, Postgres>) -> BoxFuture<'c, AppResult<T>>
            + Send,
    {
        let mut attempt = 1;
        loop {
            let mut tx = self.begin().await?;
            let outcome = match op(&mut tx).await {
                Ok(value) => tx.commit().await.map(|_| value).map_err(AppError::from),
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::error!(error = %rollback, "Transaction rollback failed");
                    }
                    Err(e)
                }
            };

            match outcome {
                Err(e) => match deadlock_retry_delay(&e, attempt) {
                    Some(delay) => {
                        tracing::warn!(attempt, "Deadlock detected, retrying transaction");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
                ok => return ok,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeMode;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct Deadlock;

    impl std::fmt::Display for Deadlock {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("deadlock detected")
        }
    }

    impl std::error::Error for Deadlock {}

    impl sqlx::error::DatabaseError for Deadlock {
        fn message(&self) -> &str {
            "deadlock detected"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("40P01"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn deadlock() -> AppError {
        AppError::Database(sqlx::Error::Database(Box::new(Deadlock)))
    }

    #[derive(Debug, sqlx::FromRow)]
    struct CountRow {
        #[allow(dead_code)]
        count: i64,
    }

    #[test]
    fn test_preview_truncates_and_compacts() {
        let sql = "SELECT COUNT(*)::int8 AS count\n    FROM user_ratings\n    WHERE user_id = $1 AND something_else = $2";
        let p = preview(sql);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_LEN + 3);
        assert!(p.starts_with("SELECT COUNT(*)::int8 AS count FROM user_ratings"));
    }

    #[test]
    fn test_preview_short_statement() {
        assert_eq!(preview("SELECT 1"), "SELECT 1...");
    }

    #[tokio::test]
    async fn test_query_falls_back_when_disconnected() {
        let db = Database::disconnected(RuntimeMode::Test);
        let result: QueryResult<CountRow> = db
            .query("SELECT COUNT(*) AS count FROM user_ratings WHERE user_id = $1", &[1i64.into()])
            .await;

        assert!(result.is_empty());
        assert_eq!(result.row_count, 0);
    }

    #[tokio::test]
    async fn test_execute_falls_back_when_disconnected() {
        let db = Database::disconnected(RuntimeMode::Test);
        assert_eq!(db.execute("DELETE FROM user_ratings", &[]).await, 0);
    }

    #[tokio::test]
    async fn test_get_client_fails_when_disconnected() {
        let db = Database::disconnected(RuntimeMode::Test);
        assert!(matches!(
            db.get_client().await,
            Err(AppError::DatabaseUnavailable)
        ));
        assert!(matches!(db.begin().await, Err(AppError::DatabaseUnavailable)));
    }

    #[tokio::test]
    async fn test_transaction_fails_fast_when_disconnected() {
        let db = Database::disconnected(RuntimeMode::Test);
        let result = db
            .transaction(|_tx| Box::pin(async { Ok::<_, AppError>(1u32) }))
            .await;
        assert!(matches!(result, Err(AppError::DatabaseUnavailable)));
    }

    #[test]
    fn test_deadlock_is_detected() {
        assert!(deadlock().is_deadlock());
    }

    #[test]
    fn test_deadlock_retries_with_growing_backoff_then_gives_up() {
        let error = deadlock();
        assert_eq!(deadlock_retry_delay(&error, 1), Some(Duration::from_millis(100)));
        assert_eq!(deadlock_retry_delay(&error, 2), Some(Duration::from_millis(200)));
        assert_eq!(deadlock_retry_delay(&error, MAX_TRANSACTION_ATTEMPTS), None);
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        assert_eq!(deadlock_retry_delay(&AppError::DatabaseUnavailable, 1), None);
        assert_eq!(
            deadlock_retry_delay(&AppError::Database(sqlx::Error::RowNotFound), 1),
            None
        );
    }
}
