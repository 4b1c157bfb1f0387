/// Read-through caching over [`Cache`](crate::db::Cache).
///
/// Returns the cached value when present. Otherwise awaits `$block`, queues
/// the computed value for a background write with `$ttl` seconds and
/// returns it. A failing cache read is logged and treated as a miss, so an
/// unreachable Redis only costs the upstream call.
///
/// # Example
/// ```rust,ignore
/// async fn fetch_genres(&self, media_type: MediaType) -> AppResult<Vec<Genre>> {
///     cached!(
///         self.cache,
///         CacheKey::Genres(media_type, self.language.clone()),
///         GENRE_CACHE_TTL,
///         async move {
///             let response = self.http_client.get(self.genres_url(media_type)).send().await?;
///             let list: GenreListResponse = response.json().await?;
///             Ok::<_, AppError>(list.genres)
///         }
///     )
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let hit = match $cache.get_from_cache(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        };

        match hit {
            Some(cached) => Ok(cached),
            None => match $block.await {
                Ok(value) => {
                    $cache.set_in_background(&key, &value, $ttl);
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
