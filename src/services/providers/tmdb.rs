/// TMDB (The Movie Database) provider
///
/// API Flow:
/// 1. Details: /{movie|tv}/{id}?append_to_response=credits,videos,keywords
/// 2. Genres: /genre/{movie|tv}/list
///
/// Both responses change rarely and are cached in Redis.
use crate::{
    cached,
    config::Config,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Genre, MediaDetails, MediaRef, MediaType},
    services::providers::MetadataProvider,
};
use reqwest::{Client as HttpClient, Response};
use serde::Deserialize;

const DETAILS_CACHE_TTL: u64 = 86_400; // 1 day
const GENRE_CACHE_TTL: u64 = 604_800; // 1 week

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    cache: Cache,
}

#[derive(Debug, Deserialize)]
struct GenreListResponse {
    genres: Vec<Genre>,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String, language: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            cache,
        }
    }

    pub fn from_config(cache: Cache, config: &Config) -> Self {
        Self::new(
            cache,
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            config.tmdb_language.clone(),
        )
    }

    fn details_url(&self, media: MediaRef) -> String {
        format!("{}/{}", self.api_url, media)
    }

    fn genres_url(&self, media_type: MediaType) -> String {
        format!("{}/genre/{}/list", self.api_url, media_type)
    }

    /// Turns a non-2xx response into an external API error
    async fn check_status(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "TMDB request failed");
        Err(AppError::ExternalApi(format!(
            "TMDB API returned status {}",
            status
        )))
    }

    fn parse_details(body: &str) -> AppResult<MediaDetails> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(error = %e, "Failed to deserialize TMDB details");
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn fetch_details(&self, media: MediaRef) -> AppResult<MediaDetails> {
        cached!(
            self.cache,
            CacheKey::MediaDetails(media, self.language.clone()),
            DETAILS_CACHE_TTL,
            async move {
                let response = self
                    .http_client
                    .get(self.details_url(media))
                    .query(&[
                        ("api_key", self.api_key.as_str()),
                        ("language", self.language.as_str()),
                        ("append_to_response", "credits,videos,keywords"),
                    ])
                    .send()
                    .await?;

                let body = Self::check_status(response).await?.text().await?;
                tracing::debug!(media = %media, response = %body, "Raw TMDB details response");

                let details = Self::parse_details(&body)?;

                tracing::info!(
                    media = %media,
                    cast = details.credits.cast.len(),
                    videos = details.videos.results.len(),
                    provider = "tmdb",
                    "Details fetched"
                );

                Ok::<_, AppError>(details)
            }
        )
    }

    async fn fetch_genres(&self, media_type: MediaType) -> AppResult<Vec<Genre>> {
        cached!(
            self.cache,
            CacheKey::Genres(media_type, self.language.clone()),
            GENRE_CACHE_TTL,
            async move {
                let response = self
                    .http_client
                    .get(self.genres_url(media_type))
                    .query(&[
                        ("api_key", self.api_key.as_str()),
                        ("language", self.language.as_str()),
                    ])
                    .send()
                    .await?;

                let list: GenreListResponse = Self::check_status(response).await?.json().await?;

                tracing::info!(
                    media_type = %media_type,
                    genres = list.genres.len(),
                    provider = "tmdb",
                    "Genres fetched"
                );

                Ok::<_, AppError>(list.genres)
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
