/// Movie metadata provider abstraction
///
/// Recommendation cards fetch extended detail (credits, videos, keywords)
/// and genre names on demand. Providers hide the upstream API behind this
/// trait so handlers and cards can be exercised without the network.
use crate::{
    error::AppResult,
    models::{Genre, MediaDetails, MediaRef, MediaType},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch credits, videos and keywords for one title
    async fn fetch_details(&self, media: MediaRef) -> AppResult<MediaDetails>;

    /// Fetch the genre id → name table for a media type
    async fn fetch_genres(&self, media_type: MediaType) -> AppResult<Vec<Genre>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
