use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::models::{MediaDetails, MediaRef};
use crate::services::providers::MetadataProvider;

/// Fetch state of one title's extended metadata
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Unfetched,
    Loading,
    Loaded(Arc<MediaDetails>),
    /// The last fetch failed; the next request retries
    Failed(String),
}

impl DetailState {
    pub fn details(&self) -> Option<&MediaDetails> {
        match self {
            DetailState::Loaded(details) => Some(details),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DetailState::Loading)
    }
}

/// Clears a `Loading` entry whose fetch was dropped before it finished
struct LoadingGuard<'a> {
    cache: &'a DetailCache,
    media: MediaRef,
    settled: bool,
}

impl LoadingGuard<'_> {
    fn settle(mut self, state: DetailState) {
        self.cache.entries().insert(self.media, state);
        self.settled = true;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut entries = self.cache.entries();
        if entries.get(&self.media).is_some_and(DetailState::is_loading) {
            entries.remove(&self.media);
        }
    }
}

/// Per-card cache of detail fetches keyed by media identity
///
/// A title in `Loading` is never fetched twice; concurrent callers get the
/// `Loading` state back instead of starting another request.
#[derive(Debug, Clone, Default)]
pub struct DetailCache {
    entries: Arc<Mutex<HashMap<MediaRef, DetailState>>>,
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<MediaRef, DetailState>> {
        // Entries are replaced whole, a panic mid-update can't leave one half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self, media: MediaRef) -> DetailState {
        self.entries()
            .get(&media)
            .cloned()
            .unwrap_or(DetailState::Unfetched)
    }

    /// Marks `media` as loading, or returns the state that makes a fetch unnecessary
    fn begin(&self, media: MediaRef) -> Option<DetailState> {
        let mut entries = self.entries();
        match entries.get(&media) {
            Some(state @ (DetailState::Loaded(_) | DetailState::Loading)) => Some(state.clone()),
            _ => {
                entries.insert(media, DetailState::Loading);
                None
            }
        }
    }

    /// Returns cached details, fetching them first when unfetched or failed
    pub async fn load(&self, media: MediaRef, provider: &dyn MetadataProvider) -> DetailState {
        if let Some(state) = self.begin(media) {
            return state;
        }
        let guard = LoadingGuard {
            cache: self,
            media,
            settled: false,
        };

        let state = match provider.fetch_details(media).await {
            Ok(details) => DetailState::Loaded(Arc::new(details)),
            Err(e) => {
                tracing::warn!(media = %media, provider = provider.name(), error = %e, "Error loading details");
                DetailState::Failed(e.to_string())
            }
        };

        guard.settle(state.clone());
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::models::{Genre, MediaType};
    use crate::services::providers::MockMetadataProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Provider that takes a while to answer, counting calls
    struct SlowProvider {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MetadataProvider for SlowProvider {
        async fn fetch_details(&self, media: MediaRef) -> AppResult<MediaDetails> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(MediaDetails {
                id: media.id,
                ..Default::default()
            })
        }

        async fn fetch_genres(&self, _media_type: MediaType) -> AppResult<Vec<Genre>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_loads_once_then_serves_cache() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_fetch_details()
            .times(1)
            .returning(|media| Ok(MediaDetails { id: media.id, ..Default::default() }));
        provider.expect_name().return_const("mock");

        let cache = DetailCache::new();
        let media = MediaRef::movie(27205);
        assert_eq!(cache.state(media), DetailState::Unfetched);

        let first = cache.load(media, &provider).await;
        let second = cache.load(media, &provider).await;
        assert_eq!(first.details().map(|d| d.id), Some(27205));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_retried() {
        let mut provider = MockMetadataProvider::new();
        let mut seq = mockall::Sequence::new();
        provider
            .expect_fetch_details()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::ExternalApi("TMDB API returned status 503".to_string())));
        provider
            .expect_fetch_details()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|media| Ok(MediaDetails { id: media.id, ..Default::default() }));
        provider.expect_name().return_const("mock");

        let cache = DetailCache::new();
        let media = MediaRef::tv(1399);

        assert!(matches!(cache.load(media, &provider).await, DetailState::Failed(_)));
        assert!(matches!(cache.state(media), DetailState::Failed(_)));
        assert!(matches!(cache.load(media, &provider).await, DetailState::Loaded(_)));
    }

    #[tokio::test]
    async fn test_concurrent_loads_fetch_once() {
        let provider = SlowProvider {
            calls: AtomicUsize::new(0),
        };
        let cache = DetailCache::new();
        let media = MediaRef::movie(603);

        let (a, b) = tokio::join!(cache.load(media, &provider), cache.load(media, &provider));

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(a.is_loading() != b.is_loading());
        assert!(matches!(cache.state(media), DetailState::Loaded(_)));
    }

    #[tokio::test]
    async fn test_entries_are_per_title() {
        let provider = SlowProvider {
            calls: AtomicUsize::new(0),
        };
        let cache = DetailCache::new();

        cache.load(MediaRef::movie(1), &provider).await;
        cache.load(MediaRef::tv(1), &provider).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_load_can_be_retried() {
        let provider = SlowProvider {
            calls: AtomicUsize::new(0),
        };
        let cache = DetailCache::new();
        let media = MediaRef::movie(155);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(5), cache.load(media, &provider)).await;
        assert!(cancelled.is_err());
        assert_eq!(cache.state(media), DetailState::Unfetched);

        assert!(matches!(cache.load(media, &provider).await, DetailState::Loaded(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
