//! Recommendation card view model
//!
//! Holds everything a client needs to render one recommendation: title,
//! match badge, genre names, rating controls and, once expanded, cast, crew
//! and the trailer link. Rating actions are relayed to the owner through the
//! `on_rate` callback.

pub mod details;
pub mod trailer;

use serde::Serialize;

use crate::models::{
    CastMember, Credits, CrewMember, Genre, MediaDetails, MediaRef, MediaType, RatingAction,
    RatingValue, Recommendation,
};
use crate::services::providers::MetadataProvider;

pub use details::{DetailCache, DetailState};
pub use trailer::{select_trailer, trailer_link, TrailerLink, TrailerPreference};

/// Cast members shown on an expanded card
const CAST_LIMIT: usize = 6;

/// Crew jobs credited as writing
const WRITER_JOBS: [&str; 5] = ["Writer", "Screenplay", "Story", "Novel", "Creator"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Excellent,
    Great,
    Good,
    Fair,
}

impl MatchTier {
    pub fn for_score(score: f64) -> Self {
        if score >= 90.0 {
            MatchTier::Excellent
        } else if score >= 80.0 {
            MatchTier::Great
        } else if score >= 70.0 {
            MatchTier::Good
        } else {
            MatchTier::Fair
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchBadge {
    pub percent: u8,
    pub tier: MatchTier,
}

impl MatchBadge {
    pub fn new(score: f64) -> Self {
        let score = if score.is_finite() { score.clamp(0.0, 100.0) } else { 0.0 };
        Self {
            percent: score.round() as u8,
            tier: MatchTier::for_score(score),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CastAndCrew {
    pub cast: Vec<CastMember>,
    pub directors: Vec<CrewMember>,
    pub writers: Vec<CrewMember>,
}

fn crew_with_job(crew: &[CrewMember], pred: impl Fn(&str) -> bool) -> Vec<CrewMember> {
    crew.iter()
        .filter(|m| m.job.as_deref().is_some_and(&pred))
        .cloned()
        .collect()
}

impl CastAndCrew {
    pub fn from_credits(credits: &Credits) -> Self {
        Self {
            cast: credits.cast.iter().take(CAST_LIMIT).cloned().collect(),
            directors: crew_with_job(&credits.crew, |job| job == "Director"),
            writers: crew_with_job(&credits.crew, |job| {
                WRITER_JOBS.iter().any(|w| *w == job) || job.to_lowercase().contains("writ")
            }),
        }
    }
}

/// State of the rating controls
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingControls {
    /// Slider position, 0-10
    pub slider: u8,
    pub user_rating: Option<RatingValue>,
    pub not_interested: bool,
    pub skipped: bool,
    pub has_any_rating: bool,
}

/// Expanded section of the card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsView {
    pub runtime: Option<u32>,
    pub number_of_seasons: Option<u32>,
    #[serde(flatten)]
    pub credits: CastAndCrew,
    pub keywords: Vec<String>,
    pub trailer: TrailerLink,
}

/// Serializable snapshot of a card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub media: MediaRef,
    pub title: String,
    pub release_year: Option<i32>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: f64,
    pub original_language: Option<String>,
    pub genres: String,
    pub match_badge: Option<MatchBadge>,
    pub reasons: Vec<String>,
    pub rating: RatingControls,
    pub details: Option<DetailsView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardOptions {
    pub show_reasons: bool,
    pub show_match_score: bool,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            show_reasons: true,
            show_match_score: true,
        }
    }
}

pub struct RecommendationCard<F>
where
    F: FnMut(RatingValue, MediaType),
{
    recommendation: Recommendation,
    genres: Vec<Genre>,
    user_rating: Option<RatingValue>,
    slider: u8,
    on_rate: F,
    options: CardOptions,
    preference: TrailerPreference,
    details: DetailCache,
    details_open: bool,
}

impl<F> RecommendationCard<F>
where
    F: FnMut(RatingValue, MediaType),
{
    pub fn new(
        recommendation: Recommendation,
        genres: Vec<Genre>,
        user_rating: Option<RatingValue>,
        on_rate: F,
    ) -> Self {
        let mut card = Self {
            recommendation,
            genres,
            user_rating: None,
            slider: 0,
            on_rate,
            options: CardOptions::default(),
            preference: TrailerPreference::default(),
            details: DetailCache::new(),
            details_open: false,
        };
        card.sync_user_rating(user_rating);
        card
    }

    pub fn with_options(mut self, options: CardOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_trailer_preference(mut self, preference: TrailerPreference) -> Self {
        self.preference = preference;
        self
    }

    pub fn media(&self) -> MediaRef {
        self.recommendation.movie.media_ref()
    }

    pub fn title(&self) -> &str {
        self.recommendation.movie.display_title()
    }

    pub fn match_badge(&self) -> MatchBadge {
        MatchBadge::new(self.recommendation.match_score)
    }

    /// Names of the item's genres in the item's order, unknown ids skipped
    pub fn genre_names(&self) -> String {
        self.recommendation
            .movie
            .genre_ids
            .iter()
            .filter_map(|id| self.genres.iter().find(|g| g.id == *id))
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Updates the externally owned rating; the slider follows numeric scores
    pub fn sync_user_rating(&mut self, user_rating: Option<RatingValue>) {
        self.user_rating = user_rating;
        self.slider = match user_rating {
            Some(RatingValue::Score(score)) => score.clamp(0.0, 10.0).round() as u8,
            _ => 0,
        };
    }

    pub fn slider(&self) -> u8 {
        self.slider
    }

    /// Moves the slider without committing a rating
    pub fn slide(&mut self, value: u8) {
        self.slider = value.min(10);
    }

    /// Commits the slider position as the rating
    pub fn commit_slider(&mut self) {
        self.rate(RatingValue::Score(f64::from(self.slider)));
    }

    /// Relays a rating action to the owner
    pub fn rate(&mut self, value: RatingValue) {
        let media_type = self.media().media_type;
        (self.on_rate)(value, media_type);
    }

    pub fn mark_not_watched(&mut self) {
        self.rate(RatingValue::Action(RatingAction::NotWatched));
    }

    pub fn mark_not_interested(&mut self) {
        self.rate(RatingValue::Action(RatingAction::NotInterested));
    }

    pub fn skip(&mut self) {
        self.rate(RatingValue::Action(RatingAction::Skip));
    }

    pub fn rating_controls(&self) -> RatingControls {
        RatingControls {
            slider: self.slider,
            user_rating: self.user_rating,
            not_interested: self.user_rating
                == Some(RatingValue::Action(RatingAction::NotInterested)),
            skipped: self.user_rating == Some(RatingValue::Action(RatingAction::Skip)),
            has_any_rating: self.user_rating.is_some(),
        }
    }

    /// Expands the card, fetching extended metadata on first use
    ///
    /// The card opens even when the fetch fails; the failure is retried on
    /// the next expansion.
    pub async fn open_details(&mut self, provider: &dyn MetadataProvider) -> DetailState {
        let state = self.details.load(self.media(), provider).await;
        self.details_open = true;
        state
    }

    pub fn close_details(&mut self) {
        self.details_open = false;
    }

    pub fn is_details_open(&self) -> bool {
        self.details_open
    }

    /// Resolves the trailer link, loading details when needed
    pub async fn request_trailer(&mut self, provider: &dyn MetadataProvider) -> TrailerLink {
        let media = self.media();
        let state = self.details.load(media, provider).await;
        trailer_link(media, state.details(), &self.preference)
    }

    fn details_view(&self, details: &MediaDetails) -> DetailsView {
        DetailsView {
            runtime: details.runtime,
            number_of_seasons: details.number_of_seasons,
            credits: CastAndCrew::from_credits(&details.credits),
            keywords: details
                .keywords
                .keywords
                .iter()
                .map(|k| k.name.clone())
                .collect(),
            trailer: trailer_link(self.media(), Some(details), &self.preference),
        }
    }

    pub fn view(&self) -> CardView {
        let movie = &self.recommendation.movie;
        let details = if self.details_open {
            self.details
                .state(self.media())
                .details()
                .map(|d| self.details_view(d))
        } else {
            None
        };

        CardView {
            media: self.media(),
            title: self.title().to_string(),
            release_year: movie.release_year(),
            overview: movie.overview.clone(),
            poster_path: movie.poster_path.clone(),
            vote_average: (movie.vote_average * 10.0).round() / 10.0,
            original_language: movie.original_language.as_ref().map(|l| l.to_uppercase()),
            genres: self.genre_names(),
            match_badge: self.options.show_match_score.then(|| self.match_badge()),
            reasons: if self.options.show_reasons {
                self.recommendation.reasons.clone()
            } else {
                Vec::new()
            },
            rating: self.rating_controls(),
            details,
        }
    }
}
