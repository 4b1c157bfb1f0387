pub mod providers;
pub mod ratings;

pub use providers::{MetadataProvider, TmdbProvider};
pub use ratings::{PgRatingRepository, RatingRepository};
