pub mod media;
pub mod rating;
pub mod user;

pub use media::{
    CastMember, Credits, CrewMember, Genre, Keyword, KeywordList, MediaDetails, MediaItem, MediaRef,
    MediaType, Recommendation, Video, VideoList,
};
pub use rating::{NewRating, RatingAction, RatingValue, StoredRating};
pub use user::{AuthUser, UserProfile};
