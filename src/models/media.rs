use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Web page used when no playable trailer exists
const TMDB_WEB_URL: &str = "https://www.themoviedb.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(format!("unknown media type '{}'", other)),
        }
    }
}

/// Identity of a title in the metadata service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef {
    pub media_type: MediaType,
    pub id: u64,
}

impl MediaRef {
    pub fn movie(id: u64) -> Self {
        Self {
            media_type: MediaType::Movie,
            id,
        }
    }

    pub fn tv(id: u64) -> Self {
        Self {
            media_type: MediaType::Tv,
            id,
        }
    }

    /// Public TMDB page for the title
    pub fn web_url(&self) -> String {
        format!("{}/{}", TMDB_WEB_URL, self)
    }
}

impl Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.media_type, self.id)
    }
}

/// A movie or TV show as returned by TMDB list endpoints
///
/// Movies carry `title`/`release_date`, shows carry `name`/`first_air_date`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: u64,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl MediaItem {
    /// Explicit media type, else TV when the item carries a show name
    pub fn kind(&self) -> MediaType {
        match self.media_type {
            Some(media_type) => media_type,
            None if self.name.is_some() => MediaType::Tv,
            None => MediaType::Movie,
        }
    }

    pub fn media_ref(&self) -> MediaRef {
        MediaRef {
            media_type: self.kind(),
            id: self.id,
        }
    }

    pub fn display_title(&self) -> &str {
        let (primary, original) = match self.kind() {
            MediaType::Tv => (&self.name, &self.original_name),
            MediaType::Movie => (&self.title, &self.original_title),
        };
        primary
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(original.as_deref())
            .unwrap_or("")
    }

    pub fn release_date(&self) -> Option<&str> {
        match self.kind() {
            MediaType::Tv => self.first_air_date.as_deref(),
            MediaType::Movie => self.release_date.as_deref(),
        }
        .filter(|d| !d.is_empty())
    }

    /// Year prefix of the release date (`YYYY-MM-DD`)
    pub fn release_year(&self) -> Option<i32> {
        self.release_date()
            .and_then(|d| d.split('-').next())
            .and_then(|y| y.parse().ok())
    }
}

/// A precomputed recommendation handed to the card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub movie: MediaItem,
    /// Predicted relevance, 0-100
    pub match_score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: u64,
    pub name: String,
}

// ============================================================================
// TMDB detail types (append_to_response=credits,videos,keywords)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaDetails {
    pub id: u64,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
    #[serde(default)]
    pub credits: Credits,
    #[serde(default)]
    pub videos: VideoList,
    #[serde(default)]
    pub keywords: KeywordList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoList {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub iso_639_1: Option<String>,
}

/// Movies nest keywords under `keywords`, shows under `results`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordList {
    #[serde(default, alias = "results")]
    pub keywords: Vec<Keyword>,
}
