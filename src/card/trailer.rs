use serde::Serialize;

use crate::config::Config;
use crate::models::{MediaDetails, MediaRef, Video};

const YOUTUBE_SITE: &str = "YouTube";
const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Which videos count as localized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailerPreference {
    /// ISO 639-1 code, e.g. "tr"
    pub language: String,
    /// Lowercase words that mark a video name as localized
    pub name_hints: Vec<String>,
}

impl Default for TrailerPreference {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            name_hints: Vec::new(),
        }
    }
}

impl TrailerPreference {
    pub fn new(language: impl Into<String>, name_hints: Vec<String>) -> Self {
        Self {
            language: language.into(),
            name_hints: name_hints.into_iter().map(|h| h.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.trailer_language.clone(),
            config.trailer_name_hints.clone(),
        )
    }

    fn is_localized(&self, video: &Video) -> bool {
        let language_matches = video
            .iso_639_1
            .as_deref()
            .is_some_and(|code| code.eq_ignore_ascii_case(&self.language));
        if language_matches {
            return true;
        }

        let name = video.name.to_lowercase();
        self.name_hints.iter().any(|hint| name.contains(hint.as_str()))
    }
}

/// Where the trailer button leads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrailerLink {
    #[serde(rename = "youtube")]
    YouTube { key: String, url: String },
    /// No playable video; the title's page on the metadata site
    WebPage { url: String },
}

impl TrailerLink {
    pub fn url(&self) -> &str {
        match self {
            TrailerLink::YouTube { url, .. } | TrailerLink::WebPage { url } => url,
        }
    }
}

/// Best playable video: localized trailer, any trailer, teaser, then clip
pub fn select_trailer<'a>(videos: &'a [Video], preference: &TrailerPreference) -> Option<&'a Video> {
    let youtube = || videos.iter().filter(|v| v.site == YOUTUBE_SITE);

    youtube()
        .find(|v| v.video_type == "Trailer" && preference.is_localized(v))
        .or_else(|| youtube().find(|v| v.video_type == "Trailer"))
        .or_else(|| youtube().find(|v| v.video_type == "Teaser"))
        .or_else(|| youtube().find(|v| v.video_type == "Clip"))
}

/// Resolves the trailer link, falling back to the web page when details are
/// missing or carry no usable video
pub fn trailer_link(
    media: MediaRef,
    details: Option<&MediaDetails>,
    preference: &TrailerPreference,
) -> TrailerLink {
    match details.and_then(|d| select_trailer(&d.videos.results, preference)) {
        Some(video) => TrailerLink::YouTube {
            key: video.key.clone(),
            url: format!("{}{}", YOUTUBE_WATCH_URL, video.key),
        },
        None => TrailerLink::WebPage {
            url: media.web_url(),
        },
    }
}
