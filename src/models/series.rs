use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeriesType {
    Standard,
    Daily,
    Anime,
}

impl SeriesType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Daily => "daily",
            Self::Anime => "anime",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "daily" => Self::Daily,
            "anime" => Self::Anime,
            _ => Self::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NewSeasonMonitor {
    All,
    Future,
    Current,
    None,
}

impl NewSeasonMonitor {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Future => "future",
            Self::Current => "current",
            Self::None => "none",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "future" => Self::Future,
            "current" => Self::Current,
            "none" => Self::None,
            _ => Self::All,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: String,
    pub tvdb_id: Option<i64>,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub network: Option<String>,
    pub overview: Option<String>,
    pub status: Option<String>,
    pub series_type: SeriesType,
    pub monitor_new_seasons: NewSeasonMonitor,
    pub use_season_folder: bool,
    pub monitored: bool,
    pub quality_profile_id: Option<String>,
    pub root_folder: Option<String>,
    pub folder_path: Option<String>,
    pub poster_path: Option<String>,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub added_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub series_id: String,
    pub season_number: i32,
    pub monitored: bool,
    pub episode_count: i32,
    pub episode_file_count: i32,
}
