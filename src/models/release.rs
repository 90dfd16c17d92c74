use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Torrent,
    Usenet,
}

impl Protocol {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Torrent => "torrent",
            Self::Usenet => "usenet",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("usenet") {
            Self::Usenet
        } else {
            Self::Torrent
        }
    }
}

/// A candidate release as reported by an indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub title: String,

    pub guid: String,

    pub download_url: String,

    pub size: Option<i64>,

    pub seeders: Option<u32>,

    pub leechers: Option<u32>,

    pub indexer_id: String,

    pub indexer: String,

    pub protocol: Protocol,

    pub publish_date: Option<String>,
}

/// The structured fields extracted from a release title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRelease {
    pub original_title: String,

    /// The normalized words of the title portion, in order.
    pub title_words: Vec<String>,

    pub year: Option<i32>,

    pub season: Option<i32>,

    /// Empty for movies and season packs; one or more entries for episodes.
    pub episodes: Vec<i32>,

    /// `Sxx` with no episode component.
    pub is_season_pack: bool,

    /// Composite quality label, e.g. `WEBDL-1080p` or `CAM`.
    pub quality: String,

    pub resolution: Option<u16>,

    pub video_codec: Option<String>,

    pub audio_codec: Option<String>,

    pub group: Option<String>,

    pub is_proper: bool,

    pub is_repack: bool,
}

impl ParsedRelease {
    #[must_use]
    pub fn is_tv_shaped(&self) -> bool {
        self.season.is_some() || !self.episodes.is_empty() || self.is_season_pack
    }

    #[must_use]
    pub fn first_episode(&self) -> Option<i32> {
        self.episodes.first().copied()
    }
}
