use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MinimumAvailability {
    Announced,
    InCinemas,
    Released,
    PreDb,
}

impl MinimumAvailability {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Announced => "announced",
            Self::InCinemas => "inCinemas",
            Self::Released => "released",
            Self::PreDb => "preDB",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "announced" => Self::Announced,
            "inCinemas" => Self::InCinemas,
            "preDB" => Self::PreDb,
            _ => Self::Released,
        }
    }
}

impl std::fmt::Display for MinimumAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Credits kept for related-media ranking, parsed from the JSON column
/// at the repository edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieCreditsInfo {
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub runtime: Option<i32>,
    pub overview: Option<String>,
    pub status: Option<String>,
    pub certification: Option<String>,
    pub collection_title: Option<String>,
    pub genres: Vec<String>,
    pub credits: MovieCreditsInfo,
    pub vote_average: Option<f64>,
    pub theatrical_release_date: Option<String>,
    pub digital_release_date: Option<String>,
    pub physical_release_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub minimum_availability: MinimumAvailability,
    #[serde(default = "default_true")]
    pub monitored: bool,
    pub has_file: bool,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub quality: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub release_group: Option<String>,
    pub is_proper: bool,
    pub is_repack: bool,
    pub quality_profile_id: Option<String>,
    pub root_folder: Option<String>,
    pub folder_path: Option<String>,
    pub tags: Vec<String>,
    pub added_at: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Movie {
    /// Whether the minimum-availability threshold has been met.
    ///
    /// Evaluated at search time, never at add time; a movie added before
    /// release becomes searchable on its own once the date passes.
    #[must_use]
    pub fn is_available(&self) -> bool {
        let today = Utc::now().date_naive();
        match self.minimum_availability {
            MinimumAvailability::Announced => true,
            MinimumAvailability::InCinemas => date_reached(&self.theatrical_release_date, today),
            MinimumAvailability::Released | MinimumAvailability::PreDb => {
                date_reached(&self.theatrical_release_date, today)
                    || date_reached(&self.physical_release_date, today)
            }
        }
    }
}

fn date_reached(date: &Option<String>, today: NaiveDate) -> bool {
    let Some(date) = date else { return false };

    parse_date(date).is_some_and(|d| d <= today)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| chrono::DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(availability: MinimumAvailability) -> Movie {
        Movie {
            id: "m1".to_string(),
            tmdb_id: Some(1),
            imdb_id: None,
            title: "Test Movie".to_string(),
            year: Some(2020),
            runtime: None,
            overview: None,
            status: None,
            certification: None,
            collection_title: None,
            genres: vec![],
            credits: MovieCreditsInfo::default(),
            vote_average: None,
            theatrical_release_date: None,
            digital_release_date: None,
            physical_release_date: None,
            poster_path: None,
            backdrop_path: None,
            minimum_availability: availability,
            monitored: true,
            has_file: false,
            file_path: None,
            file_size: None,
            quality: None,
            video_codec: None,
            audio_codec: None,
            release_group: None,
            is_proper: false,
            is_repack: false,
            quality_profile_id: None,
            root_folder: None,
            folder_path: None,
            tags: vec![],
            added_at: None,
        }
    }

    #[test]
    fn announced_is_always_available() {
        assert!(movie(MinimumAvailability::Announced).is_available());
    }

    #[test]
    fn released_requires_a_passed_date() {
        let mut m = movie(MinimumAvailability::Released);
        assert!(!m.is_available());

        m.theatrical_release_date = Some("2020-01-01".to_string());
        assert!(m.is_available());
    }

    #[test]
    fn released_accepts_physical_date() {
        let mut m = movie(MinimumAvailability::Released);
        m.physical_release_date = Some("2020-06-01".to_string());
        assert!(m.is_available());
    }

    #[test]
    fn in_cinemas_ignores_future_dates() {
        let mut m = movie(MinimumAvailability::InCinemas);
        m.theatrical_release_date = Some("2999-01-01".to_string());
        assert!(!m.is_available());
    }

    #[test]
    fn availability_roundtrip() {
        for s in ["announced", "inCinemas", "released", "preDB"] {
            assert_eq!(MinimumAvailability::parse(s).as_str(), s);
        }
    }
}
