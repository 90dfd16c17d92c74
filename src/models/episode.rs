use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub series_id: String,
    pub season_number: i32,
    pub episode_number: i32,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
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
    pub absolute_number: Option<i32>,
}

impl Episode {
    /// An episode is considered aired once its air date is in the past.
    /// Episodes without an air date are treated as unaired.
    #[must_use]
    pub fn has_aired(&self) -> bool {
        let Some(air_date) = &self.air_date else {
            return false;
        };

        chrono::NaiveDate::parse_from_str(air_date, "%Y-%m-%d")
            .map(|d| d <= chrono::Utc::now().date_naive())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(air_date: Option<&str>) -> Episode {
        Episode {
            id: "e1".to_string(),
            series_id: "s1".to_string(),
            season_number: 1,
            episode_number: 1,
            title: None,
            overview: None,
            air_date: air_date.map(str::to_string),
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
            absolute_number: None,
        }
    }

    #[test]
    fn aired_in_the_past() {
        assert!(episode(Some("2020-01-01")).has_aired());
    }

    #[test]
    fn unaired_without_date() {
        assert!(!episode(None).has_aired());
        assert!(!episode(Some("2999-01-01")).has_aired());
    }
}
