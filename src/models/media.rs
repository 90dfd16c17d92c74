use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    pub resolution_width: i64,
    pub resolution_height: i64,
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_channels: Option<f64>,
    pub audio_languages: Vec<String>,
    pub subtitle_languages: Vec<String>,
    pub dynamic_range: Option<String>,
    pub duration_secs: f64,
}

impl MediaInfo {
    #[must_use]
    pub fn resolution_str(&self) -> String {
        format!("{}x{}", self.resolution_width, self.resolution_height)
    }

    #[must_use]
    pub fn quality_str(&self) -> String {
        let h = self.resolution_height;
        if h >= 2100 {
            "2160p".to_string()
        } else if h >= 1000 {
            "1080p".to_string()
        } else if h >= 700 {
            "720p".to_string()
        } else if h >= 500 {
            "576p".to_string()
        } else {
            "480p".to_string()
        }
    }
}
