use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    Queued,
    Downloading,
    Importing,
    Completed,
    Failed,
    Cancelled,
}

impl DownloadState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Importing => "importing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => Self::Queued,
            "downloading" => Self::Downloading,
            "importing" => Self::Importing,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            _ => Self::Failed,
        }
    }

    /// Queued, downloading and importing downloads hold the per-media
    /// single-active-download slot.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Downloading | Self::Importing)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for DownloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: String,
    pub movie_id: Option<String>,
    pub series_id: Option<String>,
    pub season_number: Option<i32>,
    pub episode_number: Option<i32>,
    pub title: String,
    pub download_url: String,
    pub size: Option<i64>,
    pub indexer: Option<String>,
    pub quality: Option<String>,
    pub status: DownloadState,
    pub progress: f64,
    pub download_client_id: Option<String>,
    pub client_job_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_states() {
        assert!(DownloadState::Queued.is_active());
        assert!(DownloadState::Downloading.is_active());
        assert!(DownloadState::Importing.is_active());
        assert!(!DownloadState::Completed.is_active());
        assert!(!DownloadState::Cancelled.is_active());
    }

    #[test]
    fn state_roundtrip() {
        for s in [
            "queued",
            "downloading",
            "importing",
            "completed",
            "failed",
            "cancelled",
        ] {
            assert_eq!(DownloadState::parse(s).as_str(), s);
        }
    }
}
