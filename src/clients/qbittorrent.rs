use crate::clients::traits::{AddResult, ClientJob, DownloadClient, JobState};
use crate::models::release::Protocol;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct QbitConfig {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub category: Option<String>,
    pub timeout: std::time::Duration,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum TorrentState {
    Error,
    MissingFiles,
    Uploading,
    PausedUP,
    QueuedUP,
    StalledUP,
    #[serde(rename = "checkingUP")]
    CheckingUP,
    #[serde(rename = "forcedUP")]
    ForcedUP,
    #[serde(rename = "stoppedUP")]
    StoppedUP,
    #[serde(rename = "stoppedDL")]
    StoppedDL,
    #[serde(rename = "allocating")]
    Allocating,
    Downloading,
    MetaDL,
    PausedDL,
    QueuedDL,
    StalledDL,
    CheckingDL,
    ForcedDL,
    CheckingResumeData,
    Moving,
    Unknown,
}

impl TorrentState {
    fn as_job_state(&self) -> JobState {
        match self {
            Self::Error | Self::MissingFiles => JobState::Error,
            Self::Uploading
            | Self::PausedUP
            | Self::QueuedUP
            | Self::StalledUP
            | Self::CheckingUP
            | Self::ForcedUP
            | Self::StoppedUP => JobState::Completed,
            Self::QueuedDL | Self::StoppedDL | Self::PausedDL => JobState::Queued,
            Self::StalledDL | Self::MetaDL => JobState::Stalled,
            _ => JobState::Downloading,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfo {
    pub hash: String,
    pub name: String,
    pub state: TorrentState,
    pub progress: f64,
    pub size: i64,
    pub downloaded: i64,
    pub num_seeds: i32,
    pub eta: i64,
    pub save_path: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub content_path: String,
    #[serde(default)]
    pub added_on: i64,
}

/// qBittorrent WebUI API client. Sessions are cookie-based; `ensure_auth`
/// re-logs-in transparently when the session expires.
#[derive(Debug, Clone)]
pub struct QbitClient {
    client: Client,
    config: QbitConfig,
}

impl QbitClient {
    #[must_use]
    pub fn new(config: QbitConfig) -> Self {
        Self {
            client: Client::builder()
                .cookie_store(true)
                .timeout(config.timeout)
                .build()
                .expect("Failed to build HTTP client"),
            config,
        }
    }

    async fn login(&self) -> Result<()> {
        let url = format!("{}/api/v2/auth/login", self.config.base_url);

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .header("Referer", &self.config.base_url)
            .form(&params)
            .send()
            .await
            .context("Failed to connect to qBittorrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK && body.contains("Ok") {
            debug!("Authenticated with qBittorrent");
            Ok(())
        } else if body.contains("Fails") {
            bail!("qBittorrent authentication failed: invalid credentials")
        } else {
            bail!("qBittorrent authentication failed: status={status}, body={body}")
        }
    }

    async fn ensure_auth(&self) -> Result<()> {
        let url = format!("{}/api/v2/app/version", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .header("Referer", &self.config.base_url)
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            debug!("qBittorrent session expired, logging in again");
            self.login().await?;
        }

        Ok(())
    }

    async fn get_torrents(&self, category: Option<&str>) -> Result<Vec<TorrentInfo>> {
        self.ensure_auth().await?;

        let mut url = format!("{}/api/v2/torrents/info", self.config.base_url);
        if let Some(cat) = category {
            url = format!("{url}?category={}", urlencoding::encode(cat));
        }

        let response = self
            .client
            .get(&url)
            .header("Referer", &self.config.base_url)
            .send()
            .await?;

        let text = response.text().await?;
        serde_json::from_str(&text).with_context(|| {
            let truncated: String = text.chars().take(500).collect();
            format!("Failed to parse qBittorrent response: {truncated}")
        })
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<TorrentInfo>> {
        Ok(self
            .get_torrents(None)
            .await?
            .into_iter()
            .find(|t| t.hash.eq_ignore_ascii_case(hash)))
    }
}

/// Extract the btih info hash from a magnet link.
#[must_use]
pub fn magnet_hash(url: &str) -> Option<String> {
    let lower = url.to_lowercase();
    if !lower.starts_with("magnet:") {
        return None;
    }

    let marker = "urn:btih:";
    let start = lower.find(marker)? + marker.len();
    let rest = &url[start..];
    let end = rest.find('&').unwrap_or(rest.len());
    let hash = &rest[..end];

    (hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| hash.to_lowercase())
}

#[async_trait]
impl DownloadClient for QbitClient {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn protocol(&self) -> Protocol {
        Protocol::Torrent
    }

    fn keep_source(&self) -> bool {
        // Torrents keep seeding; imports hardlink and leave the source.
        true
    }

    async fn add(
        &self,
        url: &str,
        save_path: Option<&str>,
        category: Option<&str>,
    ) -> Result<AddResult> {
        self.ensure_auth().await?;

        let known_hash = magnet_hash(url);

        // Idempotency: a job the client already tracks is a success.
        if let Some(hash) = &known_hash
            && let Some(existing) = self.find_by_hash(hash).await?
        {
            info!(hash = %hash, "Torrent already present in qBittorrent");
            return Ok(AddResult {
                ok: true,
                client_job_id: Some(existing.hash),
                message: Some("already present".to_string()),
            });
        }

        let api_url = format!("{}/api/v2/torrents/add", self.config.base_url);
        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("urls", url.to_string());

        if let Some(path) = save_path {
            form.insert("savepath", path.to_string());
        }
        if let Some(cat) = category.or(self.config.category.as_deref()) {
            form.insert("category", cat.to_string());
        }

        let response = self
            .client
            .post(&api_url)
            .header("Referer", &self.config.base_url)
            .form(&form)
            .send()
            .await
            .context("Failed to add torrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK && !body.contains("Fails") {
            Ok(AddResult {
                ok: true,
                client_job_id: known_hash,
                message: None,
            })
        } else if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
            bail!("Torrent file is not valid")
        } else {
            bail!("Failed to add torrent: status={status}, body={body}")
        }
    }

    async fn list(&self, category: Option<&str>) -> Result<Vec<ClientJob>> {
        let torrents = self.get_torrents(category).await?;

        Ok(torrents
            .into_iter()
            .map(|t| {
                let state = t.state.as_job_state();
                ClientJob {
                    id: t.hash.to_lowercase(),
                    name: t.name,
                    state,
                    progress: t.progress,
                    size: t.size,
                    downloaded: t.downloaded,
                    save_path: t.save_path,
                    content_path: t.content_path,
                    error_message: (state == JobState::Error)
                        .then(|| "qBittorrent reports an errored torrent".to_string()),
                    added_at: Some(t.added_on),
                    seeders: Some(t.num_seeds),
                }
            })
            .collect())
    }

    async fn remove(&self, job_id: &str, delete_files: bool) -> Result<()> {
        self.ensure_auth().await?;

        let url = format!("{}/api/v2/torrents/delete", self.config.base_url);
        let params = [
            ("hashes", job_id),
            ("deleteFiles", if delete_files { "true" } else { "false" }),
        ];

        self.client
            .post(&url)
            .header("Referer", &self.config.base_url)
            .form(&params)
            .send()
            .await?;

        info!(hash = %job_id, "Removed torrent");
        Ok(())
    }

    async fn test(&self) -> Result<String> {
        self.ensure_auth().await?;

        let url = format!("{}/api/v2/app/version", self.config.base_url);
        let version = self
            .client
            .get(&url)
            .header("Referer", &self.config.base_url)
            .send()
            .await?
            .text()
            .await?;

        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnet_hash_extraction() {
        let url = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=Some.Movie";
        assert_eq!(
            magnet_hash(url).as_deref(),
            Some("0123456789abcdef0123456789abcdef01234567")
        );

        assert_eq!(magnet_hash("https://example.com/file.torrent"), None);
        assert_eq!(magnet_hash("magnet:?xt=urn:btih:short"), None);
    }

    #[test]
    fn state_mapping() {
        assert_eq!(TorrentState::Downloading.as_job_state(), JobState::Downloading);
        assert_eq!(TorrentState::StalledDL.as_job_state(), JobState::Stalled);
        assert_eq!(TorrentState::Uploading.as_job_state(), JobState::Completed);
        assert_eq!(TorrentState::MissingFiles.as_job_state(), JobState::Error);
        assert_eq!(TorrentState::QueuedDL.as_job_state(), JobState::Queued);
    }
}
