use crate::clients::traits::{AddResult, ClientJob, DownloadClient, JobState};
use crate::models::release::Protocol;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SabnzbdConfig {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub category: Option<String>,
    pub keep_source: bool,
    pub timeout: std::time::Duration,
}

/// SABnzbd JSON API client.
#[derive(Debug, Clone)]
pub struct SabnzbdClient {
    client: Client,
    config: SabnzbdConfig,
}

impl SabnzbdClient {
    #[must_use]
    pub fn new(config: SabnzbdConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.timeout)
                .build()
                .expect("Failed to build HTTP client"),
            config,
        }
    }

    async fn api<T: for<'de> Deserialize<'de>>(&self, params: &[(&str, &str)]) -> Result<T> {
        let mut url = url::Url::parse(&self.config.base_url)
            .with_context(|| format!("Invalid SABnzbd URL: {}", self.config.base_url))?;
        url.set_path("api");

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("output", "json");
            query.append_pair("apikey", &self.config.api_key);
            for (k, v) in params {
                query.append_pair(k, v);
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("SABnzbd request failed")?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl DownloadClient for SabnzbdClient {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn protocol(&self) -> Protocol {
        Protocol::Usenet
    }

    fn keep_source(&self) -> bool {
        self.config.keep_source
    }

    async fn add(
        &self,
        url: &str,
        _save_path: Option<&str>,
        category: Option<&str>,
    ) -> Result<AddResult> {
        let cat = category
            .or(self.config.category.as_deref())
            .unwrap_or("mediastack");

        let response: AddResponse = self
            .api(&[("mode", "addurl"), ("name", url), ("cat", cat)])
            .await?;

        if !response.status {
            bail!("SABnzbd rejected the NZB URL");
        }

        Ok(AddResult {
            ok: true,
            client_job_id: response.nzo_ids.into_iter().next(),
            message: None,
        })
    }

    async fn list(&self, _category: Option<&str>) -> Result<Vec<ClientJob>> {
        let queue: QueueResponse = self.api(&[("mode", "queue")]).await?;
        let history: HistoryResponse = self.api(&[("mode", "history"), ("limit", "100")]).await?;

        let mut jobs = Vec::new();

        for slot in queue.queue.slots {
            let size_mb: f64 = slot.mb.parse().unwrap_or(0.0);
            let left_mb: f64 = slot.mbleft.parse().unwrap_or(0.0);
            let size = (size_mb * 1024.0 * 1024.0) as i64;
            let downloaded = ((size_mb - left_mb).max(0.0) * 1024.0 * 1024.0) as i64;

            jobs.push(ClientJob {
                id: slot.nzo_id,
                name: slot.filename,
                state: match slot.status.as_str() {
                    "Paused" | "Queued" => JobState::Queued,
                    _ => JobState::Downloading,
                },
                progress: if size_mb > 0.0 {
                    (size_mb - left_mb) / size_mb
                } else {
                    0.0
                },
                size,
                downloaded,
                save_path: String::new(),
                content_path: String::new(),
                error_message: None,
                added_at: None,
                seeders: None,
            });
        }

        for slot in history.history.slots {
            let failed = slot.status == "Failed";
            jobs.push(ClientJob {
                id: slot.nzo_id,
                name: slot.name,
                state: if failed {
                    JobState::Error
                } else {
                    JobState::Completed
                },
                progress: 1.0,
                size: slot.bytes,
                downloaded: slot.bytes,
                save_path: slot.storage.clone().unwrap_or_default(),
                content_path: slot.storage.unwrap_or_default(),
                error_message: failed.then_some(slot.fail_message).flatten(),
                added_at: None,
                seeders: None,
            });
        }

        Ok(jobs)
    }

    async fn remove(&self, job_id: &str, delete_files: bool) -> Result<()> {
        let del_files = if delete_files { "1" } else { "0" };
        let _: serde_json::Value = self
            .api(&[
                ("mode", "queue"),
                ("name", "delete"),
                ("value", job_id),
                ("del_files", del_files),
            ])
            .await?;

        info!(nzo_id = %job_id, "Removed NZB from queue");
        Ok(())
    }

    async fn test(&self) -> Result<String> {
        let response: VersionResponse = self.api(&[("mode", "version")]).await?;
        Ok(response.version)
    }
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    status: bool,
    #[serde(default)]
    nzo_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Deserialize)]
struct QueueResponse {
    queue: QueueBody,
}

#[derive(Debug, Deserialize)]
struct QueueBody {
    #[serde(default)]
    slots: Vec<QueueSlot>,
}

#[derive(Debug, Deserialize)]
struct QueueSlot {
    nzo_id: String,
    filename: String,
    mb: String,
    mbleft: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: HistoryBody,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(default)]
    slots: Vec<HistorySlot>,
}

#[derive(Debug, Deserialize)]
struct HistorySlot {
    nzo_id: String,
    name: String,
    status: String,
    #[serde(default)]
    bytes: i64,
    storage: Option<String>,
    fail_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_queue_slot_progress() {
        let json = r#"{"queue":{"slots":[{"nzo_id":"SABnzbd_nzo_1","filename":"Some.Movie.2023","mb":"1000.0","mbleft":"250.0","status":"Downloading"}]}}"#;
        let parsed: QueueResponse = serde_json::from_str(json).unwrap();
        let slot = &parsed.queue.slots[0];
        assert_eq!(slot.nzo_id, "SABnzbd_nzo_1");
        assert_eq!(slot.mbleft, "250.0");
    }

    #[test]
    fn parses_history_failure() {
        let json = r#"{"history":{"slots":[{"nzo_id":"SABnzbd_nzo_2","name":"Bad.Movie","status":"Failed","bytes":123,"storage":null,"fail_message":"CRC error"}]}}"#;
        let parsed: HistoryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.history.slots[0].status, "Failed");
    }
}
