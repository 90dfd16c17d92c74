use crate::clients::{ClientJob, JobState, build_download_client};
use crate::config::Config;
use crate::db::Store;
use crate::domain::events::event_types;
use crate::models::download::{Download, DownloadState};
use crate::services::activity::ActivityService;
use crate::services::importer::{FileImporter, ImportError};
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// The download-sync worker: polls download clients for progress, detects
/// completion, and dispatches imports. State transitions stay monotonic;
/// `importing` is set before the importer runs so a second tick can never
/// import the same download twice.
#[derive(Clone)]
pub struct DownloadLifecycleService {
    store: Store,
    config: Arc<RwLock<Config>>,
    activity: ActivityService,
    importer: FileImporter,
}

impl DownloadLifecycleService {
    #[must_use]
    pub const fn new(
        store: Store,
        config: Arc<RwLock<Config>>,
        activity: ActivityService,
        importer: FileImporter,
    ) -> Self {
        Self {
            store,
            config,
            activity,
            importer,
        }
    }

    /// One tick of the download-sync worker.
    pub async fn sync(&self) -> Result<()> {
        let active = self.store.downloads().active().await?;
        if active.is_empty() {
            return Ok(());
        }

        let timeout = std::time::Duration::from_secs(u64::from(
            self.config.read().await.downloads.request_timeout_seconds,
        ));

        // One job listing per client, shared by all its downloads.
        let mut jobs_by_client: HashMap<String, HashMap<String, ClientJob>> = HashMap::new();
        let client_rows = self.store.download_clients().enabled().await?;

        for row in &client_rows {
            let client = build_download_client(row, timeout);
            match client.list(None).await {
                Ok(jobs) => {
                    jobs_by_client.insert(
                        row.id.clone(),
                        jobs.into_iter().map(|j| (j.id.clone(), j)).collect(),
                    );
                }
                Err(e) => {
                    warn!(client = %row.name, error = %e, "Failed to list download client jobs");
                }
            }
        }

        for download in active {
            if let Err(e) = self
                .sync_one(&download, &jobs_by_client, &client_rows, timeout)
                .await
            {
                warn!(download = %download.title, error = %e, "Download sync failed");
            }
        }

        Ok(())
    }

    async fn sync_one(
        &self,
        download: &Download,
        jobs_by_client: &HashMap<String, HashMap<String, ClientJob>>,
        client_rows: &[crate::entities::download_clients::Model],
        timeout: std::time::Duration,
    ) -> Result<()> {
        let Some(client_id) = &download.download_client_id else {
            // Grabbed but the client never acknowledged; nothing to poll.
            return Ok(());
        };

        let jobs = jobs_by_client.get(client_id);
        let job = jobs.and_then(|jobs| {
            download
                .client_job_id
                .as_ref()
                .and_then(|id| jobs.get(&id.to_lowercase()).or_else(|| jobs.get(id)))
                .or_else(|| jobs.values().find(|j| j.name == download.title))
        });

        let Some(job) = job else {
            debug!(download = %download.title, "Job not visible in client yet");
            return Ok(());
        };

        let client_row = client_rows.iter().find(|r| &r.id == client_id);

        match job.state {
            JobState::Error => {
                self.fail_and_blacklist(download, job, client_row, timeout, "Download client error")
                    .await
            }
            JobState::Stalled => {
                let stalled_timeout = i64::from(
                    self.config.read().await.downloads.stalled_timeout_seconds,
                );
                let stalled_for = job
                    .added_at
                    .map(|added| chrono::Utc::now().timestamp() - added)
                    .unwrap_or(0);

                if stalled_for > stalled_timeout && job.seeders == Some(0) {
                    self.fail_and_blacklist(download, job, client_row, timeout, "Stalled (0 seeds)")
                        .await
                } else {
                    self.store
                        .downloads()
                        .update_progress(
                            &download.id,
                            DownloadState::Downloading,
                            job.progress,
                            Some(job.size),
                        )
                        .await?;
                    Ok(())
                }
            }
            JobState::Queued => {
                self.store
                    .downloads()
                    .update_progress(&download.id, DownloadState::Queued, job.progress, None)
                    .await?;
                Ok(())
            }
            JobState::Downloading => {
                self.store
                    .downloads()
                    .update_progress(
                        &download.id,
                        DownloadState::Downloading,
                        job.progress,
                        Some(job.size),
                    )
                    .await?;
                Ok(())
            }
            JobState::Completed => {
                if download.status == DownloadState::Importing {
                    return Ok(());
                }
                self.import_completed(download, job, client_row).await
            }
        }
    }

    async fn import_completed(
        &self,
        download: &Download,
        job: &ClientJob,
        client_row: Option<&crate::entities::download_clients::Model>,
    ) -> Result<()> {
        self.store
            .downloads()
            .update_progress(&download.id, DownloadState::Importing, 1.0, Some(job.size))
            .await?;

        let mappings = self.config.read().await.downloads.remote_path_mappings.clone();
        let content_path = apply_path_mappings(
            if job.content_path.is_empty() {
                &job.save_path
            } else {
                &job.content_path
            },
            &mappings,
        );

        let keep_source = client_row.is_some_and(|r| r.keep_source);

        info!(download = %download.title, path = %content_path, "Importing completed download");

        match self
            .importer
            .import_download(download, Path::new(&content_path), keep_source)
            .await
        {
            Ok(outcome) => {
                self.store
                    .downloads()
                    .set_status(&download.id, DownloadState::Completed, None)
                    .await?;

                if outcome.idempotent {
                    debug!(download = %download.title, "Import was idempotent");
                }

                // Usenet jobs can be cleared from the client's history
                // once their payload is in the library.
                if let Some(row) = client_row
                    && row.remove_completed
                {
                    let timeout = std::time::Duration::from_secs(30);
                    let client = build_download_client(row, timeout);
                    if let Err(e) = client.remove(&job.id, false).await {
                        debug!(error = %e, "Failed to remove completed job from client");
                    }
                }

                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                warn!(download = %download.title, error = %message, "Import failed");

                self.store
                    .downloads()
                    .set_status(&download.id, DownloadState::Failed, Some(&message))
                    .await?;

                let (entity_type, entity_id) = entity_ref(download);
                self.activity
                    .record(
                        entity_type,
                        entity_id.as_deref(),
                        event_types::FAILED,
                        &format!("Import failed: {}", download.title),
                        Some(serde_json::json!({ "error": message })),
                    )
                    .await?;

                if matches!(e, ImportError::NoVideo(_)) {
                    // A payload with no video is never worth re-grabbing.
                    self.blacklist_download(download, "No video file in payload")
                        .await?;
                }

                Ok(())
            }
        }
    }

    async fn fail_and_blacklist(
        &self,
        download: &Download,
        job: &ClientJob,
        client_row: Option<&crate::entities::download_clients::Model>,
        timeout: std::time::Duration,
        reason: &str,
    ) -> Result<()> {
        warn!(download = %download.title, reason, "Abandoning download");

        if let Some(row) = client_row {
            let client = build_download_client(row, timeout);
            if let Err(e) = client.remove(&job.id, true).await {
                warn!(error = %e, "Failed to remove dead job from client");
            }
        }

        self.store
            .downloads()
            .set_status(&download.id, DownloadState::Failed, Some(reason))
            .await?;

        self.blacklist_download(download, reason).await?;

        let (entity_type, entity_id) = entity_ref(download);
        self.activity
            .record(
                entity_type,
                entity_id.as_deref(),
                event_types::FAILED,
                &format!("Download failed: {}", download.title),
                Some(serde_json::json!({ "reason": reason })),
            )
            .await?;

        Ok(())
    }

    async fn blacklist_download(&self, download: &Download, reason: &str) -> Result<()> {
        self.store
            .blacklist()
            .add(
                &download.title,
                download.movie_id.as_deref(),
                download.series_id.as_deref(),
                download.season_number,
                download.episode_number,
                Some(reason),
            )
            .await
    }
}

fn entity_ref(download: &Download) -> (&'static str, Option<String>) {
    if download.movie_id.is_some() {
        ("movie", download.movie_id.clone())
    } else {
        ("series", download.series_id.clone())
    }
}

fn apply_path_mappings(path: &str, mappings: &[(String, String)]) -> String {
    let mut result = path.to_string();
    for (remote, local) in mappings {
        if result.starts_with(remote) {
            debug!("Applying path mapping: {} -> {} for {}", remote, local, result);
            result = result.replacen(remote, local, 1);
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_mapping_replaces_prefix_once() {
        let mappings = vec![("/remote/downloads".to_string(), "/mnt/downloads".to_string())];
        assert_eq!(
            apply_path_mappings("/remote/downloads/job/file.mkv", &mappings),
            "/mnt/downloads/job/file.mkv"
        );
        assert_eq!(apply_path_mappings("/other/file.mkv", &mappings), "/other/file.mkv");
    }
}
