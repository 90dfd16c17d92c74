use crate::clients::{DownloadClient, SearchKind, build_download_client, build_indexer};
use crate::config::Config;
use crate::constants::search;
use crate::db::{Store, new_id};
use crate::domain::events::event_types;
use crate::models::download::{Download, DownloadState};
use crate::models::episode::Episode;
use crate::models::movie::Movie;
use crate::models::release::Release;
use crate::parser::release::detect_word;
use crate::quality::ProperFlags;
use crate::services::library::LibraryService;
use crate::services::selector::{ScoredRelease, SelectionRequest, select_best};
use crate::clients::Notifier;
use anyhow::{Context, Result};
use futures::future::join_all;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info, warn};

/// What a single search attempt concluded.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SearchOutcome {
    Grabbed { title: String },
    NoCandidates,
    AlreadyDownloading,
    NotNeeded { reason: String },
    Failed { reason: String },
}

/// Single-item search plus the batched missing/cutoff sweeps.
#[derive(Clone)]
pub struct AutoSearchService {
    store: Store,
    config: Arc<RwLock<Config>>,
    library: LibraryService,
    activity: crate::services::activity::ActivityService,
    notifier: Arc<dyn Notifier>,
}

impl AutoSearchService {
    #[must_use]
    pub fn new(
        store: Store,
        config: Arc<RwLock<Config>>,
        library: LibraryService,
        activity: crate::services::activity::ActivityService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            config,
            library,
            activity,
            notifier,
        }
    }

    /// Query every enabled indexer in parallel, bounded by the configured
    /// request concurrency. Indexer failures surface as empty slices.
    async fn query_indexers(&self, kind: SearchKind, query: &str) -> Result<Vec<Release>> {
        let rows = self.store.indexers().enabled().await?;
        if rows.is_empty() {
            warn!("No enabled indexers configured");
            return Ok(Vec::new());
        }

        let limit = self.config.read().await.downloads.concurrent_requests;
        let semaphore = Arc::new(Semaphore::new(limit.max(1)));

        let tasks = rows.iter().map(|row| {
            let client = build_indexer(row);
            let semaphore = Arc::clone(&semaphore);
            let query = query.to_string();
            async move {
                let _permit = semaphore.acquire().await;
                client.search(kind, &query).await
            }
        });

        Ok(join_all(tasks).await.into_iter().flatten().collect())
    }

    /// Pick the download client responsible for a release's protocol.
    async fn client_for(&self, release: &Release) -> Result<Option<Arc<dyn DownloadClient>>> {
        let timeout = std::time::Duration::from_secs(u64::from(
            self.config.read().await.downloads.request_timeout_seconds,
        ));

        let rows = self.store.download_clients().enabled().await?;
        let row = rows
            .iter()
            .find(|c| {
                let protocol = if c.kind == "sabnzbd" {
                    crate::models::release::Protocol::Usenet
                } else {
                    crate::models::release::Protocol::Torrent
                };
                protocol == release.protocol
            })
            .or_else(|| rows.first());

        Ok(row.map(|r| build_download_client(r, timeout)))
    }

    /// Hand the selected release to a download client and record it.
    /// Shared by direct searches and the RSS pipeline.
    pub(crate) async fn grab(
        &self,
        selected: &ScoredRelease,
        mut download: Download,
    ) -> Result<SearchOutcome> {
        // The exact URL already tracked means this grab already happened.
        if self
            .store
            .downloads()
            .has_url(&selected.release.download_url)
            .await?
        {
            debug!(title = %selected.release.title, "Release URL already tracked, skipping grab");
            return Ok(SearchOutcome::AlreadyDownloading);
        }

        download.quality = Some(selected.parsed.quality.clone());
        download.size = selected.release.size;
        download.indexer = Some(selected.release.indexer.clone());
        self.store.downloads().insert(&download).await?;

        let Some(client) = self.client_for(&selected.release).await? else {
            self.store
                .downloads()
                .set_status(&download.id, DownloadState::Failed, Some("No download client"))
                .await?;
            return Ok(SearchOutcome::Failed {
                reason: "No enabled download client".to_string(),
            });
        };

        match client.add(&selected.release.download_url, None, None).await {
            Ok(result) if result.ok => {
                self.store
                    .downloads()
                    .set_client_ids(&download.id, client.id(), result.client_job_id.as_deref())
                    .await?;

                let (entity_type, entity_id) = if let Some(movie_id) = &download.movie_id {
                    ("movie", movie_id.clone())
                } else {
                    ("series", download.series_id.clone().unwrap_or_default())
                };

                self.activity
                    .record(
                        entity_type,
                        Some(&entity_id),
                        event_types::GRABBED,
                        &format!("Grabbed release: {}", selected.release.title),
                        Some(json!({
                            "indexer": selected.release.indexer,
                            "quality": selected.parsed.quality,
                            "score": selected.total(),
                        })),
                    )
                    .await?;

                let notifier = Arc::clone(&self.notifier);
                let title = selected.release.title.clone();
                tokio::spawn(async move {
                    notifier
                        .notify(event_types::GRABBED, &title, Some(&entity_id))
                        .await;
                });

                Ok(SearchOutcome::Grabbed {
                    title: selected.release.title.clone(),
                })
            }
            Ok(result) => {
                let reason = result.message.unwrap_or_else(|| "Client refused".to_string());
                self.store
                    .downloads()
                    .set_status(&download.id, DownloadState::Failed, Some(&reason))
                    .await?;
                Ok(SearchOutcome::Failed { reason })
            }
            Err(e) => {
                self.store
                    .downloads()
                    .set_status(&download.id, DownloadState::Failed, Some(&e.to_string()))
                    .await?;
                Ok(SearchOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        }
    }

    pub async fn search_and_download_movie(
        &self,
        movie_id: &str,
        force_upgrade: bool,
    ) -> Result<SearchOutcome> {
        let movie = self
            .store
            .movies()
            .get(movie_id)
            .await?
            .context("Movie not found")?;

        let profile_id = movie
            .quality_profile_id
            .clone()
            .context("Movie has no quality profile")?;
        let profile = self
            .store
            .quality()
            .get_profile(&profile_id)
            .await?
            .context("Quality profile not found")?;

        if self.store.downloads().has_active_for_movie(movie_id).await? {
            debug!(movie = %movie.title, "Active download exists, skipping search");
            return Ok(SearchOutcome::AlreadyDownloading);
        }

        let ladder = self.store.quality().ladder().await?;
        let preference = self.config.read().await.quality.propers_repacks_preference;

        let current_flags = current_flags(movie.is_proper, movie.is_repack, movie.file_path.as_deref());

        if movie.has_file && !force_upgrade {
            let quality = movie.quality.clone().unwrap_or_default();
            if !profile.upgrade_allowed {
                return Ok(SearchOutcome::NotNeeded {
                    reason: "Upgrades disabled".to_string(),
                });
            }
            if profile.meets_cutoff(&ladder, &quality) && !quality.is_empty() {
                return Ok(SearchOutcome::NotNeeded {
                    reason: "Cutoff already met".to_string(),
                });
            }
        }

        let query = movie
            .year
            .map_or_else(|| movie.title.clone(), |y| format!("{} {y}", movie.title));
        let candidates = self.query_indexers(SearchKind::Movie, &query).await?;
        if candidates.is_empty() {
            return Ok(SearchOutcome::NoCandidates);
        }

        let blacklist = self.store.blacklist().titles_for_movie(movie_id).await?;
        let formats = self.store.quality().list_formats().await?;

        let request = SelectionRequest {
            profile: &profile,
            ladder: &ladder,
            formats: &formats,
            expected_title: &movie.title,
            expected_year: movie.year,
            is_movie: true,
            runtime_minutes: movie.runtime,
            blacklist: &blacklist,
        };

        let Some(selected) = select_best(candidates, &request) else {
            return Ok(SearchOutcome::NoCandidates);
        };

        if movie.has_file {
            let current = movie.quality.clone().unwrap_or_default();
            let candidate_weight = ladder.weight_for(&selected.parsed.quality);
            let current_weight = ladder.weight_for(&current);

            if candidate_weight <= current_weight {
                let candidate_flags = ProperFlags {
                    is_proper: selected.parsed.is_proper,
                    is_repack: selected.parsed.is_repack,
                };
                if !profile.should_upgrade(
                    &ladder,
                    &current,
                    current_flags,
                    &selected.parsed.quality,
                    candidate_flags,
                    preference,
                ) {
                    return Ok(SearchOutcome::NotNeeded {
                        reason: "Best candidate is not an upgrade".to_string(),
                    });
                }
            }
        }

        let download = Download {
            id: new_id(),
            movie_id: Some(movie.id.clone()),
            series_id: None,
            season_number: None,
            episode_number: None,
            title: selected.release.title.clone(),
            download_url: selected.release.download_url.clone(),
            size: selected.release.size,
            indexer: Some(selected.release.indexer.clone()),
            quality: Some(selected.parsed.quality.clone()),
            status: DownloadState::Queued,
            progress: 0.0,
            download_client_id: None,
            client_job_id: None,
            error_message: None,
            created_at: None,
            updated_at: None,
        };

        self.grab(&selected, download).await
    }

    pub async fn search_and_download_episode(
        &self,
        episode_id: &str,
        force_upgrade: bool,
    ) -> Result<SearchOutcome> {
        let episode = self
            .store
            .series()
            .get_episode(episode_id)
            .await?
            .context("Episode not found")?;
        let series = self
            .store
            .series()
            .get(&episode.series_id)
            .await?
            .context("Series not found")?;

        let profile_id = series
            .quality_profile_id
            .clone()
            .context("Series has no quality profile")?;
        let profile = self
            .store
            .quality()
            .get_profile(&profile_id)
            .await?
            .context("Quality profile not found")?;

        if self
            .store
            .downloads()
            .has_active_for_episode(
                &series.id,
                episode.season_number,
                Some(episode.episode_number),
            )
            .await?
        {
            debug!(series = %series.title, "Active download exists, skipping search");
            return Ok(SearchOutcome::AlreadyDownloading);
        }

        let ladder = self.store.quality().ladder().await?;
        let preference = self.config.read().await.quality.propers_repacks_preference;
        let current_flags = current_flags(
            episode.is_proper,
            episode.is_repack,
            episode.file_path.as_deref(),
        );

        if episode.has_file && !force_upgrade {
            let quality = episode.quality.clone().unwrap_or_default();
            if !profile.upgrade_allowed {
                return Ok(SearchOutcome::NotNeeded {
                    reason: "Upgrades disabled".to_string(),
                });
            }
            if profile.meets_cutoff(&ladder, &quality) && !quality.is_empty() {
                return Ok(SearchOutcome::NotNeeded {
                    reason: "Cutoff already met".to_string(),
                });
            }
        }

        let query = format!(
            "{} S{:02}E{:02}",
            series.title, episode.season_number, episode.episode_number
        );
        let candidates = self.query_indexers(SearchKind::Series, &query).await?;

        // Keep only releases naming this episode, or a season pack with
        // the right season number.
        let candidates: Vec<Release> = candidates
            .into_iter()
            .filter(|r| {
                let parsed = crate::parser::release::parse_release_title(&r.title);
                (parsed.season == Some(episode.season_number)
                    && parsed.episodes.contains(&episode.episode_number))
                    || (parsed.is_season_pack && parsed.season == Some(episode.season_number))
            })
            .collect();

        if candidates.is_empty() {
            return Ok(SearchOutcome::NoCandidates);
        }

        let blacklist = self
            .store
            .blacklist()
            .titles_for_episode(
                &series.id,
                episode.season_number,
                Some(episode.episode_number),
            )
            .await?;
        let formats = self.store.quality().list_formats().await?;

        let request = SelectionRequest {
            profile: &profile,
            ladder: &ladder,
            formats: &formats,
            expected_title: &series.title,
            expected_year: None,
            is_movie: false,
            runtime_minutes: None,
            blacklist: &blacklist,
        };

        let Some(selected) = select_best(candidates, &request) else {
            return Ok(SearchOutcome::NoCandidates);
        };

        if episode.has_file {
            let current = episode.quality.clone().unwrap_or_default();
            let candidate_weight = ladder.weight_for(&selected.parsed.quality);
            let current_weight = ladder.weight_for(&current);

            if candidate_weight <= current_weight {
                let candidate_flags = ProperFlags {
                    is_proper: selected.parsed.is_proper,
                    is_repack: selected.parsed.is_repack,
                };
                if !profile.should_upgrade(
                    &ladder,
                    &current,
                    current_flags,
                    &selected.parsed.quality,
                    candidate_flags,
                    preference,
                ) {
                    return Ok(SearchOutcome::NotNeeded {
                        reason: "Best candidate is not an upgrade".to_string(),
                    });
                }
            }
        }

        let download = Download {
            id: new_id(),
            movie_id: None,
            series_id: Some(series.id.clone()),
            season_number: Some(episode.season_number),
            episode_number: if selected.parsed.is_season_pack {
                None
            } else {
                Some(episode.episode_number)
            },
            title: selected.release.title.clone(),
            download_url: selected.release.download_url.clone(),
            size: selected.release.size,
            indexer: Some(selected.release.indexer.clone()),
            quality: Some(selected.parsed.quality.clone()),
            status: DownloadState::Queued,
            progress: 0.0,
            download_client_id: None,
            client_job_id: None,
            error_message: None,
            created_at: None,
            updated_at: None,
        };

        self.grab(&selected, download).await
    }

    /// Search every missing-and-available movie and every monitored,
    /// aired, file-less episode. Per-item failures are logged and counted,
    /// never propagated out of the batch.
    pub async fn search_all_missing(&self, concurrency: usize) -> Result<(usize, usize)> {
        let movies = self.library.find_missing_and_available().await?;
        let episodes = self.library.find_missing_aired_episodes().await?;

        info!(
            movies = movies.len(),
            episodes = episodes.len(),
            "Starting missing-item search sweep"
        );

        let mut grabbed = 0;
        let mut errors = 0;

        let movie_ids: Vec<String> = movies.iter().map(|m: &Movie| m.id.clone()).collect();
        let (g, e) = self
            .run_batches(movie_ids, concurrency, |service, id| async move {
                service.search_and_download_movie(&id, false).await
            })
            .await;
        grabbed += g;
        errors += e;

        let episode_ids: Vec<String> = episodes.iter().map(|e: &Episode| e.id.clone()).collect();
        let (g, e) = self
            .run_batches(episode_ids, concurrency, |service, id| async move {
                service.search_and_download_episode(&id, false).await
            })
            .await;
        grabbed += g;
        errors += e;

        info!(grabbed, errors, "Missing-item search sweep finished");
        Ok((grabbed, errors))
    }

    /// Search every library item whose file has not reached its profile
    /// cutoff yet.
    pub async fn search_all_cutoff_unmet(&self, concurrency: usize) -> Result<(usize, usize)> {
        let ladder = self.store.quality().ladder().await?;
        let movies = self.library.find_movies_cutoff_unmet(&ladder).await?;
        let episodes = self.library.find_episodes_cutoff_unmet(&ladder).await?;

        info!(
            movies = movies.len(),
            episodes = episodes.len(),
            "Starting cutoff-unmet search sweep"
        );

        let mut grabbed = 0;
        let mut errors = 0;

        let movie_ids: Vec<String> = movies.iter().map(|m| m.id.clone()).collect();
        let (g, e) = self
            .run_batches(movie_ids, concurrency, |service, id| async move {
                service.search_and_download_movie(&id, false).await
            })
            .await;
        grabbed += g;
        errors += e;

        let episode_ids: Vec<String> = episodes.iter().map(|e| e.id.clone()).collect();
        let (g, e) = self
            .run_batches(episode_ids, concurrency, |service, id| async move {
                service.search_and_download_episode(&id, false).await
            })
            .await;
        grabbed += g;
        errors += e;

        info!(grabbed, errors, "Cutoff-unmet search sweep finished");
        Ok((grabbed, errors))
    }

    /// Run items in batches of `concurrency`, staggering siblings inside
    /// a batch and pausing between batches to stay polite to indexers.
    async fn run_batches<F, Fut>(
        &self,
        ids: Vec<String>,
        concurrency: usize,
        task: F,
    ) -> (usize, usize)
    where
        F: Fn(Self, String) -> Fut + Clone,
        Fut: Future<Output = Result<SearchOutcome>> + Send + 'static,
    {
        let concurrency = concurrency.max(1);
        let mut grabbed = 0;
        let mut errors = 0;

        for (batch_index, batch) in ids.chunks(concurrency).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(search::BATCH_PAUSE).await;
            }

            let mut handles = Vec::with_capacity(batch.len());
            for (i, id) in batch.iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(search::SIBLING_PAUSE).await;
                }
                let task = task.clone();
                handles.push(tokio::spawn(task(self.clone(), id.clone())));
            }

            for handle in handles {
                match handle.await {
                    Ok(Ok(SearchOutcome::Grabbed { .. })) => grabbed += 1,
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        warn!(error = %e, "Search task failed");
                        errors += 1;
                    }
                    Err(e) => {
                        warn!(error = %e, "Search task panicked");
                        errors += 1;
                    }
                }
            }
        }

        (grabbed, errors)
    }
}

/// Proper/repack state of the current file: the stored flags, plus a
/// second look at the stored file path for imports that predate the
/// flags.
fn current_flags(is_proper: bool, is_repack: bool, file_path: Option<&str>) -> ProperFlags {
    let from_path = file_path.map(|p| {
        (
            detect_word(p, "PROPER"),
            detect_word(p, "REPACK") || detect_word(p, "RERIP"),
        )
    });

    ProperFlags {
        is_proper: is_proper || from_path.is_some_and(|(p, _)| p),
        is_repack: is_repack || from_path.is_some_and(|(_, r)| r),
    }
}
