use crate::clients::build_indexer;
use crate::config::Config;
use crate::db::{Store, new_id};
use crate::models::download::{Download, DownloadState};
use crate::models::episode::Episode;
use crate::models::movie::Movie;
use crate::models::release::{ParsedRelease, Release};
use crate::models::series::Series;
use crate::parser::release::{detect_word, parse_release_title};
use crate::quality::ProperFlags;
use crate::services::auto_search::{AutoSearchService, SearchOutcome};
use crate::services::selector::{SelectionRequest, evaluate};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct RssSyncStats {
    pub indexers: usize,
    pub fetched: usize,
    pub new_releases: usize,
    pub grabbed: usize,
    pub swept: u64,
}

/// One RSS pass: pull every feed, dedupe through the cache, fan each new
/// release out against all wanted movies and episodes, grab the first
/// match, and sweep old cache rows.
#[derive(Clone)]
pub struct RssGrabberService {
    store: Store,
    config: Arc<RwLock<Config>>,
    auto_search: AutoSearchService,
    /// Last poll time per indexer, for per-indexer cadence.
    last_polled: Arc<RwLock<std::collections::HashMap<String, std::time::Instant>>>,
}

impl RssGrabberService {
    #[must_use]
    pub fn new(
        store: Store,
        config: Arc<RwLock<Config>>,
        auto_search: AutoSearchService,
    ) -> Self {
        Self {
            store,
            config,
            auto_search,
            last_polled: Arc::new(RwLock::new(std::collections::HashMap::new())),
        }
    }

    /// Whether an indexer's own RSS cadence allows polling it now.
    async fn due_for_poll(&self, indexer_id: &str, interval_minutes: i64) -> bool {
        let polled = self.last_polled.read().await;
        polled.get(indexer_id).is_none_or(|last| {
            last.elapsed().as_secs() >= u64::try_from(interval_minutes.max(1)).unwrap_or(1) * 60
        })
    }

    pub async fn sync(&self) -> Result<RssSyncStats> {
        let start = std::time::Instant::now();
        let mut stats = RssSyncStats::default();

        let indexers: Vec<_> = self
            .store
            .indexers()
            .enabled()
            .await?
            .into_iter()
            .filter(|i| i.supports_rss)
            .collect();
        stats.indexers = indexers.len();

        if indexers.is_empty() {
            debug!("No RSS-enabled indexers configured");
            return Ok(stats);
        }

        // Wanted items are loaded once per pass; each new release fans
        // out against this snapshot.
        let movies = self.store.movies().list(&crate::db::MovieFilter {
            monitored: Some(true),
            ..Default::default()
        })
        .await?;
        let all_series = self
            .store
            .series()
            .list(&crate::db::SeriesFilter {
                monitored: Some(true),
                ..Default::default()
            })
            .await?;

        for indexer in indexers {
            if !self
                .due_for_poll(&indexer.id, indexer.rss_interval_minutes)
                .await
            {
                debug!(indexer = %indexer.name, "Within RSS cadence, skipping poll");
                continue;
            }
            self.last_polled
                .write()
                .await
                .insert(indexer.id.clone(), std::time::Instant::now());

            let client = build_indexer(&indexer);
            let releases = client.fetch_rss().await;
            stats.fetched += releases.len();

            for release in releases {
                if !self.store.rss_cache().insert_if_new(&release).await? {
                    continue;
                }
                stats.new_releases += 1;

                match self.process_release(&release, &movies, &all_series).await {
                    Ok(true) => {
                        stats.grabbed += 1;
                        self.store
                            .rss_cache()
                            .mark(&release.indexer_id, &release.guid, true, true)
                            .await?;
                    }
                    Ok(false) => {
                        self.store
                            .rss_cache()
                            .mark(&release.indexer_id, &release.guid, true, false)
                            .await?;
                    }
                    Err(e) => {
                        warn!(title = %release.title, error = %e, "RSS release processing failed");
                        self.store
                            .rss_cache()
                            .mark(&release.indexer_id, &release.guid, true, false)
                            .await?;
                    }
                }
            }
        }

        stats.swept = self.store.rss_cache().sweep_old().await?;

        info!(
            event = "rss_sync_finished",
            indexers = stats.indexers,
            fetched = stats.fetched,
            new_releases = stats.new_releases,
            grabbed = stats.grabbed,
            swept = stats.swept,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "RSS pass finished"
        );

        Ok(stats)
    }

    /// Fan one new release out: movies first, then episodes, then season
    /// packs. The first grab wins.
    async fn process_release(
        &self,
        release: &Release,
        movies: &[Movie],
        all_series: &[Series],
    ) -> Result<bool> {
        let parsed = parse_release_title(&release.title);

        if !parsed.is_tv_shaped() {
            for movie in movies {
                if self.try_movie(release, movie).await? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        if let (Some(season), Some(episode_number)) = (parsed.season, parsed.first_episode()) {
            for series in all_series {
                if self
                    .try_episode(release, series, season, episode_number)
                    .await?
                {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        if parsed.is_season_pack && let Some(season) = parsed.season {
            for series in all_series {
                if self.try_season_pack(release, &parsed, series, season).await? {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    async fn try_movie(&self, release: &Release, movie: &Movie) -> Result<bool> {
        if !movie.monitored || !movie.is_available() {
            return Ok(false);
        }

        // Same active-download guard as a direct search: one in-flight
        // job per movie, and a URL is only ever grabbed once.
        if self.store.downloads().has_active_for_movie(&movie.id).await?
            || self.store.downloads().has_url(&release.download_url).await?
        {
            return Ok(false);
        }

        let Some(profile_id) = &movie.quality_profile_id else {
            return Ok(false);
        };
        let Some(profile) = self.store.quality().get_profile(profile_id).await? else {
            return Ok(false);
        };

        let ladder = self.store.quality().ladder().await?;
        let blacklist = self.store.blacklist().titles_for_movie(&movie.id).await?;
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

        let Some(scored) = evaluate(release.clone(), &request) else {
            return Ok(false);
        };

        if movie.has_file {
            let current = movie.quality.clone().unwrap_or_default();
            let preference = self.config.read().await.quality.propers_repacks_preference;
            let current_flags = ProperFlags {
                is_proper: movie.is_proper
                    || movie
                        .file_path
                        .as_deref()
                        .is_some_and(|p| detect_word(p, "PROPER")),
                is_repack: movie.is_repack,
            };
            let candidate_flags = ProperFlags {
                is_proper: scored.parsed.is_proper,
                is_repack: scored.parsed.is_repack,
            };

            if !profile.should_upgrade(
                &ladder,
                &current,
                current_flags,
                &scored.parsed.quality,
                candidate_flags,
                preference,
            ) {
                return Ok(false);
            }
        }

        let download = Download {
            id: new_id(),
            movie_id: Some(movie.id.clone()),
            series_id: None,
            season_number: None,
            episode_number: None,
            title: release.title.clone(),
            download_url: release.download_url.clone(),
            size: release.size,
            indexer: Some(release.indexer.clone()),
            quality: Some(scored.parsed.quality.clone()),
            status: DownloadState::Queued,
            progress: 0.0,
            download_client_id: None,
            client_job_id: None,
            error_message: None,
            created_at: None,
            updated_at: None,
        };

        info!(movie = %movie.title, release = %release.title, "RSS match (movie)");
        Ok(matches!(
            self.auto_search.grab(&scored, download).await?,
            SearchOutcome::Grabbed { .. }
        ))
    }

    async fn try_episode(
        &self,
        release: &Release,
        series: &Series,
        season: i32,
        episode_number: i32,
    ) -> Result<bool> {
        if !series.monitored {
            return Ok(false);
        }

        let Some(episode) = self
            .store
            .series()
            .find_episode(&series.id, season, episode_number)
            .await?
        else {
            return Ok(false);
        };

        if !episode.monitored {
            return Ok(false);
        }

        if self
            .store
            .downloads()
            .has_active_for_episode(&series.id, season, Some(episode_number))
            .await?
            || self.store.downloads().has_url(&release.download_url).await?
        {
            return Ok(false);
        }

        let Some(scored) = self.evaluate_for_series(release, series, &episode).await? else {
            return Ok(false);
        };

        let download = Download {
            id: new_id(),
            movie_id: None,
            series_id: Some(series.id.clone()),
            season_number: Some(season),
            episode_number: Some(episode_number),
            title: release.title.clone(),
            download_url: release.download_url.clone(),
            size: release.size,
            indexer: Some(release.indexer.clone()),
            quality: Some(scored.parsed.quality.clone()),
            status: DownloadState::Queued,
            progress: 0.0,
            download_client_id: None,
            client_job_id: None,
            error_message: None,
            created_at: None,
            updated_at: None,
        };

        info!(
            series = %series.title,
            season,
            episode = episode_number,
            release = %release.title,
            "RSS match (episode)"
        );
        Ok(matches!(
            self.auto_search.grab(&scored, download).await?,
            SearchOutcome::Grabbed { .. }
        ))
    }

    /// Season packs require a strict series title match and at least one
    /// missing monitored episode in the named season.
    async fn try_season_pack(
        &self,
        release: &Release,
        parsed: &ParsedRelease,
        series: &Series,
        season: i32,
    ) -> Result<bool> {
        if !series.monitored {
            return Ok(false);
        }

        let episodes = self
            .store
            .series()
            .season_episodes(&series.id, season)
            .await?;
        let wanted: Vec<&Episode> = episodes
            .iter()
            .filter(|e| e.monitored && !e.has_file && e.has_aired())
            .collect();
        if wanted.is_empty() {
            return Ok(false);
        }

        if self
            .store
            .downloads()
            .has_active_for_episode(&series.id, season, None)
            .await?
            || self.store.downloads().has_url(&release.download_url).await?
        {
            return Ok(false);
        }

        let Some(scored) = self.evaluate_for_series(release, series, wanted[0]).await? else {
            return Ok(false);
        };

        let download = Download {
            id: new_id(),
            movie_id: None,
            series_id: Some(series.id.clone()),
            season_number: Some(season),
            episode_number: None,
            title: release.title.clone(),
            download_url: release.download_url.clone(),
            size: release.size,
            indexer: Some(release.indexer.clone()),
            quality: Some(parsed.quality.clone()),
            status: DownloadState::Queued,
            progress: 0.0,
            download_client_id: None,
            client_job_id: None,
            error_message: None,
            created_at: None,
            updated_at: None,
        };

        info!(series = %series.title, season, release = %release.title, "RSS match (season pack)");
        Ok(matches!(
            self.auto_search.grab(&scored, download).await?,
            SearchOutcome::Grabbed { .. }
        ))
    }

    async fn evaluate_for_series(
        &self,
        release: &Release,
        series: &Series,
        episode: &Episode,
    ) -> Result<Option<crate::services::selector::ScoredRelease>> {
        let Some(profile_id) = &series.quality_profile_id else {
            return Ok(None);
        };
        let Some(profile) = self.store.quality().get_profile(profile_id).await? else {
            return Ok(None);
        };

        let ladder = self.store.quality().ladder().await?;
        let blacklist = self
            .store
            .blacklist()
            .titles_for_episode(&series.id, episode.season_number, Some(episode.episode_number))
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

        let Some(scored) = evaluate(release.clone(), &request) else {
            return Ok(None);
        };

        if episode.has_file {
            let current = episode.quality.clone().unwrap_or_default();
            let preference = self.config.read().await.quality.propers_repacks_preference;
            let current_flags = ProperFlags {
                is_proper: episode.is_proper,
                is_repack: episode.is_repack,
            };
            let candidate_flags = ProperFlags {
                is_proper: scored.parsed.is_proper,
                is_repack: scored.parsed.is_repack,
            };

            if !profile.should_upgrade(
                &ladder,
                &current,
                current_flags,
                &scored.parsed.quality,
                candidate_flags,
                preference,
            ) {
                return Ok(None);
            }
        }

        Ok(Some(scored))
    }
}
