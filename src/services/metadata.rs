use crate::clients::{MetadataProvider, SeriesMetadata};
use crate::db::{Store, new_id};
use crate::models::episode::Episode;
use crate::models::movie::MovieCreditsInfo;
use crate::models::series::{NewSeasonMonitor, Season, SeriesType};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Metadata enrichment for placeholders and the periodic refresh worker.
#[derive(Clone)]
pub struct MetadataService {
    store: Store,
    provider: Arc<dyn MetadataProvider>,
}

impl MetadataService {
    #[must_use]
    pub fn new(store: Store, provider: Arc<dyn MetadataProvider>) -> Self {
        Self { store, provider }
    }

    /// Fill a movie's metadata from the provider.
    pub async fn enrich_movie(&self, movie_id: &str) -> Result<()> {
        let mut movie = self
            .store
            .movies()
            .get(movie_id)
            .await?
            .context("Movie not found")?;
        let tmdb_id = movie.tmdb_id.context("Movie has no TMDB id")?;

        let meta = self.provider.get_movie(tmdb_id).await?;

        movie.imdb_id = meta.imdb_id.or(movie.imdb_id);
        movie.title = meta.title;
        movie.year = meta.year.or(movie.year);
        movie.runtime = meta.runtime;
        movie.overview = meta.overview;
        movie.status = meta.status;
        movie.certification = meta.certification;
        movie.collection_title = meta.collection_title;
        movie.genres = meta.genres;
        movie.credits = MovieCreditsInfo {
            directors: meta.credits.directors,
            writers: meta.credits.writers,
            cast: meta.credits.cast,
        };
        movie.vote_average = meta.vote_average;
        movie.theatrical_release_date = meta.theatrical_release_date;
        movie.digital_release_date = meta.digital_release_date;
        movie.physical_release_date = meta.physical_release_date;
        movie.poster_path = meta.poster_path;
        movie.backdrop_path = meta.backdrop_path;

        self.store.movies().update(&movie).await?;
        debug!(movie = %movie.title, "Movie metadata refreshed");
        Ok(())
    }

    /// Fill a series' metadata and materialize its seasons and episodes.
    /// `initial_monitor` controls which seasons start monitored when they
    /// are first created; existing rows keep their flags.
    pub async fn enrich_series(
        &self,
        series_id: &str,
        initial_monitor: Option<&str>,
    ) -> Result<()> {
        let mut series = self
            .store
            .series()
            .get(series_id)
            .await?
            .context("Series not found")?;
        let tmdb_id = series.tmdb_id.context("Series has no TMDB id")?;

        let meta = self.provider.get_series(tmdb_id).await?;

        series.tvdb_id = meta.tvdb_id.or(series.tvdb_id);
        series.imdb_id = meta.imdb_id.clone().or(series.imdb_id);
        series.title = meta.title.clone();
        series.year = meta.year.or(series.year);
        series.network = meta.network.clone();
        series.overview = meta.overview.clone();
        series.status = meta.status.clone();
        series.genres = meta.genres.clone();
        series.poster_path = meta.poster_path.clone();
        self.store.series().update(&series).await?;

        self.materialize_seasons(&series.id, tmdb_id, &meta, initial_monitor)
            .await?;

        if series.series_type == SeriesType::Anime {
            self.store.series().assign_absolute_numbers(&series.id).await?;
        }

        self.persist_season_stats(&series.id).await?;

        info!(series = %series.title, "Series metadata refreshed");
        Ok(())
    }

    async fn materialize_seasons(
        &self,
        series_id: &str,
        tmdb_id: i64,
        meta: &SeriesMetadata,
        initial_monitor: Option<&str>,
    ) -> Result<()> {
        let existing: std::collections::HashMap<i32, bool> = self
            .store
            .series()
            .seasons(series_id)
            .await?
            .into_iter()
            .map(|s| (s.season_number, s.monitored))
            .collect();

        let latest_season = meta
            .seasons
            .iter()
            .map(|s| s.season_number)
            .filter(|n| *n > 0)
            .max()
            .unwrap_or(0);

        for summary in &meta.seasons {
            let number = summary.season_number;

            // Season 0 holds specials; it is created unmonitored and kept
            // out of automation by default. Existing seasons keep their
            // operator-set flag; new episodes inherit it.
            let monitored = existing.get(&number).copied().unwrap_or_else(|| {
                if number == 0 {
                    false
                } else {
                    match initial_monitor {
                        Some("none") => false,
                        Some("firstSeason") => number == 1,
                        Some("latestSeason") => number == latest_season,
                        _ => true,
                    }
                }
            });

            if !existing.contains_key(&number) {
                self.store
                    .series()
                    .upsert_season(&Season {
                        series_id: series_id.to_string(),
                        season_number: number,
                        monitored,
                        episode_count: summary.episode_count,
                        episode_file_count: 0,
                    })
                    .await?;
            }

            let season_meta = match self.provider.get_season(tmdb_id, number).await {
                Ok(m) => m,
                Err(e) => {
                    warn!(season = number, error = %e, "Failed to fetch season metadata");
                    continue;
                }
            };

            for episode_meta in season_meta.episodes {
                let episode = Episode {
                    id: new_id(),
                    series_id: series_id.to_string(),
                    season_number: number,
                    episode_number: episode_meta.episode_number,
                    title: episode_meta.title,
                    overview: episode_meta.overview,
                    air_date: episode_meta.air_date,
                    monitored,
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
                };
                self.store.series().upsert_episode(&episode).await?;
            }
        }

        Ok(())
    }

    /// Recount and persist per-season statistics.
    async fn persist_season_stats(&self, series_id: &str) -> Result<()> {
        let episodes = self.store.series().episodes(series_id).await?;
        let seasons = self.store.series().seasons(series_id).await?;

        for season in seasons {
            let in_season: Vec<&Episode> = episodes
                .iter()
                .filter(|e| e.season_number == season.season_number)
                .collect();
            let with_file = in_season.iter().filter(|e| e.has_file).count();

            self.store
                .series()
                .update_season_stats(
                    series_id,
                    season.season_number,
                    i32::try_from(in_season.len()).unwrap_or(i32::MAX),
                    i32::try_from(with_file).unwrap_or(i32::MAX),
                )
                .await?;
        }

        Ok(())
    }

    /// The metadata-refresh worker body: refresh every movie and series
    /// that carries an external id. New seasons follow the series'
    /// `monitor_new_seasons` policy.
    pub async fn refresh_all(&self) -> Result<()> {
        let start = std::time::Instant::now();
        let mut refreshed = 0;
        let mut errors = 0;

        for movie in self.store.movies().all().await? {
            if movie.tmdb_id.is_none() {
                continue;
            }
            match self.enrich_movie(&movie.id).await {
                Ok(()) => refreshed += 1,
                Err(e) => {
                    warn!(movie = %movie.title, error = %e, "Movie refresh failed");
                    errors += 1;
                }
            }
        }

        for series in self.store.series().all().await? {
            if series.tmdb_id.is_none() {
                continue;
            }

            let new_season_monitor = match series.monitor_new_seasons {
                NewSeasonMonitor::None => Some("none"),
                NewSeasonMonitor::All | NewSeasonMonitor::Future | NewSeasonMonitor::Current => {
                    Some("latestSeason")
                }
            };

            match self.enrich_series(&series.id, new_season_monitor).await {
                Ok(()) => refreshed += 1,
                Err(e) => {
                    warn!(series = %series.title, error = %e, "Series refresh failed");
                    errors += 1;
                }
            }
        }

        info!(
            event = "metadata_refresh_finished",
            refreshed,
            errors,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Metadata refresh finished"
        );
        Ok(())
    }
}
