use crate::db::{MovieFilter, Store, new_id};
use crate::domain::events::event_types;
use crate::models::episode::Episode;
use crate::models::movie::{MinimumAvailability, Movie, MovieCreditsInfo};
use crate::models::series::{NewSeasonMonitor, Season, Series, SeriesType};
use crate::parser::title_match::normalize_title;
use crate::quality::QualityLadder;
use crate::services::activity::ActivityService;
use crate::services::naming::FileNamer;
use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

/// Semantic catalog operations over the raw repositories. Every
/// state-changing operation also journals activity.
#[derive(Clone)]
pub struct LibraryService {
    store: Store,
    activity: ActivityService,
}

/// Parameters for creating a movie before metadata enrichment.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewMovie {
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    #[serde(default = "default_monitored")]
    pub monitored: bool,
    pub minimum_availability: Option<MinimumAvailability>,
    pub quality_profile_id: Option<String>,
    pub root_folder: Option<String>,
}

const fn default_monitored() -> bool {
    true
}

/// Parameters for creating a series.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewSeries {
    pub tmdb_id: Option<i64>,
    pub tvdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    #[serde(default = "default_monitored")]
    pub monitored: bool,
    pub series_type: Option<SeriesType>,
    pub monitor_new_seasons: Option<NewSeasonMonitor>,
    pub quality_profile_id: Option<String>,
    pub root_folder: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RelatedMovie {
    pub movie: Movie,
    pub score: i32,
}

impl LibraryService {
    #[must_use]
    pub const fn new(store: Store, activity: ActivityService) -> Self {
        Self { store, activity }
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    pub async fn create_movie(&self, new: NewMovie, namer: &FileNamer) -> Result<Movie> {
        if let Some(tmdb_id) = new.tmdb_id
            && self.store.movies().get_by_tmdb_id(tmdb_id).await?.is_some()
        {
            anyhow::bail!("Movie with TMDB id {tmdb_id} already exists");
        }

        let profile_id = match new.quality_profile_id {
            Some(id) => Some(id),
            None => self.store.quality().default_profile_id().await?,
        };

        let mut movie = Movie {
            id: new_id(),
            tmdb_id: new.tmdb_id,
            imdb_id: new.imdb_id,
            title: new.title,
            year: new.year,
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
            minimum_availability: new
                .minimum_availability
                .unwrap_or(MinimumAvailability::Released),
            monitored: new.monitored,
            has_file: false,
            file_path: None,
            file_size: None,
            quality: None,
            video_codec: None,
            audio_codec: None,
            release_group: None,
            is_proper: false,
            is_repack: false,
            quality_profile_id: profile_id,
            root_folder: new.root_folder,
            folder_path: None,
            tags: vec![],
            added_at: Some(chrono::Utc::now().to_rfc3339()),
        };

        movie.folder_path = Some(self.movie_folder_path(&movie, namer));

        self.store.movies().add(&movie).await?;
        self.activity
            .record(
                "movie",
                Some(&movie.id),
                event_types::ADDED,
                &format!("Added movie: {}", movie.title),
                None,
            )
            .await?;

        Ok(movie)
    }

    /// The canonical folder for a movie under its root.
    #[must_use]
    pub fn movie_folder_path(&self, movie: &Movie, namer: &FileNamer) -> String {
        if let Some(existing) = &movie.folder_path {
            return existing.clone();
        }

        let root = movie.root_folder.clone().unwrap_or_default();
        let folder = namer.movie_folder_name(movie);
        format!("{}/{}", root.trim_end_matches('/'), folder)
    }

    pub async fn delete_movie(
        &self,
        id: &str,
        delete_files: bool,
        add_exclusion: bool,
    ) -> Result<()> {
        let movie = self
            .store
            .movies()
            .get(id)
            .await?
            .context("Movie not found")?;

        if delete_files
            && let Some(path) = &movie.file_path
            && let Err(e) = tokio::fs::remove_file(path).await
        {
            warn!(path = %path, error = %e, "Failed to delete movie file");
        }

        if add_exclusion && let Some(tmdb_id) = movie.tmdb_id {
            self.store
                .exclusions()
                .add(tmdb_id, "movie", Some(&movie.title), Some("deleted"))
                .await?;
        }

        self.store.movies().delete(id).await?;
        self.activity
            .record(
                "movie",
                Some(id),
                event_types::DELETED,
                &format!("Deleted movie: {}", movie.title),
                Some(json!({ "deleteFiles": delete_files, "addExclusion": add_exclusion })),
            )
            .await?;

        Ok(())
    }

    pub async fn set_movie_monitored(&self, id: &str, monitored: bool) -> Result<()> {
        self.store.movies().set_monitored(id, monitored).await?;

        if !monitored {
            self.activity
                .record(
                    "movie",
                    Some(id),
                    event_types::UNMONITORED,
                    "Movie unmonitored",
                    None,
                )
                .await?;
        }
        Ok(())
    }

    pub async fn create_series(&self, new: NewSeries, namer: &FileNamer) -> Result<Series> {
        if let Some(tmdb_id) = new.tmdb_id
            && self.store.series().get_by_tmdb_id(tmdb_id).await?.is_some()
        {
            anyhow::bail!("Series with TMDB id {tmdb_id} already exists");
        }

        let profile_id = match new.quality_profile_id {
            Some(id) => Some(id),
            None => self.store.quality().default_profile_id().await?,
        };

        let mut series = Series {
            id: new_id(),
            tvdb_id: new.tvdb_id,
            tmdb_id: new.tmdb_id,
            imdb_id: new.imdb_id,
            title: new.title,
            year: new.year,
            network: None,
            overview: None,
            status: None,
            series_type: new.series_type.unwrap_or(SeriesType::Standard),
            monitor_new_seasons: new.monitor_new_seasons.unwrap_or(NewSeasonMonitor::All),
            use_season_folder: true,
            monitored: new.monitored,
            quality_profile_id: profile_id,
            root_folder: new.root_folder,
            folder_path: None,
            poster_path: None,
            genres: vec![],
            tags: vec![],
            added_at: Some(chrono::Utc::now().to_rfc3339()),
        };

        let root = series.root_folder.clone().unwrap_or_default();
        series.folder_path = Some(format!(
            "{}/{}",
            root.trim_end_matches('/'),
            namer.series_folder_name(&series)
        ));

        self.store.series().add(&series, &[], &[]).await?;
        self.activity
            .record(
                "series",
                Some(&series.id),
                event_types::ADDED,
                &format!("Added series: {}", series.title),
                None,
            )
            .await?;

        Ok(series)
    }

    pub async fn delete_series(
        &self,
        id: &str,
        delete_files: bool,
        add_exclusion: bool,
    ) -> Result<()> {
        let series = self
            .store
            .series()
            .get(id)
            .await?
            .context("Series not found")?;

        if delete_files {
            for episode in self.store.series().episodes(id).await? {
                if let Some(path) = &episode.file_path
                    && let Err(e) = tokio::fs::remove_file(path).await
                {
                    warn!(path = %path, error = %e, "Failed to delete episode file");
                }
            }
        }

        if add_exclusion && let Some(tmdb_id) = series.tmdb_id {
            self.store
                .exclusions()
                .add(tmdb_id, "series", Some(&series.title), Some("deleted"))
                .await?;
        }

        self.store.series().delete(id).await?;
        self.activity
            .record(
                "series",
                Some(id),
                event_types::DELETED,
                &format!("Deleted series: {}", series.title),
                None,
            )
            .await?;

        Ok(())
    }

    /// Series-level monitor cascade: the flag reaches every season and
    /// episode atomically.
    pub async fn set_series_monitored(&self, id: &str, monitored: bool) -> Result<()> {
        self.store.series().cascade_monitor(id, monitored).await?;

        if !monitored {
            self.activity
                .record(
                    "series",
                    Some(id),
                    event_types::UNMONITORED,
                    "Series unmonitored (cascaded to seasons and episodes)",
                    None,
                )
                .await?;
        }
        Ok(())
    }

    pub async fn set_season_monitored(
        &self,
        series_id: &str,
        season_number: i32,
        monitored: bool,
    ) -> Result<()> {
        self.store
            .series()
            .set_season_monitored(series_id, season_number, monitored)
            .await?;

        if !monitored {
            self.activity
                .record(
                    "series",
                    Some(series_id),
                    event_types::UNMONITORED,
                    &format!("Season {season_number} unmonitored"),
                    None,
                )
                .await?;
        }
        Ok(())
    }

    /// Monitored, file-less movies that have passed their availability
    /// threshold. The gate is evaluated now, not at add time.
    pub async fn find_missing_and_available(&self) -> Result<Vec<Movie>> {
        Ok(self
            .store
            .movies()
            .find_missing()
            .await?
            .into_iter()
            .filter(Movie::is_available)
            .collect())
    }

    /// Monitored, aired, file-less episodes.
    pub async fn find_missing_aired_episodes(&self) -> Result<Vec<Episode>> {
        Ok(self
            .store
            .series()
            .find_missing_episodes()
            .await?
            .into_iter()
            .filter(Episode::has_aired)
            .collect())
    }

    /// Movies holding a file whose profile still allows an upgrade.
    pub async fn find_movies_cutoff_unmet(&self, ladder: &QualityLadder) -> Result<Vec<Movie>> {
        let mut unmet = Vec::new();

        for movie in self.store.movies().find_with_files().await? {
            let Some(profile_id) = &movie.quality_profile_id else {
                continue;
            };
            let Some(profile) = self.store.quality().get_profile(profile_id).await? else {
                continue;
            };
            let Some(quality) = &movie.quality else {
                continue;
            };

            if profile.upgrade_allowed && !profile.meets_cutoff(ladder, quality) {
                unmet.push(movie);
            }
        }

        Ok(unmet)
    }

    /// Episodes holding a file whose series profile still allows an
    /// upgrade.
    pub async fn find_episodes_cutoff_unmet(
        &self,
        ladder: &QualityLadder,
    ) -> Result<Vec<Episode>> {
        let mut unmet = Vec::new();
        let episodes = self.store.series().find_episodes_with_files().await?;

        for episode in episodes {
            let Some(series) = self.store.series().get(&episode.series_id).await? else {
                continue;
            };
            let Some(profile_id) = &series.quality_profile_id else {
                continue;
            };
            let Some(profile) = self.store.quality().get_profile(profile_id).await? else {
                continue;
            };
            let Some(quality) = &episode.quality else {
                continue;
            };

            if profile.upgrade_allowed && !profile.meets_cutoff(ladder, quality) {
                unmet.push(episode);
            }
        }

        Ok(unmet)
    }

    pub async fn list_movies(&self, filter: &MovieFilter) -> Result<Vec<Movie>> {
        self.store.movies().list(filter).await
    }

    /// Rank the library's other movies by relatedness to one movie.
    pub async fn related_movies(&self, movie_id: &str, top_k: usize) -> Result<Vec<RelatedMovie>> {
        let target = self
            .store
            .movies()
            .get(movie_id)
            .await?
            .context("Movie not found")?;

        let mut related: Vec<RelatedMovie> = self
            .store
            .movies()
            .all()
            .await?
            .into_iter()
            .filter(|m| m.id != target.id)
            .filter_map(|candidate| {
                let score = relatedness_score(&target, &candidate);
                (score > 0).then_some(RelatedMovie {
                    movie: candidate,
                    score,
                })
            })
            .collect();

        related.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| {
                    b.movie
                        .vote_average
                        .unwrap_or(0.0)
                        .total_cmp(&a.movie.vote_average.unwrap_or(0.0))
                })
                .then_with(|| b.movie.year.cmp(&a.movie.year))
        });

        related.truncate(top_k);
        Ok(related)
    }

    pub async fn record_scan_completed(&self, scanned: usize, updated: usize) -> Result<()> {
        info!(scanned, updated, "Library scan finished");
        self.activity
            .record(
                "system",
                None,
                event_types::SCAN_COMPLETED,
                &format!("Library scan completed: {scanned} items scanned, {updated} updated"),
                Some(json!({ "scanned": scanned, "updated": updated })),
            )
            .await
    }
}

/// Relatedness heuristic between two movies: shared collection, shared
/// directors/writers, shared leads, franchise title prefix. Ties break
/// on vote average then recency.
fn relatedness_score(a: &Movie, b: &Movie) -> i32 {
    let mut score = 0;

    if let (Some(ca), Some(cb)) = (&a.collection_title, &b.collection_title)
        && ca == cb
    {
        score += 100;
    }

    for person in &a.credits.directors {
        if b.credits.directors.contains(person) {
            score += 40;
        }
    }
    for person in &a.credits.writers {
        if b.credits.writers.contains(person) {
            score += 40;
        }
    }

    let leads_a: Vec<&String> = a.credits.cast.iter().take(5).collect();
    let leads_b: Vec<&String> = b.credits.cast.iter().take(5).collect();
    let shared_leads = leads_a.iter().filter(|p| leads_b.contains(p)).count();
    if shared_leads >= 2 {
        score += 50 + 10 * (i32::try_from(shared_leads).unwrap_or(2) - 2);
    }

    let norm_a = normalize_title(&a.title);
    let norm_b = normalize_title(&b.title);
    if !norm_a.is_empty()
        && !norm_b.is_empty()
        && (norm_b.starts_with(&format!("{norm_a} ")) || norm_a.starts_with(&format!("{norm_b} ")))
    {
        score += 100;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str) -> Movie {
        Movie {
            id: new_id(),
            tmdb_id: None,
            imdb_id: None,
            title: title.to_string(),
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
            minimum_availability: MinimumAvailability::Released,
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
    fn shared_collection_scores_high() {
        let mut a = movie("Dune");
        let mut b = movie("Dune Part Two");
        a.collection_title = Some("Dune Collection".to_string());
        b.collection_title = Some("Dune Collection".to_string());

        // Collection plus franchise prefix.
        assert_eq!(relatedness_score(&a, &b), 200);
    }

    #[test]
    fn shared_crew_and_cast() {
        let mut a = movie("Movie One");
        let mut b = movie("Other Picture");
        a.credits.directors = vec!["Jane Doe".to_string()];
        b.credits.directors = vec!["Jane Doe".to_string()];
        a.credits.cast = vec!["A".into(), "B".into(), "C".into()];
        b.credits.cast = vec!["A".into(), "B".into(), "C".into()];

        // 40 for the director, 50 + 10 for three shared leads.
        assert_eq!(relatedness_score(&a, &b), 100);
    }

    #[test]
    fn unrelated_scores_zero() {
        let a = movie("Alpha");
        let b = movie("Beta");
        assert_eq!(relatedness_score(&a, &b), 0);
    }

    #[test]
    fn franchise_prefix_requires_word_boundary() {
        let a = movie("It");
        let b = movie("Italian Holiday");
        assert_eq!(relatedness_score(&a, &b), 0);
    }
}
