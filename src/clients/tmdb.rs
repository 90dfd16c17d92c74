use crate::clients::traits::{
    EpisodeMetadata, ExternalIdKind, ListItem, MetadataProvider, MovieCredits, MovieMetadata,
    SeasonMetadata, SeasonSummary, SeriesMetadata,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: std::time::Duration,
}

/// TMDB metadata provider.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    config: TmdbConfig,
}

impl TmdbClient {
    #[must_use]
    pub fn new(config: TmdbConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.timeout)
                .user_agent("mediastack/0.1")
                .build()
                .expect("Failed to build HTTP client"),
            config,
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Result<T> {
        if self.config.api_key.is_empty() {
            bail!("TMDB API key is not configured");
        }

        let mut url = url::Url::parse(&format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
        .context("Invalid TMDB URL")?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", &self.config.api_key);
            for (k, v) in extra {
                query.append_pair(k, v);
            }
        }

        debug!(path = %path, "TMDB request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("TMDB request failed")?
            .error_for_status()
            .context("TMDB returned an error status")?;

        Ok(response.json().await?)
    }
}

/// Pull the US theatrical/digital/physical dates out of the
/// `release_dates` appendage, falling back to the primary release date.
fn release_date_trio(
    movie: &TmdbMovie,
) -> (Option<String>, Option<String>, Option<String>) {
    let mut theatrical = None;
    let mut digital = None;
    let mut physical = None;

    if let Some(dates) = &movie.release_dates {
        let us = dates
            .results
            .iter()
            .find(|r| r.iso_3166_1 == "US")
            .or_else(|| dates.results.first());

        if let Some(region) = us {
            for entry in &region.release_dates {
                let date = entry.release_date.get(..10).map(str::to_string);
                match entry.release_type {
                    2 | 3 if theatrical.is_none() => theatrical = date,
                    4 if digital.is_none() => digital = date,
                    5 if physical.is_none() => physical = date,
                    _ => {}
                }
            }
        }
    }

    if theatrical.is_none() {
        theatrical = movie.release_date.clone().filter(|d| !d.is_empty());
    }

    (theatrical, digital, physical)
}

fn year_of(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn get_movie(&self, tmdb_id: i64) -> Result<MovieMetadata> {
        let movie: TmdbMovie = self
            .get(
                &format!("movie/{tmdb_id}"),
                &[("append_to_response", "release_dates,credits")],
            )
            .await?;

        let (theatrical, digital, physical) = release_date_trio(&movie);

        let credits = movie.credits.as_ref().map_or_else(MovieCredits::default, |c| {
            MovieCredits {
                directors: c
                    .crew
                    .iter()
                    .filter(|m| m.job.as_deref() == Some("Director"))
                    .map(|m| m.name.clone())
                    .collect(),
                writers: c
                    .crew
                    .iter()
                    .filter(|m| {
                        matches!(m.job.as_deref(), Some("Writer" | "Screenplay" | "Story"))
                    })
                    .map(|m| m.name.clone())
                    .collect(),
                cast: c.cast.iter().map(|m| m.name.clone()).collect(),
            }
        });

        Ok(MovieMetadata {
            tmdb_id: movie.id,
            imdb_id: movie.imdb_id,
            title: movie.title,
            year: year_of(theatrical.as_deref()),
            runtime: movie.runtime,
            overview: movie.overview,
            status: movie.status,
            certification: None,
            collection_title: movie.belongs_to_collection.map(|c| c.name),
            genres: movie.genres.into_iter().map(|g| g.name).collect(),
            theatrical_release_date: theatrical,
            digital_release_date: digital,
            physical_release_date: physical,
            poster_path: movie.poster_path,
            backdrop_path: movie.backdrop_path,
            credits,
            vote_average: movie.vote_average,
        })
    }

    async fn get_series(&self, tmdb_id: i64) -> Result<SeriesMetadata> {
        let series: TmdbSeries = self
            .get(
                &format!("tv/{tmdb_id}"),
                &[("append_to_response", "external_ids")],
            )
            .await?;

        Ok(SeriesMetadata {
            tmdb_id: series.id,
            tvdb_id: series.external_ids.as_ref().and_then(|e| e.tvdb_id),
            imdb_id: series.external_ids.and_then(|e| e.imdb_id),
            title: series.name,
            year: year_of(series.first_air_date.as_deref()),
            network: series.networks.into_iter().next().map(|n| n.name),
            overview: series.overview,
            status: series.status,
            genres: series.genres.into_iter().map(|g| g.name).collect(),
            poster_path: series.poster_path,
            seasons: series
                .seasons
                .into_iter()
                .map(|s| SeasonSummary {
                    season_number: s.season_number,
                    episode_count: s.episode_count,
                })
                .collect(),
        })
    }

    async fn get_season(&self, tmdb_id: i64, season_number: i32) -> Result<SeasonMetadata> {
        let season: TmdbSeason = self
            .get(&format!("tv/{tmdb_id}/season/{season_number}"), &[])
            .await?;

        Ok(SeasonMetadata {
            season_number,
            episodes: season
                .episodes
                .into_iter()
                .map(|e| EpisodeMetadata {
                    episode_number: e.episode_number,
                    title: e.name,
                    overview: e.overview,
                    air_date: e.air_date,
                })
                .collect(),
        })
    }

    async fn find_by_external_id(
        &self,
        imdb_id: &str,
        kind: ExternalIdKind,
    ) -> Result<Option<i64>> {
        let found: TmdbFind = self
            .get(
                &format!("find/{imdb_id}"),
                &[("external_source", "imdb_id")],
            )
            .await?;

        Ok(match kind {
            ExternalIdKind::Movie => found.movie_results.first().map(|r| r.id),
            ExternalIdKind::Series => found.tv_results.first().map(|r| r.id),
        })
    }

    async fn fetch_list(&self, list_type: &str, list_id: Option<&str>) -> Result<Vec<ListItem>> {
        let items: Vec<TmdbListEntry> = match list_type {
            "tmdb_popular" => {
                let page: TmdbPage = self.get("movie/popular", &[]).await?;
                page.results
            }
            "tmdb_collection" => {
                let id = list_id.context("Collection list requires a list_id")?;
                let collection: TmdbCollection = self.get(&format!("collection/{id}"), &[]).await?;
                collection.parts
            }
            "tmdb_person" => {
                let id = list_id.context("Person list requires a list_id")?;
                let credits: TmdbPersonCredits =
                    self.get(&format!("person/{id}/movie_credits"), &[]).await?;
                credits.cast
            }
            "tmdb_list" => {
                let id = list_id.context("TMDB list requires a list_id")?;
                let list: TmdbList = self.get(&format!("list/{id}"), &[]).await?;
                list.items
            }
            other => bail!("Unknown list type: {other}"),
        };

        Ok(items
            .into_iter()
            .map(|entry| ListItem {
                tmdb_id: Some(entry.id),
                imdb_id: None,
                title: entry.title.or(entry.name).unwrap_or_default(),
                year: year_of(
                    entry
                        .release_date
                        .as_deref()
                        .or(entry.first_air_date.as_deref()),
                ),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: i64,
    imdb_id: Option<String>,
    title: String,
    overview: Option<String>,
    status: Option<String>,
    runtime: Option<i32>,
    release_date: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    belongs_to_collection: Option<TmdbCollectionRef>,
    release_dates: Option<TmdbReleaseDates>,
    credits: Option<TmdbCredits>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbCollectionRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbReleaseDates {
    #[serde(default)]
    results: Vec<TmdbReleaseRegion>,
}

#[derive(Debug, Deserialize)]
struct TmdbReleaseRegion {
    iso_3166_1: String,
    #[serde(default)]
    release_dates: Vec<TmdbReleaseDate>,
}

#[derive(Debug, Deserialize)]
struct TmdbReleaseDate {
    #[serde(rename = "type")]
    release_type: i32,
    #[serde(default)]
    release_date: String,
}

#[derive(Debug, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbPerson>,
    #[serde(default)]
    crew: Vec<TmdbPerson>,
}

#[derive(Debug, Deserialize)]
struct TmdbPerson {
    name: String,
    job: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeries {
    id: i64,
    name: String,
    overview: Option<String>,
    status: Option<String>,
    first_air_date: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    #[serde(default)]
    networks: Vec<TmdbNetwork>,
    #[serde(default)]
    seasons: Vec<TmdbSeasonSummary>,
    external_ids: Option<TmdbExternalIds>,
}

#[derive(Debug, Deserialize)]
struct TmdbNetwork {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonSummary {
    season_number: i32,
    #[serde(default)]
    episode_count: i32,
}

#[derive(Debug, Deserialize)]
struct TmdbExternalIds {
    imdb_id: Option<String>,
    tvdb_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeason {
    #[serde(default)]
    episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisode {
    episode_number: i32,
    name: Option<String>,
    overview: Option<String>,
    air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbFind {
    #[serde(default)]
    movie_results: Vec<TmdbIdOnly>,
    #[serde(default)]
    tv_results: Vec<TmdbIdOnly>,
}

#[derive(Debug, Deserialize)]
struct TmdbIdOnly {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TmdbListEntry {
    id: i64,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbPage {
    #[serde(default)]
    results: Vec<TmdbListEntry>,
}

#[derive(Debug, Deserialize)]
struct TmdbCollection {
    #[serde(default)]
    parts: Vec<TmdbListEntry>,
}

#[derive(Debug, Deserialize)]
struct TmdbPersonCredits {
    #[serde(default)]
    cast: Vec<TmdbListEntry>,
}

#[derive(Debug, Deserialize)]
struct TmdbList {
    #[serde(default)]
    items: Vec<TmdbListEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_date_trio_prefers_us_typed_dates() {
        let movie: TmdbMovie = serde_json::from_str(
            r#"{
                "id": 1,
                "title": "Test",
                "release_date": "2023-01-15",
                "release_dates": {
                    "results": [{
                        "iso_3166_1": "US",
                        "release_dates": [
                            {"type": 3, "release_date": "2023-01-20T00:00:00.000Z"},
                            {"type": 4, "release_date": "2023-03-01T00:00:00.000Z"},
                            {"type": 5, "release_date": "2023-04-15T00:00:00.000Z"}
                        ]
                    }]
                }
            }"#,
        )
        .unwrap();

        let (theatrical, digital, physical) = release_date_trio(&movie);
        assert_eq!(theatrical.as_deref(), Some("2023-01-20"));
        assert_eq!(digital.as_deref(), Some("2023-03-01"));
        assert_eq!(physical.as_deref(), Some("2023-04-15"));
    }

    #[test]
    fn release_date_trio_falls_back_to_primary() {
        let movie: TmdbMovie = serde_json::from_str(
            r#"{"id": 1, "title": "Test", "release_date": "2023-01-15"}"#,
        )
        .unwrap();

        let (theatrical, digital, physical) = release_date_trio(&movie);
        assert_eq!(theatrical.as_deref(), Some("2023-01-15"));
        assert_eq!(digital, None);
        assert_eq!(physical, None);
    }
}
