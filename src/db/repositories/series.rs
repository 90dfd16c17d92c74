use crate::entities::{episodes, seasons, series};
use crate::models::episode::Episode;
use crate::models::media::MediaInfo;
use crate::models::series::{NewSeasonMonitor, Season, Series, SeriesType};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

pub struct SeriesRepository {
    conn: DatabaseConnection,
}

#[derive(Debug, Clone, Default)]
pub struct SeriesFilter {
    pub monitored: Option<bool>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn parse_json_vec(value: Option<&str>) -> Vec<String> {
    value
        .and_then(|v| serde_json::from_str(v).ok())
        .unwrap_or_default()
}

fn to_json_vec(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        serde_json::to_string(values).ok()
    }
}

fn map_series(m: series::Model) -> Series {
    Series {
        genres: parse_json_vec(m.genres.as_deref()),
        tags: parse_json_vec(m.tags.as_deref()),
        series_type: SeriesType::parse(&m.series_type),
        monitor_new_seasons: NewSeasonMonitor::parse(&m.monitor_new_seasons),
        id: m.id,
        tvdb_id: m.tvdb_id,
        tmdb_id: m.tmdb_id,
        imdb_id: m.imdb_id,
        title: m.title,
        year: m.year,
        network: m.network,
        overview: m.overview,
        status: m.status,
        use_season_folder: m.use_season_folder,
        monitored: m.monitored,
        quality_profile_id: m.quality_profile_id,
        root_folder: m.root_folder,
        folder_path: m.folder_path,
        poster_path: m.poster_path,
        added_at: m.added_at,
    }
}

fn series_active_model(s: &Series) -> series::ActiveModel {
    series::ActiveModel {
        id: Set(s.id.clone()),
        tvdb_id: Set(s.tvdb_id),
        tmdb_id: Set(s.tmdb_id),
        imdb_id: Set(s.imdb_id.clone()),
        title: Set(s.title.clone()),
        year: Set(s.year),
        network: Set(s.network.clone()),
        overview: Set(s.overview.clone()),
        status: Set(s.status.clone()),
        series_type: Set(s.series_type.as_str().to_string()),
        monitor_new_seasons: Set(s.monitor_new_seasons.as_str().to_string()),
        use_season_folder: Set(s.use_season_folder),
        monitored: Set(s.monitored),
        quality_profile_id: Set(s.quality_profile_id.clone()),
        root_folder: Set(s.root_folder.clone()),
        folder_path: Set(s.folder_path.clone()),
        poster_path: Set(s.poster_path.clone()),
        genres: Set(to_json_vec(&s.genres)),
        tags: Set(to_json_vec(&s.tags)),
        added_at: Set(s.added_at.clone()),
    }
}

fn map_season(m: seasons::Model) -> Season {
    Season {
        series_id: m.series_id,
        season_number: m.season_number,
        monitored: m.monitored,
        episode_count: m.episode_count,
        episode_file_count: m.episode_file_count,
    }
}

fn map_episode(m: episodes::Model) -> Episode {
    Episode {
        id: m.id,
        series_id: m.series_id,
        season_number: m.season_number,
        episode_number: m.episode_number,
        title: m.title,
        overview: m.overview,
        air_date: m.air_date,
        monitored: m.monitored,
        has_file: m.has_file,
        file_path: m.file_path,
        file_size: m.file_size,
        quality: m.quality,
        video_codec: m.video_codec,
        audio_codec: m.audio_codec,
        release_group: m.release_group,
        is_proper: m.is_proper,
        is_repack: m.is_repack,
        absolute_number: m.absolute_number,
    }
}

fn episode_active_model(e: &Episode) -> episodes::ActiveModel {
    episodes::ActiveModel {
        id: Set(e.id.clone()),
        series_id: Set(e.series_id.clone()),
        season_number: Set(e.season_number),
        episode_number: Set(e.episode_number),
        title: Set(e.title.clone()),
        overview: Set(e.overview.clone()),
        air_date: Set(e.air_date.clone()),
        monitored: Set(e.monitored),
        has_file: Set(e.has_file),
        file_path: Set(e.file_path.clone()),
        file_size: Set(e.file_size),
        quality: Set(e.quality.clone()),
        video_codec: Set(e.video_codec.clone()),
        audio_codec: Set(e.audio_codec.clone()),
        release_group: Set(e.release_group.clone()),
        is_proper: Set(e.is_proper),
        is_repack: Set(e.is_repack),
        absolute_number: Set(e.absolute_number),
    }
}

impl SeriesRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a series together with its seasons and episodes.
    pub async fn add(
        &self,
        series: &Series,
        seasons: &[Season],
        episodes: &[Episode],
    ) -> Result<()> {
        let txn = self.conn.begin().await?;

        series::Entity::insert(series_active_model(series))
            .exec_without_returning(&txn)
            .await?;

        for season in seasons {
            seasons::Entity::insert(seasons::ActiveModel {
                series_id: Set(season.series_id.clone()),
                season_number: Set(season.season_number),
                monitored: Set(season.monitored),
                episode_count: Set(season.episode_count),
                episode_file_count: Set(season.episode_file_count),
            })
            .exec_without_returning(&txn)
            .await?;
        }

        for episode in episodes {
            episodes::Entity::insert(episode_active_model(episode))
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    pub async fn update(&self, series: &Series) -> Result<()> {
        series::Entity::update(series_active_model(series))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Series>> {
        Ok(series::Entity::find_by_id(id).one(&self.conn).await?.map(map_series))
    }

    pub async fn get_by_tmdb_id(&self, tmdb_id: i64) -> Result<Option<Series>> {
        Ok(series::Entity::find()
            .filter(series::Column::TmdbId.eq(tmdb_id))
            .one(&self.conn)
            .await?
            .map(map_series))
    }

    pub async fn list(&self, filter: &SeriesFilter) -> Result<Vec<Series>> {
        let mut query = series::Entity::find().order_by_asc(series::Column::Title);

        if let Some(monitored) = filter.monitored {
            query = query.filter(series::Column::Monitored.eq(monitored));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filter.offset {
            query = query.offset(offset);
        }

        Ok(query
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_series)
            .collect())
    }

    pub async fn all(&self) -> Result<Vec<Series>> {
        Ok(series::Entity::find()
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_series)
            .collect())
    }

    /// Delete a series and everything under it in one transaction.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let txn = self.conn.begin().await?;

        episodes::Entity::delete_many()
            .filter(episodes::Column::SeriesId.eq(id))
            .exec(&txn)
            .await?;
        seasons::Entity::delete_many()
            .filter(seasons::Column::SeriesId.eq(id))
            .exec(&txn)
            .await?;
        series::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Propagate a monitored flag from the series down to every season and
    /// episode, atomically.
    pub async fn cascade_monitor(&self, series_id: &str, monitored: bool) -> Result<()> {
        let txn = self.conn.begin().await?;

        series::Entity::update_many()
            .col_expr(
                series::Column::Monitored,
                sea_orm::sea_query::Expr::value(monitored),
            )
            .filter(series::Column::Id.eq(series_id))
            .exec(&txn)
            .await?;

        seasons::Entity::update_many()
            .col_expr(
                seasons::Column::Monitored,
                sea_orm::sea_query::Expr::value(monitored),
            )
            .filter(seasons::Column::SeriesId.eq(series_id))
            .exec(&txn)
            .await?;

        episodes::Entity::update_many()
            .col_expr(
                episodes::Column::Monitored,
                sea_orm::sea_query::Expr::value(monitored),
            )
            .filter(episodes::Column::SeriesId.eq(series_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Set a season's monitored flag (with its episodes). Unmonitoring the
    /// last monitored season auto-unmonitors the series, in the same
    /// transaction.
    pub async fn set_season_monitored(
        &self,
        series_id: &str,
        season_number: i32,
        monitored: bool,
    ) -> Result<()> {
        let txn = self.conn.begin().await?;

        seasons::Entity::update_many()
            .col_expr(
                seasons::Column::Monitored,
                sea_orm::sea_query::Expr::value(monitored),
            )
            .filter(seasons::Column::SeriesId.eq(series_id))
            .filter(seasons::Column::SeasonNumber.eq(season_number))
            .exec(&txn)
            .await?;

        episodes::Entity::update_many()
            .col_expr(
                episodes::Column::Monitored,
                sea_orm::sea_query::Expr::value(monitored),
            )
            .filter(episodes::Column::SeriesId.eq(series_id))
            .filter(episodes::Column::SeasonNumber.eq(season_number))
            .exec(&txn)
            .await?;

        if !monitored {
            let still_monitored = seasons::Entity::find()
                .filter(seasons::Column::SeriesId.eq(series_id))
                .filter(seasons::Column::Monitored.eq(true))
                .count(&txn)
                .await?;

            if still_monitored == 0 {
                series::Entity::update_many()
                    .col_expr(
                        series::Column::Monitored,
                        sea_orm::sea_query::Expr::value(false),
                    )
                    .filter(series::Column::Id.eq(series_id))
                    .exec(&txn)
                    .await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    pub async fn seasons(&self, series_id: &str) -> Result<Vec<Season>> {
        Ok(seasons::Entity::find()
            .filter(seasons::Column::SeriesId.eq(series_id))
            .order_by_asc(seasons::Column::SeasonNumber)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_season)
            .collect())
    }

    pub async fn upsert_season(&self, season: &Season) -> Result<()> {
        seasons::Entity::insert(seasons::ActiveModel {
            series_id: Set(season.series_id.clone()),
            season_number: Set(season.season_number),
            monitored: Set(season.monitored),
            episode_count: Set(season.episode_count),
            episode_file_count: Set(season.episode_file_count),
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::columns([
                seasons::Column::SeriesId,
                seasons::Column::SeasonNumber,
            ])
            .update_columns([seasons::Column::EpisodeCount, seasons::Column::EpisodeFileCount])
            .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;
        Ok(())
    }

    /// Persist the per-season statistics computed by the metadata-refresh
    /// worker.
    pub async fn update_season_stats(
        &self,
        series_id: &str,
        season_number: i32,
        episode_count: i32,
        episode_file_count: i32,
    ) -> Result<()> {
        seasons::Entity::update_many()
            .col_expr(
                seasons::Column::EpisodeCount,
                sea_orm::sea_query::Expr::value(episode_count),
            )
            .col_expr(
                seasons::Column::EpisodeFileCount,
                sea_orm::sea_query::Expr::value(episode_file_count),
            )
            .filter(seasons::Column::SeriesId.eq(series_id))
            .filter(seasons::Column::SeasonNumber.eq(season_number))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn upsert_episode(&self, episode: &Episode) -> Result<()> {
        episodes::Entity::insert(episode_active_model(episode))
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    episodes::Column::SeriesId,
                    episodes::Column::SeasonNumber,
                    episodes::Column::EpisodeNumber,
                ])
                .update_columns([
                    episodes::Column::Title,
                    episodes::Column::Overview,
                    episodes::Column::AirDate,
                    episodes::Column::AbsoluteNumber,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn get_episode(&self, id: &str) -> Result<Option<Episode>> {
        Ok(episodes::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(map_episode))
    }

    pub async fn find_episode(
        &self,
        series_id: &str,
        season_number: i32,
        episode_number: i32,
    ) -> Result<Option<Episode>> {
        Ok(episodes::Entity::find()
            .filter(episodes::Column::SeriesId.eq(series_id))
            .filter(episodes::Column::SeasonNumber.eq(season_number))
            .filter(episodes::Column::EpisodeNumber.eq(episode_number))
            .one(&self.conn)
            .await?
            .map(map_episode))
    }

    pub async fn episodes(&self, series_id: &str) -> Result<Vec<Episode>> {
        Ok(episodes::Entity::find()
            .filter(episodes::Column::SeriesId.eq(series_id))
            .order_by_asc(episodes::Column::SeasonNumber)
            .order_by_asc(episodes::Column::EpisodeNumber)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_episode)
            .collect())
    }

    pub async fn season_episodes(&self, series_id: &str, season_number: i32) -> Result<Vec<Episode>> {
        Ok(episodes::Entity::find()
            .filter(episodes::Column::SeriesId.eq(series_id))
            .filter(episodes::Column::SeasonNumber.eq(season_number))
            .order_by_asc(episodes::Column::EpisodeNumber)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_episode)
            .collect())
    }

    /// Monitored episodes with no file, across all monitored series. Air
    /// date gating happens in the caller.
    pub async fn find_missing_episodes(&self) -> Result<Vec<Episode>> {
        Ok(episodes::Entity::find()
            .filter(episodes::Column::Monitored.eq(true))
            .filter(episodes::Column::HasFile.eq(false))
            .order_by_asc(episodes::Column::SeriesId)
            .order_by_asc(episodes::Column::SeasonNumber)
            .order_by_asc(episodes::Column::EpisodeNumber)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_episode)
            .collect())
    }

    pub async fn find_episodes_with_files(&self) -> Result<Vec<Episode>> {
        Ok(episodes::Entity::find()
            .filter(episodes::Column::Monitored.eq(true))
            .filter(episodes::Column::HasFile.eq(true))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_episode)
            .collect())
    }

    pub async fn set_episode_monitored(&self, id: &str, monitored: bool) -> Result<()> {
        episodes::Entity::update_many()
            .col_expr(
                episodes::Column::Monitored,
                sea_orm::sea_query::Expr::value(monitored),
            )
            .filter(episodes::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Record an imported file on an episode row.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_episode_file(
        &self,
        id: &str,
        file_path: &str,
        file_size: Option<i64>,
        quality: &str,
        media_info: Option<&MediaInfo>,
        release_group: Option<&str>,
        is_proper: bool,
        is_repack: bool,
    ) -> Result<()> {
        let model = episodes::ActiveModel {
            id: Set(id.to_string()),
            has_file: Set(true),
            file_path: Set(Some(file_path.to_string())),
            file_size: Set(file_size),
            quality: Set(Some(quality.to_string())),
            video_codec: Set(media_info.map(|m| m.video_codec.clone())),
            audio_codec: Set(media_info.map(|m| m.audio_codec.clone())),
            release_group: Set(release_group.map(str::to_string)),
            is_proper: Set(is_proper),
            is_repack: Set(is_repack),
            ..Default::default()
        };

        episodes::Entity::update(model).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn clear_episode_file(&self, id: &str) -> Result<()> {
        let model = episodes::ActiveModel {
            id: Set(id.to_string()),
            has_file: Set(false),
            file_path: Set(None),
            file_size: Set(None),
            quality: Set(None),
            video_codec: Set(None),
            audio_codec: Set(None),
            release_group: Set(None),
            is_proper: Set(false),
            is_repack: Set(false),
            ..Default::default()
        };

        episodes::Entity::update(model).exec(&self.conn).await?;
        Ok(())
    }

    /// Recompute anime absolute numbering from the ordered list of
    /// non-zero seasons. Season 0 never participates.
    pub async fn assign_absolute_numbers(&self, series_id: &str) -> Result<()> {
        let episodes = self.episodes(series_id).await?;
        let txn = self.conn.begin().await?;

        let mut absolute = 0;
        for episode in episodes
            .iter()
            .filter(|e| e.season_number > 0)
        {
            absolute += 1;
            episodes::Entity::update_many()
                .col_expr(
                    episodes::Column::AbsoluteNumber,
                    sea_orm::sea_query::Expr::value(absolute),
                )
                .filter(episodes::Column::Id.eq(&episode.id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(series::Entity::find().count(&self.conn).await?)
    }
}
