use crate::entities::{exclusions, prelude::*, release_blacklist};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashSet;

pub struct ExclusionRepository {
    conn: DatabaseConnection,
}

impl ExclusionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Permanently block a TMDB id from being re-added by list sync.
    pub async fn add(
        &self,
        tmdb_id: i64,
        media_type: &str,
        title: Option<&str>,
        reason: Option<&str>,
    ) -> Result<()> {
        Exclusions::insert(exclusions::ActiveModel {
            tmdb_id: Set(tmdb_id),
            media_type: Set(media_type.to_string()),
            title: Set(title.map(str::to_string)),
            reason: Set(reason.map(str::to_string)),
            created_at: Set(Some(chrono::Utc::now().to_rfc3339())),
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::columns([
                exclusions::Column::TmdbId,
                exclusions::Column::MediaType,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;
        Ok(())
    }

    pub async fn remove(&self, tmdb_id: i64, media_type: &str) -> Result<()> {
        Exclusions::delete_many()
            .filter(exclusions::Column::TmdbId.eq(tmdb_id))
            .filter(exclusions::Column::MediaType.eq(media_type))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn contains(&self, tmdb_id: i64, media_type: &str) -> Result<bool> {
        let count = Exclusions::find()
            .filter(exclusions::Column::TmdbId.eq(tmdb_id))
            .filter(exclusions::Column::MediaType.eq(media_type))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn list(&self) -> Result<Vec<exclusions::Model>> {
        Ok(Exclusions::find()
            .order_by_desc(exclusions::Column::CreatedAt)
            .all(&self.conn)
            .await?)
    }
}

pub struct BlacklistRepository {
    conn: DatabaseConnection,
}

impl BlacklistRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn add(
        &self,
        release_title: &str,
        movie_id: Option<&str>,
        series_id: Option<&str>,
        season_number: Option<i32>,
        episode_number: Option<i32>,
        reason: Option<&str>,
    ) -> Result<()> {
        ReleaseBlacklist::insert(release_blacklist::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            release_title: Set(release_title.to_string()),
            movie_id: Set(movie_id.map(str::to_string)),
            series_id: Set(series_id.map(str::to_string)),
            season_number: Set(season_number),
            episode_number: Set(episode_number),
            reason: Set(reason.map(str::to_string)),
            created_at: Set(Some(chrono::Utc::now().to_rfc3339())),
        })
        .exec_without_returning(&self.conn)
        .await?;
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        ReleaseBlacklist::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<release_blacklist::Model>> {
        Ok(ReleaseBlacklist::find()
            .order_by_desc(release_blacklist::Column::CreatedAt)
            .all(&self.conn)
            .await?)
    }

    /// The normalized blacklisted titles scoped to one movie.
    pub async fn titles_for_movie(&self, movie_id: &str) -> Result<HashSet<String>> {
        let rows = ReleaseBlacklist::find()
            .filter(release_blacklist::Column::MovieId.eq(movie_id))
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| crate::parser::title_match::normalize_title(&r.release_title))
            .collect())
    }

    /// The normalized blacklisted titles scoped to one episode (episode
    /// scope plus whole-season entries).
    pub async fn titles_for_episode(
        &self,
        series_id: &str,
        season_number: i32,
        episode_number: Option<i32>,
    ) -> Result<HashSet<String>> {
        let rows = ReleaseBlacklist::find()
            .filter(release_blacklist::Column::SeriesId.eq(series_id))
            .filter(release_blacklist::Column::SeasonNumber.eq(season_number))
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter(|r| {
                r.episode_number.is_none() || r.episode_number == episode_number
            })
            .map(|r| crate::parser::title_match::normalize_title(&r.release_title))
            .collect())
    }
}
