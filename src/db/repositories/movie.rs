use crate::entities::{movies, prelude::*};
use crate::models::media::MediaInfo;
use crate::models::movie::{MinimumAvailability, Movie, MovieCreditsInfo};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

pub struct MovieRepository {
    conn: DatabaseConnection,
}

#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub monitored: Option<bool>,
    pub missing: Option<bool>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MovieCounts {
    pub total: u64,
    pub monitored: u64,
    pub with_file: u64,
    pub missing: u64,
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

fn map_model(m: movies::Model) -> Movie {
    Movie {
        genres: parse_json_vec(m.genres.as_deref()),
        credits: m
            .credits
            .as_deref()
            .and_then(|c| serde_json::from_str::<MovieCreditsInfo>(c).ok())
            .unwrap_or_default(),
        vote_average: m.vote_average,
        tags: parse_json_vec(m.tags.as_deref()),
        minimum_availability: MinimumAvailability::parse(&m.minimum_availability),
        id: m.id,
        tmdb_id: m.tmdb_id,
        imdb_id: m.imdb_id,
        title: m.title,
        year: m.year,
        runtime: m.runtime,
        overview: m.overview,
        status: m.status,
        certification: m.certification,
        collection_title: m.collection_title,
        theatrical_release_date: m.theatrical_release_date,
        digital_release_date: m.digital_release_date,
        physical_release_date: m.physical_release_date,
        poster_path: m.poster_path,
        backdrop_path: m.backdrop_path,
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
        quality_profile_id: m.quality_profile_id,
        root_folder: m.root_folder,
        folder_path: m.folder_path,
        added_at: m.added_at,
    }
}

fn to_active_model(movie: &Movie) -> movies::ActiveModel {
    movies::ActiveModel {
        id: Set(movie.id.clone()),
        tmdb_id: Set(movie.tmdb_id),
        imdb_id: Set(movie.imdb_id.clone()),
        title: Set(movie.title.clone()),
        year: Set(movie.year),
        runtime: Set(movie.runtime),
        overview: Set(movie.overview.clone()),
        status: Set(movie.status.clone()),
        certification: Set(movie.certification.clone()),
        collection_title: Set(movie.collection_title.clone()),
        genres: Set(to_json_vec(&movie.genres)),
        credits: Set(if movie.credits == MovieCreditsInfo::default() {
            None
        } else {
            serde_json::to_string(&movie.credits).ok()
        }),
        vote_average: Set(movie.vote_average),
        theatrical_release_date: Set(movie.theatrical_release_date.clone()),
        digital_release_date: Set(movie.digital_release_date.clone()),
        physical_release_date: Set(movie.physical_release_date.clone()),
        poster_path: Set(movie.poster_path.clone()),
        backdrop_path: Set(movie.backdrop_path.clone()),
        minimum_availability: Set(movie.minimum_availability.as_str().to_string()),
        monitored: Set(movie.monitored),
        has_file: Set(movie.has_file),
        file_path: Set(movie.file_path.clone()),
        file_size: Set(movie.file_size),
        quality: Set(movie.quality.clone()),
        video_codec: Set(movie.video_codec.clone()),
        audio_codec: Set(movie.audio_codec.clone()),
        release_group: Set(movie.release_group.clone()),
        is_proper: Set(movie.is_proper),
        is_repack: Set(movie.is_repack),
        quality_profile_id: Set(movie.quality_profile_id.clone()),
        root_folder: Set(movie.root_folder.clone()),
        folder_path: Set(movie.folder_path.clone()),
        tags: Set(to_json_vec(&movie.tags)),
        added_at: Set(movie.added_at.clone()),
    }
}

impl MovieRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, movie: &Movie) -> Result<()> {
        Movies::insert(to_active_model(movie))
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn update(&self, movie: &Movie) -> Result<()> {
        Movies::update(to_active_model(movie)).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Movie>> {
        Ok(Movies::find_by_id(id).one(&self.conn).await?.map(map_model))
    }

    pub async fn get_by_tmdb_id(&self, tmdb_id: i64) -> Result<Option<Movie>> {
        Ok(Movies::find()
            .filter(movies::Column::TmdbId.eq(tmdb_id))
            .one(&self.conn)
            .await?
            .map(map_model))
    }

    pub async fn list(&self, filter: &MovieFilter) -> Result<Vec<Movie>> {
        let mut query = Movies::find().order_by_asc(movies::Column::Title);

        if let Some(monitored) = filter.monitored {
            query = query.filter(movies::Column::Monitored.eq(monitored));
        }
        if let Some(missing) = filter.missing {
            query = query.filter(movies::Column::HasFile.eq(!missing));
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
            .map(map_model)
            .collect())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        Movies::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn set_monitored(&self, id: &str, monitored: bool) -> Result<()> {
        Movies::update_many()
            .col_expr(
                movies::Column::Monitored,
                sea_orm::sea_query::Expr::value(monitored),
            )
            .filter(movies::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Record an imported file on the movie row.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_file(
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
        let model = movies::ActiveModel {
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

        Movies::update(model).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn clear_file(&self, id: &str) -> Result<()> {
        let model = movies::ActiveModel {
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

        Movies::update(model).exec(&self.conn).await?;
        Ok(())
    }

    /// Monitored movies without a file. Availability gating happens in the
    /// caller, against the in-memory model.
    pub async fn find_missing(&self) -> Result<Vec<Movie>> {
        Ok(Movies::find()
            .filter(movies::Column::Monitored.eq(true))
            .filter(movies::Column::HasFile.eq(false))
            .order_by_asc(movies::Column::Title)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_model)
            .collect())
    }

    /// Monitored movies that do have a file (cutoff-unmet sweeps filter
    /// these further against their profile).
    pub async fn find_with_files(&self) -> Result<Vec<Movie>> {
        Ok(Movies::find()
            .filter(movies::Column::Monitored.eq(true))
            .filter(movies::Column::HasFile.eq(true))
            .order_by_asc(movies::Column::Title)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_model)
            .collect())
    }

    pub async fn count_by_state(&self) -> Result<MovieCounts> {
        let total = Movies::find().count(&self.conn).await?;
        let monitored = Movies::find()
            .filter(movies::Column::Monitored.eq(true))
            .count(&self.conn)
            .await?;
        let with_file = Movies::find()
            .filter(movies::Column::HasFile.eq(true))
            .count(&self.conn)
            .await?;
        let missing = Movies::find()
            .filter(movies::Column::Monitored.eq(true))
            .filter(movies::Column::HasFile.eq(false))
            .count(&self.conn)
            .await?;

        Ok(MovieCounts {
            total,
            monitored,
            with_file,
            missing,
        })
    }

    pub async fn all(&self) -> Result<Vec<Movie>> {
        Ok(Movies::find()
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_model)
            .collect())
    }
}
