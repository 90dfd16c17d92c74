use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize, serde::Deserialize)]
#[sea_orm(table_name = "movies")]
#[allow(clippy::struct_excessive_bools)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub runtime: Option<i32>,
    pub overview: Option<String>,
    pub status: Option<String>,
    pub certification: Option<String>,
    pub collection_title: Option<String>,
    /// JSON array of genre names.
    pub genres: Option<String>,
    /// JSON object {directors, writers, cast} as fetched from metadata.
    pub credits: Option<String>,
    pub vote_average: Option<f64>,
    pub theatrical_release_date: Option<String>,
    pub digital_release_date: Option<String>,
    pub physical_release_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    /// announced | inCinemas | released | preDB
    pub minimum_availability: String,
    pub monitored: bool,
    pub has_file: bool,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub quality: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub release_group: Option<String>,
    pub is_proper: bool,
    pub is_repack: bool,
    pub quality_profile_id: Option<String>,
    pub root_folder: Option<String>,
    pub folder_path: Option<String>,
    /// JSON array of tag strings.
    pub tags: Option<String>,
    pub added_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quality_profiles::Entity",
        from = "Column::QualityProfileId",
        to = "super::quality_profiles::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    QualityProfiles,
    #[sea_orm(has_many = "super::downloads::Entity")]
    Downloads,
}

impl Related<super::quality_profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QualityProfiles.def()
    }
}

impl Related<super::downloads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Downloads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
