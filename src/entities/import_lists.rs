use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, serde::Serialize, serde::Deserialize)]
#[sea_orm(table_name = "import_lists")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    /// tmdb_popular | tmdb_collection | tmdb_person | tmdb_list
    pub list_type: String,
    /// movie | series
    pub media_type: String,
    pub enabled: bool,
    /// Collection/person/list id, depending on list_type.
    pub list_id: Option<String>,
    pub quality_profile_id: Option<String>,
    pub root_folder: Option<String>,
    /// all | firstSeason | latestSeason | none
    pub monitor: String,
    pub minimum_availability: Option<String>,
    pub search_on_add: bool,
    pub refresh_interval_minutes: i64,
    pub last_sync: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
