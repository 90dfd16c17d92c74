use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, serde::Serialize, serde::Deserialize)]
#[sea_orm(table_name = "indexers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    /// torrent | usenet
    pub protocol: String,
    /// JSON array of Torznab category ids.
    pub categories: Option<String>,
    pub enabled: bool,
    pub supports_rss: bool,
    pub rss_interval_minutes: i64,
    pub priority: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::rss_releases::Entity")]
    RssReleases,
}

impl Related<super::rss_releases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RssReleases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
