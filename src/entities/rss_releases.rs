use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, serde::Serialize, serde::Deserialize)]
#[sea_orm(table_name = "rss_releases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub indexer_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub guid: String,
    pub title: String,
    pub download_url: String,
    pub size: Option<i64>,
    pub publish_date: Option<String>,
    pub processed: bool,
    pub grabbed: bool,
    pub created_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::indexers::Entity",
        from = "Column::IndexerId",
        to = "super::indexers::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Indexers,
}

impl Related<super::indexers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Indexers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
