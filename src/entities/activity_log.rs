use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, serde::Serialize, serde::Deserialize)]
#[sea_orm(table_name = "activity_log")]
pub struct Model {
    /// Auto-incrementing id gives the log its total order.
    #[sea_orm(primary_key)]
    pub id: i64,
    /// movie | series | episode | system
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub event_type: String,
    pub message: String,
    /// JSON details blob.
    pub details: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
