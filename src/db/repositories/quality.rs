use crate::entities::{custom_formats, prelude::*, quality_definitions, quality_profiles};
use crate::quality::{
    CustomFormat, ProfileItem, ProfileMediaType, QualityDefinition, QualityLadder, QualityProfile,
};
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::HashMap;

pub struct QualityRepository {
    conn: DatabaseConnection,
}

fn map_definition(m: quality_definitions::Model) -> QualityDefinition {
    QualityDefinition {
        id: m.id,
        name: m.name,
        weight: m.weight,
        min_size_mb: m.min_size_mb,
        max_size_mb: m.max_size_mb,
        preferred_size_mb: m.preferred_size_mb,
        resolution: m.resolution,
        source: m.source,
    }
}

fn map_profile(m: quality_profiles::Model) -> QualityProfile {
    let items: Vec<ProfileItem> = serde_json::from_str(&m.items).unwrap_or_default();
    let format_scores: HashMap<String, i32> = m
        .format_scores
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();

    QualityProfile {
        id: m.id,
        name: m.name,
        media_type: ProfileMediaType::parse(&m.media_type),
        cutoff: m.cutoff,
        upgrade_allowed: m.upgrade_allowed,
        min_format_score: m.min_format_score,
        items,
        format_scores,
    }
}

fn profile_active_model(p: &QualityProfile) -> Result<quality_profiles::ActiveModel> {
    Ok(quality_profiles::ActiveModel {
        id: Set(p.id.clone()),
        name: Set(p.name.clone()),
        media_type: Set(p.media_type.as_str().to_string()),
        cutoff: Set(p.cutoff.clone()),
        upgrade_allowed: Set(p.upgrade_allowed),
        min_format_score: Set(p.min_format_score),
        items: Set(serde_json::to_string(&p.items)?),
        format_scores: Set(if p.format_scores.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&p.format_scores)?)
        }),
    })
}

fn map_format(m: custom_formats::Model) -> CustomFormat {
    CustomFormat {
        rules: serde_json::from_str(&m.rules).unwrap_or_default(),
        id: m.id,
        name: m.name,
        score: m.score,
    }
}

impl QualityRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Seed the built-in quality ladder and a default profile. Existing
    /// rows are left alone, so operator edits survive restarts.
    pub async fn initialize(&self) -> Result<()> {
        for def in QualityDefinition::defaults() {
            QualityDefinitions::insert(quality_definitions::ActiveModel {
                id: Set(def.id.clone()),
                name: Set(def.name.clone()),
                weight: Set(def.weight),
                min_size_mb: Set(def.min_size_mb),
                max_size_mb: Set(def.max_size_mb),
                preferred_size_mb: Set(def.preferred_size_mb),
                resolution: Set(def.resolution),
                source: Set(def.source.clone()),
            })
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(quality_definitions::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;
        }

        let default = QualityProfile::default_profile();
        QualityProfiles::insert(profile_active_model(&default)?)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(quality_profiles::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn ladder(&self) -> Result<QualityLadder> {
        let definitions = QualityDefinitions::find()
            .order_by_asc(quality_definitions::Column::Weight)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_definition)
            .collect();

        Ok(QualityLadder::new(definitions))
    }

    pub async fn update_definition_sizes(
        &self,
        name: &str,
        min_size_mb: Option<i64>,
        max_size_mb: Option<i64>,
        preferred_size_mb: Option<i64>,
    ) -> Result<()> {
        QualityDefinitions::update_many()
            .col_expr(
                quality_definitions::Column::MinSizeMb,
                sea_orm::sea_query::Expr::value(min_size_mb),
            )
            .col_expr(
                quality_definitions::Column::MaxSizeMb,
                sea_orm::sea_query::Expr::value(max_size_mb),
            )
            .col_expr(
                quality_definitions::Column::PreferredSizeMb,
                sea_orm::sea_query::Expr::value(preferred_size_mb),
            )
            .filter(quality_definitions::Column::Name.eq(name))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn get_profile(&self, id: &str) -> Result<Option<QualityProfile>> {
        Ok(QualityProfiles::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(map_profile))
    }

    pub async fn default_profile_id(&self) -> Result<Option<String>> {
        Ok(QualityProfiles::find()
            .order_by_asc(quality_profiles::Column::Name)
            .one(&self.conn)
            .await?
            .map(|p| p.id))
    }

    pub async fn list_profiles(&self) -> Result<Vec<QualityProfile>> {
        Ok(QualityProfiles::find()
            .order_by_asc(quality_profiles::Column::Name)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_profile)
            .collect())
    }

    pub async fn upsert_profile(&self, profile: &QualityProfile) -> Result<()> {
        QualityProfiles::insert(profile_active_model(profile)?)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(quality_profiles::Column::Id)
                    .update_columns([
                        quality_profiles::Column::Name,
                        quality_profiles::Column::MediaType,
                        quality_profiles::Column::Cutoff,
                        quality_profiles::Column::UpgradeAllowed,
                        quality_profiles::Column::MinFormatScore,
                        quality_profiles::Column::Items,
                        quality_profiles::Column::FormatScores,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn delete_profile(&self, id: &str) -> Result<()> {
        QualityProfiles::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn list_formats(&self) -> Result<Vec<CustomFormat>> {
        Ok(CustomFormats::find()
            .order_by_asc(custom_formats::Column::Name)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(map_format)
            .collect())
    }

    pub async fn upsert_format(&self, format: &CustomFormat) -> Result<()> {
        CustomFormats::insert(custom_formats::ActiveModel {
            id: Set(format.id.clone()),
            name: Set(format.name.clone()),
            score: Set(format.score),
            rules: Set(serde_json::to_string(&format.rules)?),
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(custom_formats::Column::Id)
                .update_columns([
                    custom_formats::Column::Name,
                    custom_formats::Column::Score,
                    custom_formats::Column::Rules,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;
        Ok(())
    }

    pub async fn delete_format(&self, id: &str) -> Result<()> {
        CustomFormats::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }
}
