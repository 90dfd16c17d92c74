use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if !manager
            .has_column("quality_profiles", "min_format_score")
            .await?
        {
            manager
                .alter_table(
                    Table::alter()
                        .table(QualityProfiles::Table)
                        .add_column(
                            ColumnDef::new(QualityProfiles::MinFormatScore)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;
        }

        if !manager
            .has_column("quality_profiles", "format_scores")
            .await?
        {
            manager
                .alter_table(
                    Table::alter()
                        .table(QualityProfiles::Table)
                        .add_column(ColumnDef::new(QualityProfiles::FormatScores).text().null())
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(QualityProfiles::Table)
                    .drop_column(QualityProfiles::FormatScores)
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(QualityProfiles::Table)
                    .drop_column(QualityProfiles::MinFormatScore)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum QualityProfiles {
    Table,
    MinFormatScore,
    FormatScores,
}
