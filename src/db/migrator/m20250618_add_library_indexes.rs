use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_episodes_series_season_episode")
                    .table(Episodes::Table)
                    .col(Episodes::SeriesId)
                    .col(Episodes::SeasonNumber)
                    .col(Episodes::EpisodeNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_downloads_status")
                    .table(Downloads::Table)
                    .col(Downloads::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_downloads_movie_id")
                    .table(Downloads::Table)
                    .col(Downloads::MovieId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_log_created_at")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rss_releases_created_at")
                    .table(RssReleases::Table)
                    .col(RssReleases::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_rss_releases_created_at")
                    .table(RssReleases::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_activity_log_created_at")
                    .table(ActivityLog::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_downloads_movie_id")
                    .table(Downloads::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_downloads_status")
                    .table(Downloads::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_episodes_series_season_episode")
                    .table(Episodes::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Episodes {
    Table,
    SeriesId,
    SeasonNumber,
    EpisodeNumber,
}

#[derive(DeriveIden)]
enum Downloads {
    Table,
    Status,
    MovieId,
}

#[derive(DeriveIden)]
enum ActivityLog {
    Table,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RssReleases {
    Table,
    CreatedAt,
}
