use crate::constants::retention;
use crate::entities::{prelude::RssReleases, rss_releases};
use crate::models::release::Release;
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

pub struct RssCacheRepository {
    conn: DatabaseConnection,
}

impl RssCacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a release into the cache. The `(indexer_id, guid)` key is
    /// the grabbing idempotency key: a conflict means "seen already" and
    /// returns false.
    pub async fn insert_if_new(&self, release: &Release) -> Result<bool> {
        let rows = RssReleases::insert(rss_releases::ActiveModel {
            indexer_id: Set(release.indexer_id.clone()),
            guid: Set(release.guid.clone()),
            title: Set(release.title.clone()),
            download_url: Set(release.download_url.clone()),
            size: Set(release.size),
            publish_date: Set(release.publish_date.clone()),
            processed: Set(false),
            grabbed: Set(false),
            created_at: Set(Some(chrono::Utc::now().to_rfc3339())),
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::columns([
                rss_releases::Column::IndexerId,
                rss_releases::Column::Guid,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;

        Ok(rows > 0)
    }

    pub async fn mark(
        &self,
        indexer_id: &str,
        guid: &str,
        processed: bool,
        grabbed: bool,
    ) -> Result<()> {
        RssReleases::update_many()
            .col_expr(
                rss_releases::Column::Processed,
                sea_orm::sea_query::Expr::value(processed),
            )
            .col_expr(
                rss_releases::Column::Grabbed,
                sea_orm::sea_query::Expr::value(grabbed),
            )
            .filter(rss_releases::Column::IndexerId.eq(indexer_id))
            .filter(rss_releases::Column::Guid.eq(guid))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn get(&self, indexer_id: &str, guid: &str) -> Result<Option<rss_releases::Model>> {
        Ok(RssReleases::find_by_id((indexer_id.to_string(), guid.to_string()))
            .one(&self.conn)
            .await?)
    }

    /// Sweep cache rows older than the retention window.
    pub async fn sweep_old(&self) -> Result<u64> {
        let cutoff = (chrono::Utc::now()
            - chrono::Duration::days(retention::RSS_CACHE_DAYS))
        .to_rfc3339();

        let result = RssReleases::delete_many()
            .filter(rss_releases::Column::CreatedAt.lt(cutoff))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
