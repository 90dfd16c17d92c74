use crate::constants::retention;
use crate::db::Store;
use crate::entities::prelude::*;
use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Backup format version. Bumped when the table set or shape changes.
const BACKUP_VERSION: u32 = 1;

/// Tables in foreign-key order: parents first, so restore can insert in
/// sequence and delete in reverse.
const TABLES: &[&str] = &[
    "quality_definitions",
    "quality_profiles",
    "custom_formats",
    "movies",
    "series",
    "seasons",
    "episodes",
    "indexers",
    "download_clients",
    "downloads",
    "rss_releases",
    "exclusions",
    "release_blacklist",
    "import_lists",
    "activity_log",
    "naming_config",
];

/// JSON export/restore of the whole database, plus the scheduled `.db`
/// file copies.
#[derive(Clone)]
pub struct BackupService {
    store: Store,
}

impl BackupService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn export_table(&self, table: &str) -> Result<Vec<Value>> {
        let conn = &self.store.conn;

        let rows = match table {
            "quality_definitions" => {
                QualityDefinitions::find()
                    .order_by_asc(crate::entities::quality_definitions::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "quality_profiles" => {
                QualityProfiles::find()
                    .order_by_asc(crate::entities::quality_profiles::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "custom_formats" => {
                CustomFormats::find()
                    .order_by_asc(crate::entities::custom_formats::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "movies" => {
                Movies::find()
                    .order_by_asc(crate::entities::movies::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "series" => {
                Series::find()
                    .order_by_asc(crate::entities::series::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "seasons" => {
                Seasons::find()
                    .order_by_asc(crate::entities::seasons::Column::SeriesId)
                    .order_by_asc(crate::entities::seasons::Column::SeasonNumber)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "episodes" => {
                Episodes::find()
                    .order_by_asc(crate::entities::episodes::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "indexers" => {
                Indexers::find()
                    .order_by_asc(crate::entities::indexers::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "download_clients" => {
                DownloadClients::find()
                    .order_by_asc(crate::entities::download_clients::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "downloads" => {
                Downloads::find()
                    .order_by_asc(crate::entities::downloads::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "rss_releases" => {
                RssReleases::find()
                    .order_by_asc(crate::entities::rss_releases::Column::IndexerId)
                    .order_by_asc(crate::entities::rss_releases::Column::Guid)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "exclusions" => {
                Exclusions::find()
                    .order_by_asc(crate::entities::exclusions::Column::TmdbId)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "release_blacklist" => {
                ReleaseBlacklist::find()
                    .order_by_asc(crate::entities::release_blacklist::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "import_lists" => {
                ImportLists::find()
                    .order_by_asc(crate::entities::import_lists::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "activity_log" => {
                ActivityLog::find()
                    .order_by_asc(crate::entities::activity_log::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            "naming_config" => {
                NamingConfig::find()
                    .order_by_asc(crate::entities::naming_config::Column::Id)
                    .into_json()
                    .all(conn)
                    .await?
            }
            other => anyhow::bail!("Unknown table: {other}"),
        };

        Ok(rows)
    }

    /// Export the whole database as one JSON object keyed by table name,
    /// plus a `_meta` entry.
    pub async fn export(&self) -> Result<Value> {
        let mut backup = serde_json::Map::new();

        for table in TABLES {
            let rows = self.export_table(table).await?;
            backup.insert((*table).to_string(), Value::Array(rows));
        }

        backup.insert(
            "_meta".to_string(),
            json!([{
                "version": BACKUP_VERSION,
                "created_at": chrono::Utc::now().to_rfc3339(),
                "tables": TABLES,
            }]),
        );

        Ok(Value::Object(backup))
    }

    /// Table names and row counts, for the restore dialog.
    pub async fn preview(&self) -> Result<Value> {
        let mut preview = serde_json::Map::new();
        for table in TABLES {
            let rows = self.export_table(table).await?;
            preview.insert((*table).to_string(), json!(rows.len()));
        }
        Ok(Value::Object(preview))
    }

    /// Restore tables from a backup object. With `selected_tables`, only
    /// those tables are touched. Foreign keys are off for the duration;
    /// insert order follows the FK order of `TABLES`.
    pub async fn restore(&self, backup: &Value, selected_tables: Option<&[String]>) -> Result<u64> {
        let conn = &self.store.conn;
        let mut restored = 0;

        conn.execute_unprepared("PRAGMA foreign_keys = OFF")
            .await
            .context("Failed to disable foreign keys")?;

        let result = self.restore_inner(backup, selected_tables, &mut restored).await;

        conn.execute_unprepared("PRAGMA foreign_keys = ON")
            .await
            .context("Failed to re-enable foreign keys")?;

        result.map(|()| restored)
    }

    async fn restore_inner(
        &self,
        backup: &Value,
        selected_tables: Option<&[String]>,
        restored: &mut u64,
    ) -> Result<()> {
        let conn = &self.store.conn;

        let wanted = |table: &str| {
            selected_tables.is_none_or(|s| s.iter().any(|t| t == table))
        };

        // Children first for the deletes.
        for table in TABLES.iter().rev() {
            if wanted(table) && backup.get(*table).is_some() {
                conn.execute_unprepared(&format!("DELETE FROM {table}"))
                    .await
                    .with_context(|| format!("Failed to clear table {table}"))?;
            }
        }

        for table in TABLES {
            if !wanted(table) {
                continue;
            }
            let Some(rows) = backup.get(*table).and_then(Value::as_array) else {
                continue;
            };

            for row in rows {
                if let Err(e) = self.insert_row(table, row.clone()).await {
                    warn!(table = %table, error = %e, "Skipped unrestorable row");
                } else {
                    *restored += 1;
                }
            }
        }

        Ok(())
    }

    async fn insert_row(&self, table: &str, row: Value) -> Result<()> {
        let conn = &self.store.conn;

        match table {
            "quality_definitions" => {
                crate::entities::quality_definitions::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "quality_profiles" => {
                crate::entities::quality_profiles::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "custom_formats" => {
                crate::entities::custom_formats::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "movies" => {
                crate::entities::movies::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "series" => {
                crate::entities::series::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "seasons" => {
                crate::entities::seasons::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "episodes" => {
                crate::entities::episodes::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "indexers" => {
                crate::entities::indexers::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "download_clients" => {
                crate::entities::download_clients::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "downloads" => {
                crate::entities::downloads::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "rss_releases" => {
                crate::entities::rss_releases::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "exclusions" => {
                crate::entities::exclusions::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "release_blacklist" => {
                crate::entities::release_blacklist::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "import_lists" => {
                crate::entities::import_lists::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "activity_log" => {
                crate::entities::activity_log::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            "naming_config" => {
                crate::entities::naming_config::ActiveModel::from_json(row)?
                    .insert(conn)
                    .await?;
            }
            other => anyhow::bail!("Unknown table: {other}"),
        }

        Ok(())
    }

    /// The database-backup worker body: copy the database file when the
    /// schedule says so, keeping the most recent copies only.
    pub async fn run_scheduled(
        &self,
        db_file: &Path,
        backup_dir: &Path,
        interval_hours: u32,
    ) -> Result<()> {
        tokio::fs::create_dir_all(backup_dir).await?;

        let mut backups = list_backups(backup_dir).await?;

        let due = backups.last().is_none_or(|latest| {
            latest
                .metadata()
                .and_then(|m| m.modified())
                .map(|modified| {
                    modified
                        .elapsed()
                        .map(|age| age.as_secs() >= u64::from(interval_hours) * 3600)
                        .unwrap_or(true)
                })
                .unwrap_or(true)
        });

        if !due {
            return Ok(());
        }

        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ");
        let target = backup_dir.join(format!("mediastack-backup-{stamp}.db"));
        tokio::fs::copy(db_file, &target)
            .await
            .with_context(|| format!("Failed to copy database to {}", target.display()))?;

        info!(target = %target.display(), "Scheduled database backup written");

        backups = list_backups(backup_dir).await?;
        while backups.len() > retention::BACKUP_FILES_KEPT {
            let oldest = backups.remove(0);
            if let Err(e) = tokio::fs::remove_file(oldest.path()).await {
                warn!(error = %e, "Failed to prune old backup");
            }
        }

        Ok(())
    }
}

async fn list_backups(dir: &Path) -> Result<Vec<std::fs::DirEntry>> {
    let dir = dir.to_path_buf();
    let mut entries: Vec<std::fs::DirEntry> = tokio::task::spawn_blocking(move || {
        std::fs::read_dir(&dir)
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .filter(|e| {
                        e.file_name()
                            .to_str()
                            .is_some_and(|n| n.starts_with("mediastack-backup-") && n.ends_with(".db"))
                    })
                    .collect()
            })
            .unwrap_or_default()
    })
    .await?;

    entries.sort_by_key(std::fs::DirEntry::file_name);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_lists_parents_first() {
        let profiles = TABLES.iter().position(|t| *t == "quality_profiles").unwrap();
        let movies = TABLES.iter().position(|t| *t == "movies").unwrap();
        let series = TABLES.iter().position(|t| *t == "series").unwrap();
        let episodes = TABLES.iter().position(|t| *t == "episodes").unwrap();
        let downloads = TABLES.iter().position(|t| *t == "downloads").unwrap();

        assert!(profiles < movies);
        assert!(series < episodes);
        assert!(movies < downloads);
    }
}
