use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::{
    ActivityEntry, ActivityRepository, BlacklistRepository, DownloadClientRepository,
    DownloadRepository, ExclusionRepository, ImportListRepository, IndexerRepository, MovieCounts,
    MovieFilter, MovieRepository, NamingRepository, QualityRepository, RssCacheRepository,
    SeriesFilter, SeriesRepository,
};

/// Mint a fresh opaque entity id.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Single logical owner of the database handle. Everything state-shaped
/// goes through one of its typed repositories.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        let store = Self { conn };
        store.initialize().await?;
        Ok(store)
    }

    /// Seed the quality ladder, default profile and naming config.
    async fn initialize(&self) -> Result<()> {
        self.quality().initialize().await?;
        self.naming().initialize().await?;
        Ok(())
    }

    /// The database file backing this store, if it is file-based.
    #[must_use]
    pub fn database_file(db_url: &str) -> Option<std::path::PathBuf> {
        if db_url.contains(":memory:") {
            return None;
        }
        Some(std::path::PathBuf::from(db_url.trim_start_matches("sqlite:")))
    }

    #[must_use]
    pub fn movies(&self) -> MovieRepository {
        MovieRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn series(&self) -> SeriesRepository {
        SeriesRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn downloads(&self) -> DownloadRepository {
        DownloadRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn activity(&self) -> ActivityRepository {
        ActivityRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn rss_cache(&self) -> RssCacheRepository {
        RssCacheRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn exclusions(&self) -> ExclusionRepository {
        ExclusionRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn blacklist(&self) -> BlacklistRepository {
        BlacklistRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn quality(&self) -> QualityRepository {
        QualityRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn import_lists(&self) -> ImportListRepository {
        ImportListRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn naming(&self) -> NamingRepository {
        NamingRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn indexers(&self) -> IndexerRepository {
        IndexerRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn download_clients(&self) -> DownloadClientRepository {
        DownloadClientRepository::new(self.conn.clone())
    }
}
