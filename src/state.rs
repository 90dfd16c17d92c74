//! Shared application state used across the API and the worker registry.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::clients::probe::FfprobeProbe;
use crate::clients::tmdb::{TmdbClient, TmdbConfig};
use crate::clients::webhook::{NoopNotifier, WebhookNotifier};
use crate::clients::{MediaInfoProbe, MetadataProvider, Notifier};
use crate::config::Config;
use crate::constants::intervals;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::services::{
    ActivityService, AutoSearchService, BackupService, DownloadLifecycleService, FileImporter,
    ImportListSyncService, LibraryService, MetadataService, RssGrabberService, ScannerService,
};
use crate::workers::{WorkerRegistry, WorkerTask};

/// Everything the API handlers and workers share. Designed to be wrapped
/// in an `Arc`.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub event_bus: broadcast::Sender<NotificationEvent>,

    pub activity: ActivityService,

    pub library: LibraryService,

    pub metadata: MetadataService,

    pub auto_search: AutoSearchService,

    pub rss: RssGrabberService,

    pub import_lists: ImportListSyncService,

    pub lifecycle: DownloadLifecycleService,

    pub importer: FileImporter,

    pub scanner: ScannerService,

    pub backup: BackupService,

    pub workers: WorkerRegistry,

    pub provider: Arc<dyn MetadataProvider>,

    pub notifier: Arc<dyn Notifier>,

    pub prober: Arc<dyn MediaInfoProbe>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::new(&config.general.database_path).await?;

        let provider: Arc<dyn MetadataProvider> = Arc::new(TmdbClient::new(TmdbConfig {
            base_url: config.metadata.tmdb_base_url.clone(),
            api_key: config.metadata.tmdb_api_key.clone(),
            timeout: std::time::Duration::from_secs(u64::from(
                config.metadata.request_timeout_seconds,
            )),
        }));

        let notifier: Arc<dyn Notifier> = match &config.notifications.webhook_url {
            Some(url) if !url.is_empty() => Arc::new(WebhookNotifier::new(url.clone())),
            _ => Arc::new(NoopNotifier),
        };

        let prober: Arc<dyn MediaInfoProbe> = Arc::new(FfprobeProbe);

        Self::with_parts(config, store, provider, notifier, prober)
    }

    /// Wiring entry point that tests use with stub clients and an
    /// in-memory store.
    pub fn with_parts(
        config: Config,
        store: Store,
        provider: Arc<dyn MetadataProvider>,
        notifier: Arc<dyn Notifier>,
        prober: Arc<dyn MediaInfoProbe>,
    ) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size.max(16));
        let import_mode = config.library.import_mode.clone();
        let config = Arc::new(RwLock::new(config));

        let activity = ActivityService::new(store.clone(), event_bus.clone());
        let library = LibraryService::new(store.clone(), activity.clone());
        let metadata = MetadataService::new(store.clone(), Arc::clone(&provider));
        let auto_search = AutoSearchService::new(
            store.clone(),
            Arc::clone(&config),
            library.clone(),
            activity.clone(),
            Arc::clone(&notifier),
        );
        let rss = RssGrabberService::new(store.clone(), Arc::clone(&config), auto_search.clone());
        let import_lists = ImportListSyncService::new(
            store.clone(),
            Arc::clone(&provider),
            library.clone(),
            metadata.clone(),
            auto_search.clone(),
        );
        let importer = FileImporter::new(
            store.clone(),
            activity.clone(),
            Arc::clone(&notifier),
            Arc::clone(&prober),
            import_mode,
        );
        let lifecycle = DownloadLifecycleService::new(
            store.clone(),
            Arc::clone(&config),
            activity.clone(),
            importer.clone(),
        );
        let scanner = ScannerService::new(store.clone(), library.clone());
        let backup = BackupService::new(store.clone());

        Ok(Self {
            config,
            store,
            event_bus,
            activity,
            library,
            metadata,
            auto_search,
            rss,
            import_lists,
            lifecycle,
            importer,
            scanner,
            backup,
            workers: WorkerRegistry::new(),
            provider,
            notifier,
            prober,
        })
    }

    /// Register the default worker set. Intervals are the shipped
    /// defaults; the `/system/workers` surface adjusts them at runtime.
    pub async fn register_default_workers(&self) {
        let lifecycle = self.lifecycle.clone();
        self.workers
            .register(
                "download-sync",
                "Download Sync",
                "Polls download clients and imports completed downloads",
                intervals::DOWNLOAD_SYNC_MS,
                task(move || {
                    let lifecycle = lifecycle.clone();
                    async move { lifecycle.sync().await }
                }),
            )
            .await;

        let import_lists = self.import_lists.clone();
        self.workers
            .register(
                "import-list-sync",
                "Import List Sync",
                "Pulls external lists and adds new items to the library",
                intervals::IMPORT_LIST_SYNC_MS,
                task(move || {
                    let import_lists = import_lists.clone();
                    async move { import_lists.sync_due().await.map(|_| ()) }
                }),
            )
            .await;

        let scanner = self.scanner.clone();
        self.workers
            .register(
                "library-refresh",
                "Library Refresh",
                "Reconciles library files on disk with the catalog",
                intervals::LIBRARY_REFRESH_MS,
                task(move || {
                    let scanner = scanner.clone();
                    async move { scanner.scan().await.map(|_| ()) }
                }),
            )
            .await;

        let metadata = self.metadata.clone();
        self.workers
            .register(
                "metadata-refresh",
                "Metadata Refresh",
                "Refreshes movie and series metadata and new episodes",
                intervals::METADATA_REFRESH_MS,
                task(move || {
                    let metadata = metadata.clone();
                    async move { metadata.refresh_all().await }
                }),
            )
            .await;

        let auto_search = self.auto_search.clone();
        let config = Arc::clone(&self.config);
        self.workers
            .register(
                "missing-search",
                "Missing Search",
                "Searches indexers for missing movies and episodes",
                intervals::MISSING_SEARCH_MS,
                task(move || {
                    let auto_search = auto_search.clone();
                    let config = Arc::clone(&config);
                    async move {
                        let concurrency = config.read().await.workers.search_concurrency;
                        auto_search.search_all_missing(concurrency).await.map(|_| ())
                    }
                }),
            )
            .await;

        let auto_search = self.auto_search.clone();
        let config = Arc::clone(&self.config);
        self.workers
            .register(
                "cutoff-search",
                "Cutoff Unmet Search",
                "Searches for upgrades of files below their profile cutoff",
                intervals::CUTOFF_SEARCH_MS,
                task(move || {
                    let auto_search = auto_search.clone();
                    let config = Arc::clone(&config);
                    async move {
                        let concurrency = config.read().await.workers.search_concurrency;
                        auto_search
                            .search_all_cutoff_unmet(concurrency)
                            .await
                            .map(|_| ())
                    }
                }),
            )
            .await;

        let rss = self.rss.clone();
        self.workers
            .register(
                "rss-sync",
                "RSS Sync",
                "Polls indexer RSS feeds and grabs wanted releases",
                intervals::RSS_SYNC_MS,
                task(move || {
                    let rss = rss.clone();
                    async move { rss.sync().await.map(|_| ()) }
                }),
            )
            .await;

        let activity = self.activity.clone();
        self.workers
            .register(
                "activity-cleanup",
                "Activity Cleanup",
                "Purges activity log entries past the retention window",
                intervals::ACTIVITY_CLEANUP_MS,
                task(move || {
                    let activity = activity.clone();
                    async move { activity.cleanup().await }
                }),
            )
            .await;

        let backup = self.backup.clone();
        let config = Arc::clone(&self.config);
        self.workers
            .register(
                "database-backup",
                "Database Backup",
                "Writes scheduled database file backups",
                intervals::DATABASE_BACKUP_MS,
                task(move || {
                    let backup = backup.clone();
                    let config = Arc::clone(&config);
                    async move {
                        let (enabled, db_path, dir, interval_hours) = {
                            let config = config.read().await;
                            (
                                config.backup.enabled,
                                config.general.database_path.clone(),
                                config.backup.backup_dir.clone(),
                                config.backup.interval_hours,
                            )
                        };
                        if !enabled {
                            return Ok(());
                        }
                        let Some(db_file) = Store::database_file(&db_path) else {
                            return Ok(());
                        };
                        backup
                            .run_scheduled(&db_file, std::path::Path::new(&dir), interval_hours)
                            .await
                    }
                }),
            )
            .await;
    }
}

/// Adapt an async closure to the registry's boxed task shape.
fn task<F, Fut>(f: F) -> WorkerTask
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}
