use crate::clients::{ExternalIdKind, ListItem, MetadataProvider};
use crate::db::Store;
use crate::entities::import_lists;
use crate::models::movie::MinimumAvailability;
use crate::services::auto_search::AutoSearchService;
use crate::services::library::{LibraryService, NewMovie, NewSeries};
use crate::services::metadata::MetadataService;
use crate::services::naming::FileNamer;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Inter-item delay keeps the metadata provider's rate limiter happy.
const ITEM_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct ListSyncStats {
    pub lists: usize,
    pub fetched: usize,
    pub added: usize,
    pub existing: usize,
    pub excluded: usize,
    pub errors: usize,
}

/// Reconciles external lists into the catalog: fetch, resolve ids,
/// dedupe against library and exclusions, create placeholders, then
/// enrich in the background.
#[derive(Clone)]
pub struct ImportListSyncService {
    store: Store,
    provider: Arc<dyn MetadataProvider>,
    library: LibraryService,
    metadata: MetadataService,
    auto_search: AutoSearchService,
}

impl ImportListSyncService {
    #[must_use]
    pub fn new(
        store: Store,
        provider: Arc<dyn MetadataProvider>,
        library: LibraryService,
        metadata: MetadataService,
        auto_search: AutoSearchService,
    ) -> Self {
        Self {
            store,
            provider,
            library,
            metadata,
            auto_search,
        }
    }

    /// Sync every list whose refresh interval has elapsed.
    pub async fn sync_due(&self) -> Result<ListSyncStats> {
        let due = self.store.import_lists().due().await?;
        let mut stats = ListSyncStats {
            lists: due.len(),
            ..Default::default()
        };

        for list in due {
            match self.sync_list(&list).await {
                Ok(list_stats) => {
                    stats.fetched += list_stats.fetched;
                    stats.added += list_stats.added;
                    stats.existing += list_stats.existing;
                    stats.excluded += list_stats.excluded;
                    stats.errors += list_stats.errors;
                }
                Err(e) => {
                    warn!(list = %list.name, error = %e, "List sync failed");
                    stats.errors += 1;
                }
            }

            self.store.import_lists().set_last_sync(&list.id).await?;
        }

        Ok(stats)
    }

    /// Sync one list now, regardless of its schedule.
    pub async fn sync_list(&self, list: &import_lists::Model) -> Result<ListSyncStats> {
        let start = std::time::Instant::now();
        let mut stats = ListSyncStats::default();

        let items = self
            .provider
            .fetch_list(&list.list_type, list.list_id.as_deref())
            .await?;
        stats.fetched = items.len();

        info!(list = %list.name, items = items.len(), "Syncing import list");

        for item in items {
            match self.sync_item(list, item).await {
                Ok(ItemOutcome::Added) => stats.added += 1,
                Ok(ItemOutcome::Existing) => stats.existing += 1,
                Ok(ItemOutcome::Excluded) => stats.excluded += 1,
                Ok(ItemOutcome::Skipped) => {}
                Err(e) => {
                    warn!(list = %list.name, error = %e, "List item failed");
                    stats.errors += 1;
                }
            }

            tokio::time::sleep(ITEM_DELAY).await;
        }

        info!(
            event = "list_sync_finished",
            list = %list.name,
            added = stats.added,
            existing = stats.existing,
            excluded = stats.excluded,
            errors = stats.errors,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Import list synced"
        );

        Ok(stats)
    }

    async fn sync_item(
        &self,
        list: &import_lists::Model,
        item: ListItem,
    ) -> Result<ItemOutcome> {
        // Items arrive keyed by TMDB id or IMDb id; IMDb-only items get
        // resolved first, and unresolvable items are dropped.
        let tmdb_id = match item.tmdb_id {
            Some(id) => id,
            None => {
                let Some(imdb_id) = &item.imdb_id else {
                    return Ok(ItemOutcome::Skipped);
                };
                let kind = if list.media_type == "series" {
                    ExternalIdKind::Series
                } else {
                    ExternalIdKind::Movie
                };
                match self.provider.find_by_external_id(imdb_id, kind).await? {
                    Some(id) => id,
                    None => {
                        debug!(imdb_id = %imdb_id, "Could not resolve IMDb id");
                        return Ok(ItemOutcome::Skipped);
                    }
                }
            }
        };

        // Items already in the catalog count as existing; exclusions
        // permanently block re-adds.
        let exists = if list.media_type == "series" {
            self.store.series().get_by_tmdb_id(tmdb_id).await?.is_some()
        } else {
            self.store.movies().get_by_tmdb_id(tmdb_id).await?.is_some()
        };
        if exists {
            return Ok(ItemOutcome::Existing);
        }

        if self
            .store
            .exclusions()
            .contains(tmdb_id, &list.media_type)
            .await?
        {
            debug!(tmdb_id, "Skipping excluded item");
            return Ok(ItemOutcome::Excluded);
        }

        if list.media_type == "series" {
            self.sync_series_item(list, tmdb_id, item).await
        } else {
            self.sync_movie_item(list, tmdb_id, item).await
        }
    }

    async fn sync_movie_item(
        &self,
        list: &import_lists::Model,
        tmdb_id: i64,
        item: ListItem,
    ) -> Result<ItemOutcome> {
        let namer = FileNamer::new(self.store.naming().get().await?);
        let movie = self
            .library
            .create_movie(
                NewMovie {
                    tmdb_id: Some(tmdb_id),
                    imdb_id: item.imdb_id,
                    title: item.title,
                    year: item.year,
                    monitored: list.monitor != "none",
                    minimum_availability: list
                        .minimum_availability
                        .as_deref()
                        .map(MinimumAvailability::parse),
                    quality_profile_id: list.quality_profile_id.clone(),
                    root_folder: list.root_folder.clone(),
                },
                &namer,
            )
            .await?;

        // Enrichment and the optional initial search run off the sync
        // loop so one slow item cannot stall the whole list.
        let metadata = self.metadata.clone();
        let auto_search = self.auto_search.clone();
        let search_on_add = list.search_on_add && movie.monitored;
        let movie_id = movie.id.clone();
        tokio::spawn(async move {
            if let Err(e) = metadata.enrich_movie(&movie_id).await {
                warn!(movie_id = %movie_id, error = %e, "Placeholder enrichment failed");
            }
            if search_on_add
                && let Err(e) = auto_search.search_and_download_movie(&movie_id, false).await
            {
                warn!(movie_id = %movie_id, error = %e, "Initial search failed");
            }
        });

        Ok(ItemOutcome::Added)
    }

    async fn sync_series_item(
        &self,
        list: &import_lists::Model,
        tmdb_id: i64,
        item: ListItem,
    ) -> Result<ItemOutcome> {
        let namer = FileNamer::new(self.store.naming().get().await?);
        let series = self
            .library
            .create_series(
                NewSeries {
                    tmdb_id: Some(tmdb_id),
                    tvdb_id: None,
                    imdb_id: item.imdb_id,
                    title: item.title,
                    year: item.year,
                    monitored: list.monitor != "none",
                    series_type: None,
                    monitor_new_seasons: None,
                    quality_profile_id: list.quality_profile_id.clone(),
                    root_folder: list.root_folder.clone(),
                },
                &namer,
            )
            .await?;

        let metadata = self.metadata.clone();
        let monitor = list.monitor.clone();
        let series_id = series.id.clone();
        tokio::spawn(async move {
            if let Err(e) = metadata.enrich_series(&series_id, Some(&monitor)).await {
                warn!(series_id = %series_id, error = %e, "Placeholder enrichment failed");
            }
        });

        Ok(ItemOutcome::Added)
    }
}

enum ItemOutcome {
    Added,
    Existing,
    Excluded,
    Skipped,
}
