//! Application-wide constants
//!
//! Centralizes magic values that are used across multiple modules.

/// Video file extensions recognized by the application.
/// Used for library scanning, import, and file detection.
pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "webm", "mov", "wmv", "flv", "m4v"];

/// Retention windows for periodically swept tables.
pub mod retention {
    /// Activity log rows older than this are purged by the cleanup worker.
    pub const ACTIVITY_DAYS: i64 = 7;

    /// RSS cache rows older than this are swept after each RSS pass.
    pub const RSS_CACHE_DAYS: i64 = 7;

    /// Number of scheduled database backup files kept on disk.
    pub const BACKUP_FILES_KEPT: usize = 10;
}

/// Default worker intervals, in milliseconds.
pub mod intervals {
    pub const DOWNLOAD_SYNC_MS: u64 = 5_000;
    pub const IMPORT_LIST_SYNC_MS: u64 = 60 * 60 * 1_000;
    pub const LIBRARY_REFRESH_MS: u64 = 60 * 60 * 1_000;
    pub const METADATA_REFRESH_MS: u64 = 24 * 60 * 60 * 1_000;
    pub const MISSING_SEARCH_MS: u64 = 60 * 60 * 1_000;
    pub const CUTOFF_SEARCH_MS: u64 = 6 * 60 * 60 * 1_000;
    pub const RSS_SYNC_MS: u64 = 15 * 60 * 1_000;
    pub const ACTIVITY_CLEANUP_MS: u64 = 24 * 60 * 60 * 1_000;
    pub const DATABASE_BACKUP_MS: u64 = 60 * 1_000;

    /// Lowest interval `set_interval` accepts.
    pub const MINIMUM_MS: u64 = 1_000;
}

/// Batched search pacing.
pub mod search {
    use std::time::Duration;

    /// Pause between batches in `search_all_missing` / `search_all_cutoff_unmet`.
    pub const BATCH_PAUSE: Duration = Duration::from_secs(3);

    /// Pause between sibling items inside one batch.
    pub const SIBLING_PAUSE: Duration = Duration::from_millis(500);

    /// Default bound on concurrent external requests.
    pub const DEFAULT_CONCURRENCY: usize = 5;
}

/// API limits
pub mod limits {
    /// Default page size for library listings.
    pub const DEFAULT_PAGE_SIZE: u64 = 50;

    /// Hard ceiling on page size.
    pub const MAX_PAGE_SIZE: u64 = 500;

    /// Default recent activity limit.
    pub const DEFAULT_ACTIVITY_LIMIT: u64 = 100;
}
