pub mod activity;
pub mod auto_search;
pub mod backup;
pub mod downloads;
pub mod import_lists;
pub mod importer;
pub mod library;
pub mod metadata;
pub mod naming;
pub mod rss;
pub mod scanner;
pub mod selector;

pub use activity::ActivityService;
pub use auto_search::{AutoSearchService, SearchOutcome};
pub use backup::BackupService;
pub use downloads::DownloadLifecycleService;
pub use import_lists::ImportListSyncService;
pub use importer::{FileImporter, ImportError};
pub use library::LibraryService;
pub use metadata::MetadataService;
pub use naming::{FileNamer, NamingContext};
pub use rss::RssGrabberService;
pub use scanner::ScannerService;
