pub mod activity;
pub mod download;
pub mod exclusion;
pub mod import_list;
pub mod indexer;
pub mod movie;
pub mod naming;
pub mod quality;
pub mod rss_cache;
pub mod series;

pub use activity::{ActivityEntry, ActivityRepository};
pub use download::DownloadRepository;
pub use exclusion::{BlacklistRepository, ExclusionRepository};
pub use import_list::ImportListRepository;
pub use indexer::{DownloadClientRepository, IndexerRepository};
pub use movie::{MovieCounts, MovieFilter, MovieRepository};
pub use naming::NamingRepository;
pub use quality::QualityRepository;
pub use rss_cache::RssCacheRepository;
pub use series::{SeriesFilter, SeriesRepository};
