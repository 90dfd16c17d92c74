pub use super::activity_log::Entity as ActivityLog;
pub use super::custom_formats::Entity as CustomFormats;
pub use super::download_clients::Entity as DownloadClients;
pub use super::downloads::Entity as Downloads;
pub use super::episodes::Entity as Episodes;
pub use super::exclusions::Entity as Exclusions;
pub use super::import_lists::Entity as ImportLists;
pub use super::indexers::Entity as Indexers;
pub use super::movies::Entity as Movies;
pub use super::naming_config::Entity as NamingConfig;
pub use super::quality_definitions::Entity as QualityDefinitions;
pub use super::quality_profiles::Entity as QualityProfiles;
pub use super::release_blacklist::Entity as ReleaseBlacklist;
pub use super::rss_releases::Entity as RssReleases;
pub use super::seasons::Entity as Seasons;
pub use super::series::Entity as Series;
