pub mod prelude;

pub mod activity_log;
pub mod custom_formats;
pub mod download_clients;
pub mod downloads;
pub mod episodes;
pub mod exclusions;
pub mod import_lists;
pub mod indexers;
pub mod movies;
pub mod naming_config;
pub mod quality_definitions;
pub mod quality_profiles;
pub mod release_blacklist;
pub mod rss_releases;
pub mod seasons;
pub mod series;
