use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub metadata: MetadataConfig,

    pub downloads: DownloadConfig,

    pub library: LibraryConfig,

    pub quality: QualityConfig,

    pub workers: WorkerConfig,

    pub backup: BackupConfig,

    pub notifications: NotificationConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            metadata: MetadataConfig::default(),
            downloads: DownloadConfig::default(),
            library: LibraryConfig::default(),
            quality: QualityConfig::default(),
            workers: WorkerConfig::default(),
            backup: BackupConfig::default(),
            notifications: NotificationConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,

    /// Tokio worker threads; 0 lets the runtime decide.
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/mediastack.db".to_string(),
            log_level: "info".to_string(),
            suppress_connection_errors: false,
            event_bus_buffer_size: 100,
            worker_threads: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 7878,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub tmdb_base_url: String,

    pub tmdb_api_key: String,

    /// Request timeout in seconds (default: 10)
    pub request_timeout_seconds: u32,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            tmdb_base_url: "https://api.themoviedb.org/3".to_string(),
            tmdb_api_key: String::new(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Seconds to wait before a stalled torrent is failed and blacklisted (default: 900)
    pub stalled_timeout_seconds: u32,

    /// Request timeout against download clients, in seconds (default: 30)
    pub request_timeout_seconds: u32,

    /// Bound on concurrent indexer/metadata requests inside one task.
    pub concurrent_requests: usize,

    #[serde(default)]
    pub remote_path_mappings: Vec<(String, String)>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            stalled_timeout_seconds: 900,
            request_timeout_seconds: 30,
            concurrent_requests: 5,
            remote_path_mappings: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub movie_root: String,

    pub series_root: String,

    /// Hardlink | Copy | Move
    pub import_mode: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            movie_root: "./library/movies".to_string(),
            series_root: "./library/series".to_string(),
            import_mode: "Hardlink".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropersPreference {
    PreferAndUpgrade,
    DoNotUpgrade,
    DoNotPrefer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub propers_repacks_preference: PropersPreference,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            propers_repacks_preference: PropersPreference::PreferAndUpgrade,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub enabled: bool,

    /// Skip the immediate first run of slow workers at startup.
    pub skip_initial_runs: bool,

    /// Concurrency for batched searches (default: 5).
    pub search_concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            skip_initial_runs: true,
            search_concurrency: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,

    pub backup_dir: String,

    /// Hours between scheduled database file backups.
    pub interval_hours: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backup_dir: "data/backups".to_string(),
            interval_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { webhook_url: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("MEDIASTACK_TMDB_API_KEY") {
            self.metadata.tmdb_api_key = key;
        }
        if let Ok(db) = std::env::var("MEDIASTACK_DATABASE_PATH") {
            self.general.database_path = db;
        }
        if let Ok(port) = std::env::var("MEDIASTACK_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mediastack").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".mediastack").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if !matches!(
            self.library.import_mode.as_str(),
            "Hardlink" | "Copy" | "Move"
        ) {
            anyhow::bail!(
                "Invalid import mode '{}': expected Hardlink, Copy or Move",
                self.library.import_mode
            );
        }

        if self.downloads.concurrent_requests == 0 {
            anyhow::bail!("concurrent_requests must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 7878);
        assert_eq!(config.downloads.concurrent_requests, 5);
        assert_eq!(config.library.import_mode, "Hardlink");
        assert_eq!(
            config.quality.propers_repacks_preference,
            PropersPreference::PreferAndUpgrade
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[library]"));
        assert!(toml_str.contains("[workers]"));
    }

    #[test]
    fn test_config_deserialization_partial() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [server]
            port = 9000
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.port, 9000);

        assert_eq!(config.library.import_mode, "Hardlink");
    }

    #[test]
    fn test_validate_rejects_bad_import_mode() {
        let mut config = Config::default();
        config.library.import_mode = "Symlink".to_string();
        assert!(config.validate().is_err());
    }
}
