use crate::constants::VIDEO_EXTENSIONS;
use crate::db::Store;
use crate::parser::release::{detect_word, parse_release_title};
use crate::services::library::LibraryService;
use anyhow::Result;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct ScanStats {
    pub scanned: usize,
    pub matched: usize,
    pub updated: usize,
}

/// Disk reconciliation: `has_file` is only ever true while the path
/// still resolves to a real file, and files that appeared out-of-band
/// get picked up.
#[derive(Clone)]
pub struct ScannerService {
    store: Store,
    library: LibraryService,
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Walk a folder for video files, skipping dotfiles and dot-directories.
fn video_files_in(folder: &str) -> Vec<(std::path::PathBuf, u64)> {
    WalkDir::new(folder)
        .into_iter()
        .filter_entry(|e| {
            !e.file_name()
                .to_str()
                .is_some_and(|n| n.starts_with('.'))
        })
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file() && is_video(e.path()))
        .map(|e| {
            let size = e.metadata().map(|m| m.len()).unwrap_or(0);
            (e.into_path(), size)
        })
        .collect()
}

impl ScannerService {
    #[must_use]
    pub const fn new(store: Store, library: LibraryService) -> Self {
        Self { store, library }
    }

    /// The library-refresh worker body.
    pub async fn scan(&self) -> Result<ScanStats> {
        let start = std::time::Instant::now();
        let mut stats = ScanStats::default();

        self.scan_movies(&mut stats).await?;
        self.scan_episodes(&mut stats).await?;

        self.library
            .record_scan_completed(stats.scanned, stats.updated)
            .await?;

        info!(
            event = "library_scan_finished",
            scanned = stats.scanned,
            matched = stats.matched,
            updated = stats.updated,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Library scan finished"
        );

        Ok(stats)
    }

    async fn scan_movies(&self, stats: &mut ScanStats) -> Result<()> {
        for movie in self.store.movies().all().await? {
            stats.scanned += 1;

            // A tracked file that vanished clears the movie's file state.
            if movie.has_file {
                let still_there = movie
                    .file_path
                    .as_deref()
                    .is_some_and(|p| Path::new(p).is_file());
                if !still_there {
                    warn!(movie = %movie.title, "Tracked file is gone, clearing");
                    self.store.movies().clear_file(&movie.id).await?;
                    stats.updated += 1;
                }
                continue;
            }

            let Some(folder) = movie.folder_path.as_deref() else {
                continue;
            };
            if !Path::new(folder).is_dir() {
                continue;
            }

            let files = video_files_in(folder);
            let Some((path, size)) = files.into_iter().max_by_key(|(_, size)| *size) else {
                continue;
            };

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let parsed = parse_release_title(&name);

            debug!(movie = %movie.title, file = %name, "Found movie file on disk");
            self.store
                .movies()
                .update_file(
                    &movie.id,
                    &path.to_string_lossy(),
                    Some(i64::try_from(size).unwrap_or(i64::MAX)),
                    &parsed.quality,
                    None,
                    parsed.group.as_deref(),
                    detect_word(&name, "PROPER"),
                    detect_word(&name, "REPACK") || detect_word(&name, "RERIP"),
                )
                .await?;
            stats.matched += 1;
            stats.updated += 1;
        }

        Ok(())
    }

    async fn scan_episodes(&self, stats: &mut ScanStats) -> Result<()> {
        for series in self.store.series().all().await? {
            let episodes = self.store.series().episodes(&series.id).await?;

            // Pass 1: verify tracked files.
            for episode in &episodes {
                stats.scanned += 1;
                if !episode.has_file {
                    continue;
                }

                let still_there = episode
                    .file_path
                    .as_deref()
                    .is_some_and(|p| Path::new(p).is_file());
                if !still_there {
                    warn!(
                        series = %series.title,
                        season = episode.season_number,
                        episode = episode.episode_number,
                        "Tracked episode file is gone, clearing"
                    );
                    self.store.series().clear_episode_file(&episode.id).await?;
                    stats.updated += 1;
                }
            }

            // Pass 2: match loose files on disk to file-less episodes.
            let Some(folder) = series.folder_path.as_deref() else {
                continue;
            };
            if !Path::new(folder).is_dir() {
                continue;
            }

            for (path, size) in video_files_in(folder) {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let parsed = parse_release_title(&name);

                let (Some(season), Some(episode_number)) =
                    (parsed.season, parsed.first_episode())
                else {
                    continue;
                };

                let Some(episode) = episodes.iter().find(|e| {
                    e.season_number == season && e.episode_number == episode_number
                }) else {
                    continue;
                };
                if episode.has_file {
                    continue;
                }

                debug!(
                    series = %series.title,
                    season,
                    episode = episode_number,
                    file = %name,
                    "Found episode file on disk"
                );
                self.store
                    .series()
                    .update_episode_file(
                        &episode.id,
                        &path.to_string_lossy(),
                        Some(i64::try_from(size).unwrap_or(i64::MAX)),
                        &parsed.quality,
                        None,
                        parsed.group.as_deref(),
                        parsed.is_proper,
                        parsed.is_repack,
                    )
                    .await?;
                stats.matched += 1;
                stats.updated += 1;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotfiles_are_ignored() {
        let dir = std::env::temp_dir().join(format!("mediastack-scan-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Show.S01E01.1080p.mkv"), b"x").unwrap();
        std::fs::write(dir.join("._Show.S01E01.1080p.mkv"), b"x").unwrap();

        let files = video_files_in(&dir.to_string_lossy());
        assert_eq!(files.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }
}
