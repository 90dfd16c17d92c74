use crate::clients::{MediaInfoProbe, Notifier};
use crate::constants::VIDEO_EXTENSIONS;
use crate::db::Store;
use crate::domain::events::event_types;
use crate::models::download::Download;
use crate::models::episode::Episode;
use crate::models::media::MediaInfo;
use crate::parser::release::parse_release_title;
use crate::services::activity::ActivityService;
use crate::services::naming::{FileNamer, NamingContext};
use serde_json::json;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Import failures that the download lifecycle maps onto the download
/// row's error message.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("ERR_NO_VIDEO: no video file found under {0}")]
    NoVideo(PathBuf),

    #[error("ERR_FS: {0}")]
    Filesystem(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportOutcome {
    pub destination: PathBuf,
    pub imported: usize,
    /// True when the destination already held this exact file.
    pub idempotent: bool,
}

/// Places completed files into the canonical library layout and updates
/// the catalog. All writes go to a sibling temp name first and are
/// renamed into place.
#[derive(Clone)]
pub struct FileImporter {
    store: Store,
    activity: ActivityService,
    notifier: Arc<dyn Notifier>,
    prober: Arc<dyn MediaInfoProbe>,
    import_mode: String,
}

impl FileImporter {
    #[must_use]
    pub fn new(
        store: Store,
        activity: ActivityService,
        notifier: Arc<dyn Notifier>,
        prober: Arc<dyn MediaInfoProbe>,
        import_mode: String,
    ) -> Self {
        Self {
            store,
            activity,
            notifier,
            prober,
            import_mode,
        }
    }

    /// Import the payload of a completed download.
    pub async fn import_download(
        &self,
        download: &Download,
        content_path: &Path,
        keep_source: bool,
    ) -> Result<ImportOutcome, ImportError> {
        if let Some(movie_id) = &download.movie_id {
            return self
                .import_movie(movie_id, content_path, &download.title, keep_source)
                .await;
        }

        let series_id = download
            .series_id
            .as_deref()
            .ok_or_else(|| ImportError::Other(anyhow::anyhow!("Download references no media")))?;

        self.import_series_download(series_id, download, content_path, keep_source)
            .await
    }

    /// Movie import: largest video file wins.
    pub async fn import_movie(
        &self,
        movie_id: &str,
        source_root: &Path,
        release_title: &str,
        keep_source: bool,
    ) -> Result<ImportOutcome, ImportError> {
        let movie = self
            .store
            .movies()
            .get(movie_id)
            .await
            .map_err(ImportError::Other)?
            .ok_or_else(|| ImportError::Other(anyhow::anyhow!("Movie not found")))?;

        let source = find_largest_video(source_root)
            .await?
            .ok_or_else(|| ImportError::NoVideo(source_root.to_path_buf()))?;

        let parsed = parse_release_title(release_title);
        let media_info = self.prober.probe(&source).await.ok();

        let namer = FileNamer::new(
            self.store
                .naming()
                .get()
                .await
                .map_err(ImportError::Other)?,
        );

        let context = NamingContext {
            quality: Some(parsed.quality.clone()),
            is_proper: parsed.is_proper,
            is_repack: parsed.is_repack,
            media_info: media_info.clone(),
            release_group: parsed.group.clone(),
        };

        let folder = movie
            .folder_path
            .clone()
            .ok_or_else(|| ImportError::Other(anyhow::anyhow!("Movie has no folder path")))?;
        let extension = source
            .extension()
            .map_or_else(|| "mkv".to_string(), |e| e.to_string_lossy().to_string());
        let file_name = format!("{}.{extension}", namer.movie_file_name(&movie, &context));
        let destination = Path::new(&folder).join(file_name);

        let previous_file = movie.file_path.clone();
        let transferred = self.transfer(&source, &destination, keep_source).await?;

        // An upgrade replaces the old file; only one copy stays behind.
        if let Some(previous) = previous_file
            && Path::new(&previous) != destination.as_path()
            && Path::new(&previous).exists()
            && let Err(e) = tokio::fs::remove_file(&previous).await
        {
            warn!(path = %previous, error = %e, "Failed to remove replaced movie file");
        }

        let file_size = tokio::fs::metadata(&destination)
            .await
            .ok()
            .map(|m| i64::try_from(m.len()).unwrap_or(i64::MAX));

        self.store
            .movies()
            .update_file(
                movie_id,
                &destination.to_string_lossy(),
                file_size,
                &parsed.quality,
                media_info.as_ref(),
                parsed.group.as_deref(),
                parsed.is_proper,
                parsed.is_repack,
            )
            .await
            .map_err(ImportError::Other)?;

        self.finish_import("movie", movie_id, &movie.title, &destination, &transferred)
            .await?;

        if !keep_source {
            cleanup_empty_dirs(&source, source_root).await;
        }

        Ok(ImportOutcome {
            destination,
            imported: 1,
            idempotent: transferred.idempotent,
        })
    }

    /// Episode import. Single-episode downloads import the largest video;
    /// season packs import every video file that parses to an episode row.
    async fn import_series_download(
        &self,
        series_id: &str,
        download: &Download,
        content_path: &Path,
        keep_source: bool,
    ) -> Result<ImportOutcome, ImportError> {
        let series = self
            .store
            .series()
            .get(series_id)
            .await
            .map_err(ImportError::Other)?
            .ok_or_else(|| ImportError::Other(anyhow::anyhow!("Series not found")))?;

        let videos = if download.episode_number.is_some() {
            match find_largest_video(content_path).await? {
                Some(v) => vec![v],
                None => Vec::new(),
            }
        } else {
            find_video_files(content_path).await?
        };

        if videos.is_empty() {
            return Err(ImportError::NoVideo(content_path.to_path_buf()));
        }

        let namer = FileNamer::new(
            self.store
                .naming()
                .get()
                .await
                .map_err(ImportError::Other)?,
        );

        let mut imported = 0;
        let mut last_destination = PathBuf::new();
        let mut idempotent = true;

        for video in videos {
            let file_name = video
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            // Episode numbers come from the download row when present,
            // otherwise from the individual file name.
            let parsed = if download.episode_number.is_some() {
                parse_release_title(&download.title)
            } else {
                parse_release_title(&file_name)
            };

            let season = download
                .season_number
                .or(parsed.season)
                .unwrap_or(1);
            let episode_number = download.episode_number.or(parsed.first_episode());

            let Some(episode_number) = episode_number else {
                warn!(file = %file_name, "Could not determine episode number, skipping");
                continue;
            };

            let Some(episode) = self
                .store
                .series()
                .find_episode(series_id, season, episode_number)
                .await
                .map_err(ImportError::Other)?
            else {
                warn!(
                    series = %series.title,
                    season,
                    episode = episode_number,
                    "No matching episode row, skipping file"
                );
                continue;
            };

            match self
                .import_one_episode(&series, &episode, &video, &parsed, &namer, keep_source)
                .await
            {
                Ok(transferred) => {
                    imported += 1;
                    idempotent &= transferred.idempotent;
                    last_destination = transferred.destination;
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Episode import failed");
                }
            }
        }

        if imported == 0 {
            return Err(ImportError::NoVideo(content_path.to_path_buf()));
        }

        if !keep_source {
            cleanup_empty_dirs(content_path, content_path).await;
        }

        Ok(ImportOutcome {
            destination: last_destination,
            imported,
            idempotent,
        })
    }

    async fn import_one_episode(
        &self,
        series: &crate::models::series::Series,
        episode: &Episode,
        source: &Path,
        parsed: &crate::models::release::ParsedRelease,
        namer: &FileNamer,
        keep_source: bool,
    ) -> Result<TransferResult, ImportError> {
        let media_info = self.prober.probe(source).await.ok();

        let context = NamingContext {
            quality: Some(parsed.quality.clone()),
            is_proper: parsed.is_proper,
            is_repack: parsed.is_repack,
            media_info: media_info.clone(),
            release_group: parsed.group.clone(),
        };

        let folder = series
            .folder_path
            .clone()
            .ok_or_else(|| ImportError::Other(anyhow::anyhow!("Series has no folder path")))?;
        let mut destination_dir = PathBuf::from(&folder);
        if series.use_season_folder {
            destination_dir = destination_dir.join(namer.season_folder_name(episode.season_number));
        }

        let extension = source
            .extension()
            .map_or_else(|| "mkv".to_string(), |e| e.to_string_lossy().to_string());
        let file_name = format!(
            "{}.{extension}",
            namer.episode_file_name(series, &[episode], &context)
        );
        let destination = destination_dir.join(file_name);

        let previous_file = episode.file_path.clone();
        let transferred = self.transfer(source, &destination, keep_source).await?;

        // A successful upgrade leaves exactly one file behind.
        if let Some(previous) = previous_file
            && Path::new(&previous) != destination.as_path()
            && Path::new(&previous).exists()
        {
            if let Err(e) = tokio::fs::remove_file(&previous).await {
                warn!(path = %previous, error = %e, "Failed to remove replaced episode file");
            }
        }

        let file_size = tokio::fs::metadata(&destination)
            .await
            .ok()
            .map(|m| i64::try_from(m.len()).unwrap_or(i64::MAX));

        self.store
            .series()
            .update_episode_file(
                &episode.id,
                &destination.to_string_lossy(),
                file_size,
                &parsed.quality,
                media_info.as_ref(),
                parsed.group.as_deref(),
                parsed.is_proper,
                parsed.is_repack,
            )
            .await
            .map_err(ImportError::Other)?;

        self.finish_import(
            "episode",
            &episode.id,
            &format!(
                "{} S{:02}E{:02}",
                series.title, episode.season_number, episode.episode_number
            ),
            &destination,
            &transferred,
        )
        .await?;

        Ok(transferred)
    }

    async fn finish_import(
        &self,
        entity_type: &str,
        entity_id: &str,
        label: &str,
        destination: &Path,
        transferred: &TransferResult,
    ) -> Result<(), ImportError> {
        if transferred.idempotent {
            debug!(destination = %destination.display(), "Import was a no-op (already in place)");
            return Ok(());
        }

        self.activity
            .record(
                entity_type,
                Some(entity_id),
                event_types::IMPORTED,
                &format!("Imported: {label}"),
                Some(json!({ "destination": destination.to_string_lossy() })),
            )
            .await
            .map_err(ImportError::Other)?;

        let notifier = Arc::clone(&self.notifier);
        let label = label.to_string();
        let entity_id = entity_id.to_string();
        tokio::spawn(async move {
            notifier
                .notify(event_types::IMPORTED, &label, Some(&entity_id))
                .await;
        });

        Ok(())
    }

    /// Hardlink-first transfer with copy fallback, through a sibling temp
    /// name and a final rename. Collisions with an identically sized
    /// destination are treated as already imported.
    async fn transfer(
        &self,
        source: &Path,
        destination: &Path,
        keep_source: bool,
    ) -> Result<TransferResult, ImportError> {
        let source_size = tokio::fs::metadata(source)
            .await
            .map_err(|e| ImportError::Filesystem(format!("source unreadable: {e}")))?
            .len();

        if let Ok(existing) = tokio::fs::metadata(destination).await {
            if existing.len() == source_size {
                info!(destination = %destination.display(), "Destination already holds this file");
                return Ok(TransferResult {
                    destination: destination.to_path_buf(),
                    idempotent: true,
                });
            }
            // Size differs: replace it.
            tokio::fs::remove_file(destination)
                .await
                .map_err(|e| ImportError::Filesystem(format!("cannot replace destination: {e}")))?;
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ImportError::Filesystem(format!("cannot create {}: {e}", parent.display())))?;
        }

        let temp = temp_name(destination);

        let _ = tokio::fs::remove_file(&temp).await;

        let mode = self.import_mode.as_str();
        let linked = if mode == "Copy" || mode == "Move" {
            false
        } else {
            match tokio::fs::hard_link(source, &temp).await {
                Ok(()) => true,
                Err(e) => {
                    debug!(error = %e, "Hardlink failed, falling back to copy");
                    false
                }
            }
        };

        if !linked {
            with_retries(|| tokio::fs::copy(source, &temp))
                .await
                .map_err(|e| ImportError::Filesystem(format!("copy failed: {e}")))?;
        }

        with_retries(|| tokio::fs::rename(&temp, destination))
            .await
            .map_err(|e| ImportError::Filesystem(format!("rename failed: {e}")))?;

        info!(
            source = %source.display(),
            destination = %destination.display(),
            hardlinked = linked,
            "Imported file"
        );

        // Move semantics, and copy-imports that should not keep the
        // client's files, drop the source afterwards.
        let delete_source = mode == "Move" || (!keep_source && !linked);
        if delete_source && let Err(e) = tokio::fs::remove_file(source).await {
            warn!(source = %source.display(), error = %e, "Failed to remove source file");
        }

        Ok(TransferResult {
            destination: destination.to_path_buf(),
            idempotent: false,
        })
    }
}

#[derive(Debug, Clone)]
struct TransferResult {
    destination: PathBuf,
    idempotent: bool,
}

fn temp_name(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    destination.with_file_name(format!(".{name}.partial"))
}

/// Transient filesystem races get three attempts with a short backoff.
async fn with_retries<F, Fut, T>(op: F) -> std::io::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..3 {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.expect("retry loop ran at least once"))
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// All video files under a path (which may itself be a file).
async fn find_video_files(root: &Path) -> Result<Vec<PathBuf>, ImportError> {
    if root.is_file() {
        return Ok(if is_video(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut videos = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ImportError::Filesystem(format!("cannot read {}: {e}", dir.display())))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ImportError::Filesystem(e.to_string()))?
        {
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
            } else if is_video(&path) {
                videos.push(path);
            }
        }
    }

    videos.sort();
    Ok(videos)
}

/// The largest video file under a path; samples and extras lose to the
/// feature by size.
async fn find_largest_video(root: &Path) -> Result<Option<PathBuf>, ImportError> {
    let videos = find_video_files(root).await?;

    let mut best: Option<(u64, PathBuf)> = None;
    for video in videos {
        let size = tokio::fs::metadata(&video)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if best.as_ref().is_none_or(|(s, _)| size > *s) {
            best = Some((size, video));
        }
    }

    Ok(best.map(|(_, path)| path))
}

/// Remove empty directories between an imported file and the download
/// job's root. The boundary itself is never removed, and library roots
/// are never inside it.
async fn cleanup_empty_dirs(start: &Path, boundary: &Path) {
    let mut current = start.parent();

    while let Some(dir) = current {
        if dir == boundary || !dir.starts_with(boundary) {
            break;
        }

        match tokio::fs::remove_dir(dir).await {
            Ok(()) => debug!(dir = %dir.display(), "Removed empty source directory"),
            // Not empty or already gone; either way, stop walking up.
            Err(_) => break,
        }

        current = dir.parent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mediastack-test-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn finds_largest_video() {
        let dir = scratch_dir("largest");
        std::fs::write(dir.join("sample.mkv"), vec![0u8; 10]).unwrap();
        std::fs::write(dir.join("feature.mkv"), vec![0u8; 1000]).unwrap();
        std::fs::write(dir.join("notes.txt"), b"not a video").unwrap();
        std::fs::write(dir.join(".hidden.mkv"), vec![0u8; 5000]).unwrap();

        let best = find_largest_video(&dir).await.unwrap().unwrap();
        assert_eq!(best.file_name().unwrap(), "feature.mkv");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn no_video_yields_none() {
        let dir = scratch_dir("novideo");
        std::fs::write(dir.join("readme.nfo"), b"x").unwrap();

        assert!(find_largest_video(&dir).await.unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn cleanup_stays_inside_boundary() {
        let root = scratch_dir("cleanup");
        let nested = root.join("job").join("sub");
        std::fs::create_dir_all(&nested).unwrap();
        let file = nested.join("file.mkv");

        cleanup_empty_dirs(&file, &root).await;

        assert!(!nested.exists());
        assert!(!root.join("job").exists());
        assert!(root.exists());

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn temp_name_is_sibling_dotfile() {
        let temp = temp_name(Path::new("/library/Movie (2020)/Movie.mkv"));
        assert_eq!(temp, Path::new("/library/Movie (2020)/.Movie.mkv.partial"));
    }
}
