use crate::clients::traits::MediaInfoProbe;
use crate::models::media::MediaInfo;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// ffprobe-backed media analysis. The probe is a blocking subprocess, so
/// it runs on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProbe;

impl FfprobeProbe {
    fn probe_blocking(path: &Path) -> Result<MediaInfo> {
        let output = ffprobe::ffprobe(path)
            .with_context(|| format!("Failed to run ffprobe on {}", path.display()))?;

        let video_stream = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .context("No video stream found")?;

        let audio_streams: Vec<_> = output
            .streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some("audio"))
            .collect();

        let duration_secs = output
            .format
            .duration
            .and_then(|d| d.parse::<f64>().ok())
            .or_else(|| {
                video_stream
                    .duration
                    .as_ref()
                    .and_then(|d| d.parse::<f64>().ok())
            })
            .unwrap_or(0.0);

        let audio_languages = audio_streams
            .iter()
            .filter_map(|s| s.tags.as_ref().and_then(|t| t.language.clone()))
            .collect();

        let subtitle_languages = output
            .streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some("subtitle"))
            .filter_map(|s| s.tags.as_ref().and_then(|t| t.language.clone()))
            .collect();

        let dynamic_range = video_stream.pix_fmt.as_deref().and_then(|fmt| {
            fmt.contains("10le")
                .then(|| "HDR".to_string())
        });

        let info = MediaInfo {
            resolution_width: video_stream.width.unwrap_or(0),
            resolution_height: video_stream.height.unwrap_or(0),
            video_codec: video_stream
                .codec_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            audio_codec: audio_streams
                .first()
                .and_then(|s| s.codec_name.clone())
                .unwrap_or_default(),
            #[allow(clippy::cast_precision_loss)]
            audio_channels: audio_streams
                .first()
                .and_then(|s| s.channels)
                .map(|c| c as f64),
            audio_languages,
            subtitle_languages,
            dynamic_range,
            duration_secs,
        };

        debug!(
            "Analyzed media {:?}: {} ({}), {}s",
            path,
            info.resolution_str(),
            info.video_codec,
            info.duration_secs
        );

        Ok(info)
    }
}

#[async_trait]
impl MediaInfoProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::probe_blocking(&path))
            .await
            .context("Probe task failed")?
    }
}
