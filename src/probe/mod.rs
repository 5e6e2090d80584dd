//! Source inspection: reads the video properties a session works against

use std::path::Path;

use ffmpeg_next as ffmpeg;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::model::{FrameRate, SourceVideoMeta};
use crate::error::{CropperError, CropperResult};

/// Audio track summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrackInfo {
    pub index: usize,
    pub codec: String,
    /// Track duration in seconds, if the container reports one
    pub duration_secs: Option<f64>,
}

/// Everything `inspect` reports about a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub path: String,
    pub container: String,
    pub file_size: u64,
    pub video: SourceVideoMeta,
    pub audio: Option<AudioTrackInfo>,
}

/// Reads [`SourceVideoMeta`] from media files
pub struct MediaInspector;

impl MediaInspector {
    /// Open `path` and read its video properties
    pub fn inspect(path: &Path) -> CropperResult<SourceVideoMeta> {
        let ictx = open_input(path)?;
        meta_from_input(&ictx, path)
    }

    /// Full report including container and audio details
    pub fn report(path: &Path) -> CropperResult<ProbeReport> {
        let ictx = open_input(path)?;
        let video = meta_from_input(&ictx, path)?;
        let file_size = std::fs::metadata(path)?.len();

        let audio = ictx.streams().best(ffmpeg::media::Type::Audio).map(|stream| {
            let tb = stream.time_base();
            AudioTrackInfo {
                index: stream.index(),
                codec: stream.parameters().id().name().to_string(),
                duration_secs: (stream.duration() > 0 && tb.denominator() != 0)
                    .then(|| stream.duration() as f64 * f64::from(tb)),
            }
        });

        Ok(ProbeReport {
            path: path.display().to_string(),
            container: ictx.format().name().to_string(),
            file_size,
            video,
            audio,
        })
    }
}

/// Open a source for reading, mapping every failure to [`CropperError::SourceOpenFailure`]
pub(crate) fn open_input(path: &Path) -> CropperResult<ffmpeg::format::context::Input> {
    info!("Inspecting video file: {}", path.display());

    if !path.is_file() {
        return Err(CropperError::SourceOpenFailure {
            path: path.display().to_string(),
            message: "file does not exist".to_string(),
        });
    }

    ffmpeg::format::input(&path).map_err(|e| CropperError::SourceOpenFailure {
        path: path.display().to_string(),
        message: format!("Failed to open input file: {}", e),
    })
}

/// Read the best video stream's properties from an opened input
pub(crate) fn meta_from_input(ictx: &ffmpeg::format::context::Input, path: &Path) -> CropperResult<SourceVideoMeta> {
    let open_failure = |message: String| CropperError::SourceOpenFailure {
        path: path.display().to_string(),
        message,
    };

    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| open_failure("No video stream found in input file".to_string()))?;

    let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
        .map_err(|e| open_failure(format!("Failed to create decoder context: {}", e)))?
        .decoder()
        .video()
        .map_err(|e| open_failure(format!("Failed to create video decoder: {}", e)))?;

    let frame_rate = stream_frame_rate(&stream).map_err(|e| match e {
        CropperError::SourceOpenFailure { message, .. } => open_failure(message),
        other => other,
    })?;

    let stream_duration = {
        let tb = stream.time_base();
        (stream.duration() > 0 && tb.denominator() != 0).then(|| stream.duration() as f64 * f64::from(tb))
    };
    let duration_secs = stream_duration
        .or_else(|| (ictx.duration() > 0).then(|| ictx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64))
        .unwrap_or(0.0);

    let frame_count = if stream.frames() > 0 {
        stream.frames() as u64
    } else {
        let estimate = (duration_secs * frame_rate.as_f64()).round() as u64;
        debug!("Container reports no frame count, estimated {}", estimate);
        estimate
    };

    let mut meta = SourceVideoMeta::new(decoder.width(), decoder.height(), frame_rate, frame_count)
        .map_err(|e| open_failure(e.to_string()))?;
    meta.duration_secs = duration_secs;
    meta.codec = stream.parameters().id().name().to_string();
    meta.has_audio = ictx.streams().best(ffmpeg::media::Type::Audio).is_some();

    info!(
        "Source: {}x{} @ {}, {} frames, {:.3}s, audio: {}",
        meta.width, meta.height, meta.frame_rate, meta.frame_count, meta.duration_secs, meta.has_audio
    );
    Ok(meta)
}

/// Average frame rate, falling back to the stream's base rate
fn stream_frame_rate(stream: &ffmpeg::format::stream::Stream) -> CropperResult<FrameRate> {
    let avg = stream.avg_frame_rate();
    if avg.numerator() > 0 && avg.denominator() > 0 {
        return FrameRate::new(avg.numerator(), avg.denominator());
    }

    let base = stream.rate();
    warn!("Average frame rate unavailable, using stream rate {}/{}", base.numerator(), base.denominator());
    FrameRate::new(base.numerator(), base.denominator())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_open_failure() {
        let dir = TempDir::new().unwrap();
        let err = MediaInspector::inspect(&dir.path().join("nope.mp4")).unwrap_err();
        assert!(matches!(err, CropperError::SourceOpenFailure { .. }));
    }

    #[test]
    fn test_garbage_file_is_open_failure() {
        let _ = ffmpeg::init();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"definitely not a video container").unwrap();
        let err = MediaInspector::inspect(&path).unwrap_err();
        assert!(matches!(err, CropperError::SourceOpenFailure { .. }));
    }
}
