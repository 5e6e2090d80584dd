//! Audio handling: putting the source's soundtrack back onto the cropped video

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CropperResult;

pub mod aac;
pub mod audio;

pub use audio::{AudioReattacher, FfmpegMuxer};

/// Video vs. kept-audio duration after a mux
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Duration of the cropped video in seconds
    pub video_secs: f64,
    /// Duration of the audio packets that were kept, in seconds
    pub audio_secs: f64,
    /// `video - audio` in milliseconds; positive when audio ends first
    pub drift_ms: f64,
}

impl DriftReport {
    pub fn new(video_secs: f64, audio_secs: f64) -> Self {
        Self {
            video_secs,
            audio_secs,
            drift_ms: (video_secs - audio_secs) * 1000.0,
        }
    }

    /// True when the absolute drift is above `threshold_ms`
    pub fn exceeds(&self, threshold_ms: f64) -> bool {
        self.drift_ms.abs() > threshold_ms
    }
}

/// Result of a successful mux
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuxReport {
    /// Codec of the source soundtrack before transcoding to AAC
    pub source_codec: String,
    pub sample_rate: u32,
    /// AAC packets written
    pub audio_packets: u64,
    /// True when source audio ran past the end of the video and was cut
    pub trimmed: bool,
    pub drift: DriftReport,
}

/// Combines the source's audio with a processed silent video
pub trait MediaMuxer {
    /// Whether the source carries an audio track at all
    fn has_audio(&self, source: &Path) -> CropperResult<bool>;

    /// Write `output` holding `video`'s frames and `source`'s audio as AAC,
    /// trimmed so the audio never outlasts the video
    fn mux(&self, source: &Path, video: &Path, output: &Path) -> CropperResult<MuxReport>;
}

/// What happened to the audio of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AudioOutcome {
    /// Audio merged into the deliverable
    Muxed { drift: DriftReport },
    /// Source had no audio; the silent video is the deliverable
    NoAudioTrack,
    /// Merge failed; the silent intermediate is the deliverable
    Fallback { reason: String },
}

/// Deliverable produced by the reattacher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reattachment {
    pub final_path: PathBuf,
    pub audio: AudioOutcome,
    pub warnings: Vec<String>,
}

impl Reattachment {
    /// True when the intermediate itself was handed out and must be kept
    pub fn kept_intermediate(&self) -> bool {
        matches!(self.audio, AudioOutcome::Fallback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_report() {
        let drift = DriftReport::new(10.0, 9.979);
        assert!((drift.drift_ms - 21.0).abs() < 1e-6);
        assert!(!drift.exceeds(100.0));
        assert!(drift.exceeds(20.0));

        let longer_audio = DriftReport::new(5.0, 5.5);
        assert!(longer_audio.drift_ms < 0.0);
        assert!(longer_audio.exceeds(100.0));
    }
}
