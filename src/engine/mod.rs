//! Frame pipeline: decode, crop, resize and encode the silent intermediate

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CropperError, CropperResult};
use crate::planner::OutputPixelFormat;

pub mod crop;
pub mod frame_ops;
pub mod progress;

pub use crop::CropPipeline;

/// x264 presets accepted by the encoder settings
pub const PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

/// H.264 encoder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Encoding preset (ultrafast .. veryslow)
    pub preset: String,
    /// Constant rate factor (0-51, lower is higher quality)
    pub crf: u8,
    /// Encoder worker threads
    pub threads: usize,
    /// Put the moov atom first
    pub faststart: bool,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            preset: "medium".to_string(),
            crf: 23,
            threads: num_cpus::get(),
            faststart: true,
        }
    }
}

impl EncoderSettings {
    /// Set the encoding preset
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Set constant rate factor
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf.min(51);
        self
    }

    /// Set encoder thread count; zero means all cores
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = if threads == 0 { num_cpus::get() } else { threads };
        self
    }

    pub fn with_faststart(mut self, faststart: bool) -> Self {
        self.faststart = faststart;
        self
    }

    /// Reject values libx264 would refuse
    pub fn validate(&self) -> CropperResult<()> {
        if self.crf > 51 {
            return Err(CropperError::Config {
                message: format!("CRF value {} is invalid (must be 0-51)", self.crf),
            });
        }
        if !PRESETS.contains(&self.preset.as_str()) {
            return Err(CropperError::Config {
                message: format!(
                    "Unknown preset '{}' (expected one of: {})",
                    self.preset,
                    PRESETS.join(", ")
                ),
            });
        }
        Ok(())
    }
}

/// What the frame loop produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Silent intermediate video
    pub output_path: PathBuf,
    /// Frames decoded from the source
    pub frames_read: u64,
    /// Frames handed to the encoder
    pub frames_written: u64,
    pub output_width: u32,
    pub output_height: u32,
    pub pixel_format: OutputPixelFormat,
    /// `frames_written / fps`
    pub duration_secs: f64,
}
