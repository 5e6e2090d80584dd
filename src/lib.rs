//! Region Cropper Library
//!
//! Maps a selection drawn on a scaled preview back to source pixels, crops (and
//! optionally resizes) every frame of the source into a silent H.264 MP4, then
//! reattaches the source's audio trimmed to the new video's length.

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod planner;
pub mod probe;
pub mod selection;
pub mod streams;
pub mod utils;

// Re-export commonly used types
pub use app::{CropInteractor, CropOutcome, EditingSession, SessionConfig};
pub use config::CropperConfig;
pub use domain::model::{CropJob, CropRect, OverwritePolicy, Point, SelectionMode, SourceVideoMeta, TargetSize};
pub use domain::rules::{JobRequest, JobValidator, ValidationReport};
pub use engine::{CropPipeline, EncoderSettings};
pub use error::{CropperError, CropperResult};
pub use planner::target_size::TargetSizeResolver;
pub use selection::{DisplayTransform, SelectionEngine, SelectionMessage};
pub use streams::{AudioOutcome, AudioReattacher};

/// Initialize FFmpeg
pub fn init() -> CropperResult<()> {
    ffmpeg_next::init().map_err(|e| CropperError::FFmpegInit {
        message: e.to_string(),
    })?;

    Ok(())
}
