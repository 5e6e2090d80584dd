//! Error handling module for the region cropper

use thiserror::Error;

use crate::domain::rules::ValidationReport;

/// Main error type for cropper operations
#[derive(Error, Debug)]
pub enum CropperError {
    /// No committed selection, or a selection with no area
    #[error("Invalid selection: {reason}")]
    InvalidSelection { reason: String },

    /// Width/height field that is not a usable integer
    #[error("Invalid {dimension} '{value}': {reason}")]
    InvalidDimensions {
        dimension: String,
        value: String,
        reason: String,
    },

    /// Every problem found while validating a job request
    #[error("{0}")]
    Validation(ValidationReport),

    /// Input path missing or not readable as a video stream
    #[error("Cannot open source video {path}: {message}")]
    SourceOpenFailure { path: String, message: String },

    /// Decoding failed part-way through the source
    #[error("Failed to read frame {frame}: {message}")]
    FrameReadFailure { frame: u64, message: String },

    /// Encoding or writing the intermediate output failed
    #[error("Failed to write frame {frame}: {message}")]
    FrameWriteFailure { frame: u64, message: String },

    /// Audio could not be merged back; callers downgrade this to a warning
    #[error("Audio merge failed: {message}")]
    AudioMergeFailure { message: String },

    /// Output exists and the overwrite policy forbids replacing it
    #[error("Output file already exists: {path}")]
    OutputExists { path: String },

    /// Configuration file or value error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    FFmpegInit { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// FFmpeg error
    #[error("FFmpeg error: {0}")]
    FFmpeg(#[from] ffmpeg_next::Error),
}

impl CropperError {
    /// True for errors raised before any media I/O starts
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CropperError::InvalidSelection { .. }
                | CropperError::InvalidDimensions { .. }
                | CropperError::Validation(_)
                | CropperError::OutputExists { .. }
        )
    }
}

/// Result type alias for cropper operations
pub type CropperResult<T> = std::result::Result<T, CropperError>;
