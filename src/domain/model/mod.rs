// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CropperError, CropperResult};

/// A point in either display or source pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Parse "x,y"
    pub fn parse(text: &str) -> CropperResult<Self> {
        let (x, y) = text.trim().split_once(',').ok_or_else(|| CropperError::InvalidSelection {
            reason: format!("point '{}' must be written as x,y", text),
        })?;
        let parse_axis = |axis: &str, value: &str| {
            value.trim().parse::<f64>().map_err(|_| CropperError::InvalidSelection {
                reason: format!("{} coordinate '{}' is not a number", axis, value.trim()),
            })
        };
        Ok(Self::new(parse_axis("x", x)?, parse_axis("y", y)?))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Frame rate as a rational number of frames per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: i32,
    pub den: i32,
}

impl FrameRate {
    /// Create a new frame rate
    pub fn new(num: i32, den: i32) -> CropperResult<Self> {
        if num <= 0 || den <= 0 {
            return Err(CropperError::SourceOpenFailure {
                path: String::new(),
                message: format!("frame rate {}/{} is not positive", num, den),
            });
        }
        Ok(Self { num, den })
    }

    /// Frames per second as a float
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Duration of a single frame in seconds
    pub fn frame_duration(&self) -> f64 {
        self.den as f64 / self.num as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} fps", self.as_f64())
    }
}

/// Properties of the input video, read once per session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVideoMeta {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// Frame count reported by the container, estimated from the duration when absent
    pub frame_count: u64,
    pub duration_secs: f64,
    pub has_audio: bool,
    pub codec: String,
}

impl SourceVideoMeta {
    /// Create new metadata with validation
    pub fn new(width: u32, height: u32, frame_rate: FrameRate, frame_count: u64) -> CropperResult<Self> {
        if width == 0 || height == 0 {
            return Err(CropperError::SourceOpenFailure {
                path: String::new(),
                message: format!("video dimensions {}x{} are empty", width, height),
            });
        }

        Ok(Self {
            width,
            height,
            frame_rate,
            frame_count,
            duration_secs: frame_count as f64 * frame_rate.frame_duration(),
            has_audio: false,
            codec: String::new(),
        })
    }

    /// Get aspect ratio
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Shape constraint applied while dragging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Any rectangle
    #[default]
    Free,
    /// 1:1 square
    Square,
}

impl SelectionMode {
    /// Parse selection mode from string
    pub fn parse(mode: &str) -> CropperResult<Self> {
        match mode.trim().to_lowercase().as_str() {
            "free" => Ok(SelectionMode::Free),
            "square" | "1:1" => Ok(SelectionMode::Square),
            other => Err(CropperError::InvalidSelection {
                reason: format!("unknown selection mode '{}' (expected free or square)", other),
            }),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Free => write!(f, "free"),
            SelectionMode::Square => write!(f, "square"),
        }
    }
}

/// Committed crop window in source pixels.
///
/// Always satisfies `0 <= x1 < x2 <= width` and `0 <= y1 < y2 <= height` for the
/// bounds it was built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRect {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

impl CropRect {
    /// Build a rectangle from ordered edges, checked against the source bounds
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32, width: u32, height: u32) -> CropperResult<Self> {
        if x1 >= x2 || y1 >= y2 {
            return Err(CropperError::InvalidSelection {
                reason: format!(
                    "selection ({}, {})-({}, {}) has no area",
                    x1, y1, x2, y2
                ),
            });
        }
        if x2 > width || y2 > height {
            return Err(CropperError::InvalidSelection {
                reason: format!(
                    "selection ({}, {})-({}, {}) exceeds the {}x{} source",
                    x1, y1, x2, y2, width, height
                ),
            });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Build a rectangle from two opposite corners in any order
    pub fn from_corners(a: (u32, u32), b: (u32, u32), width: u32, height: u32) -> CropperResult<Self> {
        Self::new(a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1), width, height)
    }

    pub fn x1(&self) -> u32 {
        self.x1
    }

    pub fn y1(&self) -> u32 {
        self.y1
    }

    pub fn x2(&self) -> u32 {
        self.x2
    }

    pub fn y2(&self) -> u32 {
        self.y2
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn is_square(&self) -> bool {
        self.width() == self.height()
    }

    /// Parse "x1,y1,x2,y2" against the source bounds
    pub fn parse(text: &str, width: u32, height: u32) -> CropperResult<Self> {
        let values = text
            .split(',')
            .map(|part| {
                part.trim().parse::<u32>().map_err(|_| CropperError::InvalidSelection {
                    reason: format!("rectangle coordinate '{}' is not a whole number", part.trim()),
                })
            })
            .collect::<CropperResult<Vec<u32>>>()?;

        match values.as_slice() {
            [x1, y1, x2, y2] => Self::from_corners((*x1, *y1), (*x2, *y2), width, height),
            _ => Err(CropperError::InvalidSelection {
                reason: format!("rectangle '{}' must be written as x1,y1,x2,y2", text),
            }),
        }
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})-({}, {}) [{}x{}]",
            self.x1,
            self.y1,
            self.x2,
            self.y2,
            self.width(),
            self.height()
        )
    }
}

/// Requested output size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetSize {
    /// Keep the crop's native size
    Native,
    /// Resize to exactly this size
    Exact { width: u32, height: u32 },
    /// Only some axes requested; a missing axis keeps the native extent
    Partial {
        width: Option<u32>,
        height: Option<u32>,
    },
}

impl TargetSize {
    /// Final encoded dimensions for a given crop
    pub fn output_dimensions(&self, rect: &CropRect) -> (u32, u32) {
        match *self {
            TargetSize::Native => (rect.width(), rect.height()),
            TargetSize::Exact { width, height } => (width, height),
            TargetSize::Partial { width, height } => (
                width.unwrap_or_else(|| rect.width()),
                height.unwrap_or_else(|| rect.height()),
            ),
        }
    }

    /// True when frames must go through the scaler
    pub fn requires_resize(&self, rect: &CropRect) -> bool {
        self.output_dimensions(rect) != (rect.width(), rect.height())
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSize::Native => write!(f, "native"),
            TargetSize::Exact { width, height } => write!(f, "{}x{}", width, height),
            TargetSize::Partial { width, height } => {
                let axis = |value: &Option<u32>| value.map_or_else(|| "native".to_string(), |v| v.to_string());
                write!(f, "{}x{}", axis(width), axis(height))
            }
        }
    }
}

/// What to do when the final output path is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Replace the existing file
    #[default]
    Always,
    /// Refuse to run the job
    Never,
    /// Pick the first free "name (n).mp4"
    Rename,
}

impl OverwritePolicy {
    /// Parse overwrite policy from string
    pub fn parse(policy: &str) -> CropperResult<Self> {
        match policy.trim().to_lowercase().as_str() {
            "always" | "overwrite" => Ok(OverwritePolicy::Always),
            "never" => Ok(OverwritePolicy::Never),
            "rename" => Ok(OverwritePolicy::Rename),
            other => Err(CropperError::Config {
                message: format!("unknown overwrite policy '{}' (expected always, never or rename)", other),
            }),
        }
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverwritePolicy::Always => write!(f, "always"),
            OverwritePolicy::Never => write!(f, "never"),
            OverwritePolicy::Rename => write!(f, "rename"),
        }
    }
}

/// Immutable description of one crop run
#[derive(Debug, Clone, PartialEq)]
pub struct CropJob {
    pub source_path: PathBuf,
    pub rect: CropRect,
    pub target: TargetSize,
    pub output_dir: PathBuf,
    pub overwrite: OverwritePolicy,
}

impl CropJob {
    /// Only the job validator builds jobs
    pub(crate) fn new(
        source_path: PathBuf,
        rect: CropRect,
        target: TargetSize,
        output_dir: PathBuf,
        overwrite: OverwritePolicy,
    ) -> Self {
        Self {
            source_path,
            rect,
            target,
            output_dir,
            overwrite,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn output_dimensions(&self) -> (u32, u32) {
        self.target.output_dimensions(&self.rect)
    }
}

#[cfg(test)]
mod tests;
