//! Crop planning: output size resolution and the per-job encode plan

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::model::{CropJob, CropRect, FrameRate, SourceVideoMeta};
use crate::error::{CropperError, CropperResult};

pub mod target_size;

pub use target_size::TargetSizeResolver;

/// Pixel layout handed to the H.264 encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPixelFormat {
    /// 4:2:0, needs even dimensions
    Yuv420p,
    /// 4:4:4, any dimensions
    Yuv444p,
}

impl OutputPixelFormat {
    /// 4:2:0 when both dimensions are even, otherwise 4:4:4 so the exact size is kept
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        if width % 2 == 0 && height % 2 == 0 {
            OutputPixelFormat::Yuv420p
        } else {
            OutputPixelFormat::Yuv444p
        }
    }
}

/// Everything the frame loop needs to know about one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPlan {
    /// Source region copied out of every frame
    pub rect: CropRect,
    /// Encoded frame width
    pub output_width: u32,
    /// Encoded frame height
    pub output_height: u32,
    pub pixel_format: OutputPixelFormat,
    /// True when the cropped region is rescaled
    pub resize: bool,
    /// Output frame rate, equal to the source's
    pub frame_rate: FrameRate,
    /// Frame count reported by the source, advisory
    pub expected_frames: u64,
}

/// Builds a [`CropPlan`] from a validated job and the opened source
pub struct CropPlanner;

impl CropPlanner {
    /// Plan a job against the actual source dimensions
    pub fn plan(job: &CropJob, meta: &SourceVideoMeta) -> CropperResult<CropPlan> {
        let rect = job.rect;
        if rect.x2() > meta.width || rect.y2() > meta.height {
            return Err(CropperError::InvalidSelection {
                reason: format!(
                    "selection {} lies outside the {}x{} source",
                    rect, meta.width, meta.height
                ),
            });
        }

        let (output_width, output_height) = job.output_dimensions();
        if output_width == 0 || output_height == 0 {
            return Err(CropperError::InvalidDimensions {
                dimension: "output size".to_string(),
                value: format!("{}x{}", output_width, output_height),
                reason: "must be at least 1x1".to_string(),
            });
        }

        let plan = CropPlan {
            rect,
            output_width,
            output_height,
            pixel_format: OutputPixelFormat::for_dimensions(output_width, output_height),
            resize: job.target.requires_resize(&rect),
            frame_rate: meta.frame_rate,
            expected_frames: meta.frame_count,
        };

        info!(
            "Planned crop {} -> {}x{} ({:?}, resize: {})",
            plan.rect, plan.output_width, plan.output_height, plan.pixel_format, plan.resize
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{OverwritePolicy, TargetSize};
    use std::path::PathBuf;

    fn meta() -> SourceVideoMeta {
        SourceVideoMeta::new(640, 480, FrameRate::new(30, 1).unwrap(), 300).unwrap()
    }

    fn job(rect: CropRect, target: TargetSize) -> CropJob {
        CropJob::new(
            PathBuf::from("in.mp4"),
            rect,
            target,
            PathBuf::from("."),
            OverwritePolicy::Always,
        )
    }

    #[test]
    fn test_pixel_format_choice() {
        assert_eq!(OutputPixelFormat::for_dimensions(640, 480), OutputPixelFormat::Yuv420p);
        assert_eq!(OutputPixelFormat::for_dimensions(641, 480), OutputPixelFormat::Yuv444p);
        assert_eq!(OutputPixelFormat::for_dimensions(150, 151), OutputPixelFormat::Yuv444p);
    }

    #[test]
    fn test_native_plan() {
        let rect = CropRect::new(100, 100, 250, 250, 640, 480).unwrap();
        let plan = CropPlanner::plan(&job(rect, TargetSize::Native), &meta()).unwrap();
        assert_eq!((plan.output_width, plan.output_height), (150, 150));
        assert!(!plan.resize);
        assert_eq!(plan.frame_rate, FrameRate::new(30, 1).unwrap());
        assert_eq!(plan.expected_frames, 300);
    }

    #[test]
    fn test_resize_plan() {
        let rect = CropRect::new(0, 0, 400, 300, 640, 480).unwrap();
        let plan = CropPlanner::plan(&job(rect, TargetSize::Exact { width: 800, height: 600 }), &meta()).unwrap();
        assert!(plan.resize);
        assert_eq!(plan.pixel_format, OutputPixelFormat::Yuv420p);
    }

    #[test]
    fn test_rect_outside_actual_source() {
        // rect built against a larger assumed frame
        let rect = CropRect::new(0, 0, 1280, 720, 1920, 1080).unwrap();
        let err = CropPlanner::plan(&job(rect, TargetSize::Native), &meta()).unwrap_err();
        assert!(matches!(err, CropperError::InvalidSelection { .. }));
    }
}
