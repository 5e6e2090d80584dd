// Inspect interactor - reports source properties and the preview fit

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{CropperError, CropperResult};
use crate::probe::{MediaInspector, ProbeReport};
use crate::selection::DisplayTransform;
use crate::utils::{format_duration, format_file_size};

/// What `inspect` prints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectResponse {
    pub report: ProbeReport,
    /// Preview fit, when a canvas size was given
    pub transform: Option<DisplayTransform>,
}

/// Interactor for media file inspection
pub struct InspectInteractor;

impl InspectInteractor {
    /// Probe `path` and, with a canvas, compute how it would be previewed
    pub fn execute(path: &Path, canvas: Option<(u32, u32)>) -> CropperResult<InspectResponse> {
        info!("Starting media file inspection for: {}", path.display());

        let report = MediaInspector::report(path)?;
        let transform = canvas
            .map(|(w, h)| DisplayTransform::fit(report.video.width, report.video.height, w, h))
            .transpose()?;

        info!("Media file inspection completed");
        Ok(InspectResponse { report, transform })
    }

    /// Format the response as pretty JSON
    pub fn format_as_json(response: &InspectResponse) -> CropperResult<String> {
        serde_json::to_string_pretty(response).map_err(|e| CropperError::Config {
            message: format!("JSON serialization failed: {}", e),
        })
    }

    /// Format the response as human-readable text
    pub fn format_as_text(response: &InspectResponse) -> String {
        let report = &response.report;
        let video = &report.video;
        let mut out = String::new();

        let _ = writeln!(out, "File: {}", report.path);
        let _ = writeln!(out, "Container: {}", report.container);
        let _ = writeln!(out, "Size: {}", format_file_size(report.file_size));
        let _ = writeln!(
            out,
            "Duration: {}",
            format_duration(std::time::Duration::from_secs_f64(video.duration_secs.max(0.0)))
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Video:");
        let _ = writeln!(out, "  Codec: {}", video.codec);
        let _ = writeln!(out, "  Resolution: {}x{}", video.width, video.height);
        let _ = writeln!(out, "  Frame rate: {} ({}/{})", video.frame_rate, video.frame_rate.num, video.frame_rate.den);
        let _ = writeln!(out, "  Frames: {}", video.frame_count);

        match &report.audio {
            Some(audio) => {
                let _ = writeln!(out, "Audio:");
                let _ = writeln!(out, "  Codec: {}", audio.codec);
                if let Some(secs) = audio.duration_secs {
                    let _ = writeln!(out, "  Duration: {:.3}s", secs);
                }
            }
            None => {
                let _ = writeln!(out, "Audio: none");
            }
        }

        if let Some(t) = &response.transform {
            let (w, h) = t.rendered_size();
            let _ = writeln!(out);
            let _ = writeln!(out, "Preview:");
            let _ = writeln!(out, "  Scale: {:.5}", t.scale);
            let _ = writeln!(out, "  Displayed: {}x{}", w, h);
            let _ = writeln!(out, "  Offset: ({:.1}, {:.1})", t.offset_x, t.offset_y);
        }

        out
    }
}
