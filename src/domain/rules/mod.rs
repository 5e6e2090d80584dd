// Domain rules - Job validation before any media I/O

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::domain::model::*;
use crate::error::{CropperError, CropperResult};
use crate::output;
use crate::planner::TargetSizeResolver;

/// Every problem found while checking a job request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub problems: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, problem: impl Into<String>) {
        self.problems.push(problem.into());
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    /// Ok when nothing was recorded, otherwise the whole report as one error
    pub fn into_result(self) -> CropperResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CropperError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Input validation failed ({} problem", self.problems.len())?;
        if self.problems.len() != 1 {
            write!(f, "s")?;
        }
        write!(f, ")")?;
        for problem in &self.problems {
            write!(f, "\n  - {}", problem)?;
        }
        Ok(())
    }
}

/// Raw job inputs as the caller collected them
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    pub source_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub rect: Option<CropRect>,
    pub mode: SelectionMode,
    /// Width field text; empty means unset
    pub width: String,
    /// Height field text; empty means unset
    pub height: String,
    pub overwrite: OverwritePolicy,
}

/// Turns a [`JobRequest`] into a [`CropJob`] or a combined report
pub struct JobValidator;

impl JobValidator {
    /// Check every precondition and collect all failures
    pub fn validate(request: &JobRequest) -> CropperResult<CropJob> {
        let mut report = ValidationReport::new();

        let source = match request.source_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            None => {
                report.push("No input video selected");
                None
            }
            Some(path) if !path.is_file() => {
                report.push(format!("Input video does not exist: {}", path.display()));
                None
            }
            Some(path) => Some(path.clone()),
        };

        let output_dir = match request.output_dir.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            None => {
                report.push("No output directory selected");
                None
            }
            Some(dir) if !dir.is_dir() => {
                report.push(format!("Output directory does not exist: {}", dir.display()));
                None
            }
            Some(dir) => Some(dir.clone()),
        };

        match request.rect {
            None => report.push("No crop region selected; draw a selection first"),
            Some(rect) if rect.width() == 0 || rect.height() == 0 => {
                report.push(format!("Crop region {} has no area", rect))
            }
            Some(_) => {}
        }

        let width = Self::check_dimension(&mut report, "width", &request.width);
        let height = Self::check_dimension(&mut report, "height", &request.height);

        if let (Some(source), Some(dir)) = (&source, &output_dir) {
            if let Err(e) = output::resolve_output_path(source, dir, request.overwrite) {
                report.push(e.to_string());
            }
        }

        if !report.is_empty() {
            debug!("Job request rejected with {} problem(s)", report.len());
            return Err(CropperError::Validation(report));
        }

        match (source, output_dir, request.rect, width, height) {
            (Some(source), Some(output_dir), Some(rect), Some(width), Some(height)) => {
                let target = TargetSizeResolver::resolve_values(width, height, request.mode, Some(&rect));
                Ok(CropJob::new(source, rect, target, output_dir, request.overwrite))
            }
            _ => Err(CropperError::InvalidSelection {
                reason: "incomplete job request".to_string(),
            }),
        }
    }

    /// `Some(parsed)` when the field is usable, recording the problem otherwise
    fn check_dimension(report: &mut ValidationReport, dimension: &str, raw: &str) -> Option<Option<u32>> {
        match TargetSizeResolver::parse_dimension(dimension, raw) {
            Ok(value) => Some(value),
            Err(e) => {
                report.push(e.to_string());
                None
            }
        }
    }
}
