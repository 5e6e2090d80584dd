//! Output naming, placement and per-job scratch space

use std::path::{Path, PathBuf};

use crate::error::{CropperError, CropperResult};

pub use crate::domain::model::OverwritePolicy;

pub mod workspace;
pub mod writer;

/// Prefix given to every cropped deliverable
pub const OUTPUT_PREFIX: &str = "cropped_";

/// Container extension of every deliverable
pub const OUTPUT_EXTENSION: &str = "mp4";

/// `cropped_<stem>.mp4` for the given source
pub fn output_file_name(source: &Path) -> CropperResult<String> {
    let stem = source
        .file_stem()
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| CropperError::SourceOpenFailure {
            path: source.display().to_string(),
            message: "Invalid input file name".to_string(),
        })?;

    Ok(format!(
        "{}{}.{}",
        OUTPUT_PREFIX,
        stem.to_string_lossy(),
        OUTPUT_EXTENSION
    ))
}

/// Path the deliverable would take before the overwrite policy is applied
pub fn default_output_path(source: &Path, output_dir: &Path) -> CropperResult<PathBuf> {
    Ok(output_dir.join(output_file_name(source)?))
}

/// Resolve the deliverable path under the overwrite policy.
///
/// `Never` fails when the file exists, `Rename` picks the first free
/// `cropped_<stem> (n).mp4`.
pub fn resolve_output_path(source: &Path, output_dir: &Path, policy: OverwritePolicy) -> CropperResult<PathBuf> {
    let path = default_output_path(source, output_dir)?;
    if !path.exists() {
        return Ok(path);
    }

    match policy {
        OverwritePolicy::Always => Ok(path),
        OverwritePolicy::Never => Err(CropperError::OutputExists {
            path: path.display().to_string(),
        }),
        OverwritePolicy::Rename => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut n = 1u32;
            loop {
                let candidate = output_dir.join(format!("{} ({}).{}", stem, n, OUTPUT_EXTENSION));
                if !candidate.exists() {
                    return Ok(candidate);
                }
                n += 1;
            }
        }
    }
}
