//! Moving finished files into place

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::CropperResult;

/// Places a finished file at its final location
pub struct OutputWriter;

impl OutputWriter {
    /// Move `from` to `to`, copying when a rename is not possible
    /// (e.g. the scratch directory is on another filesystem).
    pub fn place(from: &Path, to: &Path) -> CropperResult<()> {
        Self::ensure_output_directory(to)?;

        if to.exists() {
            info!("File exists, will overwrite: {}", to.display());
            fs::remove_file(to)?;
        }

        match fs::rename(from, to) {
            Ok(()) => {
                debug!("Renamed {} -> {}", from.display(), to.display());
                Ok(())
            }
            Err(e) => {
                warn!("Rename failed ({}), copying instead", e);
                fs::copy(from, to)?;
                if let Err(e) = fs::remove_file(from) {
                    debug!("Could not remove {} after copy: {}", from.display(), e);
                }
                Ok(())
            }
        }
    }

    /// Remove a partially written file, ignoring a missing one
    pub fn discard(path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed partial output {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
        }
    }

    /// Ensure output directory exists
    fn ensure_output_directory(path: &Path) -> CropperResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
