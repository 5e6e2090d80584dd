//! Per-job scratch directory

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::CropperResult;

/// File name of the silent intermediate inside the workspace
const INTERMEDIATE_NAME: &str = "intermediate.mp4";

/// Scratch directory owned by exactly one job.
///
/// Dropping it removes the directory and everything in it. [`JobWorkspace::keep`]
/// detaches the directory so the intermediate survives the job.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Create a fresh workspace under the system temp directory
    pub fn new() -> CropperResult<Self> {
        let dir = tempfile::Builder::new().prefix("cropper-job-").tempdir()?;
        debug!("Created job workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Create a fresh workspace under `parent`
    pub fn new_in(parent: &Path) -> CropperResult<Self> {
        let dir = tempfile::Builder::new().prefix("cropper-job-").tempdir_in(parent)?;
        debug!("Created job workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the pipeline writes the silent video
    pub fn intermediate_path(&self) -> PathBuf {
        self.dir.path().join(INTERMEDIATE_NAME)
    }

    /// Stop tracking the directory so it is not deleted; returns its path
    pub fn keep(self) -> PathBuf {
        let path = self.dir.into_path();
        info!("Keeping job workspace {}", path.display());
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_removed_on_drop() {
        let parent = TempDir::new().unwrap();
        let ws = JobWorkspace::new_in(parent.path()).unwrap();
        let path = ws.path().to_path_buf();
        std::fs::write(ws.intermediate_path(), b"frames").unwrap();
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn test_workspace_kept() {
        let parent = TempDir::new().unwrap();
        let ws = JobWorkspace::new_in(parent.path()).unwrap();
        let intermediate = ws.intermediate_path();
        std::fs::write(&intermediate, b"frames").unwrap();
        let kept = ws.keep();
        assert!(intermediate.exists());
        assert!(intermediate.starts_with(&kept));
    }
}
