// Editing session - per-input selection state and remembered directories

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::{OverwritePolicy, Point, SelectionMode, SourceVideoMeta};
use crate::domain::rules::JobRequest;
use crate::error::{CropperError, CropperResult};
use crate::probe::MediaInspector;
use crate::selection::{DisplayTransform, PointerEvent, SelectionEngine, SelectionMessage, SelectionReply};

/// Mutable settings that outlive a single input file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: SelectionMode,
    pub last_input_dir: Option<PathBuf>,
    pub last_output_dir: Option<PathBuf>,
    pub overwrite: OverwritePolicy,
}

/// The source currently being edited
#[derive(Debug, Clone)]
struct LoadedSource {
    path: PathBuf,
    meta: SourceVideoMeta,
    transform: Option<DisplayTransform>,
    engine: SelectionEngine,
}

/// Selection state for one caller, replaced wholesale when a new input is opened
#[derive(Debug, Clone, Default)]
pub struct EditingSession {
    config: SessionConfig,
    source: Option<LoadedSource>,
}

impl EditingSession {
    pub fn new(config: SessionConfig) -> Self {
        Self { config, source: None }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Probe `path` and make it the current input
    pub fn open(&mut self, path: &Path) -> CropperResult<&SourceVideoMeta> {
        let meta = MediaInspector::inspect(path)?;
        Ok(self.open_source(path.to_path_buf(), meta))
    }

    /// Make an already-probed file the current input.
    ///
    /// Remembers its directory, defaults the output directory to it when none
    /// is set yet, and starts from an empty unlocked selection.
    pub fn open_source(&mut self, path: PathBuf, meta: SourceVideoMeta) -> &SourceVideoMeta {
        // a bare file name lives in the working directory
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if self.config.last_output_dir.is_none() {
            self.config.last_output_dir = Some(dir.clone());
        }
        self.config.last_input_dir = Some(dir);
        info!("Opened {} ({}x{})", path.display(), meta.width, meta.height);

        let engine = SelectionEngine::for_source(&meta);
        let loaded = self.source.insert(LoadedSource {
            path,
            meta,
            transform: None,
            engine,
        });
        &loaded.meta
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_ref().map(|s| s.path.as_path())
    }

    pub fn meta(&self) -> Option<&SourceVideoMeta> {
        self.source.as_ref().map(|s| &s.meta)
    }

    pub fn transform(&self) -> Option<&DisplayTransform> {
        self.source.as_ref().and_then(|s| s.transform.as_ref())
    }

    pub fn engine(&self) -> Option<&SelectionEngine> {
        self.source.as_ref().map(|s| &s.engine)
    }

    /// Fit the current input into a `canvas_width`x`canvas_height` preview
    pub fn show_preview(&mut self, canvas_width: u32, canvas_height: u32) -> CropperResult<DisplayTransform> {
        let source = self.loaded_mut()?;
        let transform = DisplayTransform::fit(source.meta.width, source.meta.height, canvas_width, canvas_height)?;
        debug!(
            "Preview {}x{}: scale {:.5}, offset ({:.1}, {:.1})",
            canvas_width, canvas_height, transform.scale, transform.offset_x, transform.offset_y
        );
        source.transform = Some(transform);
        Ok(transform)
    }

    /// Canvas corners of the committed rectangle, for drawing it over the preview
    pub fn overlay(&self) -> Option<(Point, Point)> {
        let source = self.source.as_ref()?;
        let rect = source.engine.committed()?;
        source.transform.map(|t| t.rect_to_display(&rect))
    }

    /// Mode used by the next drag and by target size resolution
    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.config.mode = mode;
    }

    pub fn set_overwrite(&mut self, policy: OverwritePolicy) {
        self.config.overwrite = policy;
    }

    pub fn set_output_dir(&mut self, dir: PathBuf) {
        self.config.last_output_dir = Some(dir);
    }

    /// Route a canvas pointer event through the preview transform.
    ///
    /// `None` when nothing was sent to the engine: no preview is shown, or a
    /// press landed outside the image.
    pub fn pointer(&mut self, event: PointerEvent) -> CropperResult<Option<SelectionReply>> {
        let mode = self.config.mode;
        let source = self.loaded_mut()?;
        let Some(transform) = source.transform else {
            return Err(CropperError::InvalidSelection {
                reason: "no preview is shown; nothing to select on".to_string(),
            });
        };
        Ok(transform
            .translate(event)
            .map(|message| source.engine.handle(message, mode)))
    }

    /// Send a message in source coordinates
    pub fn send(&mut self, message: SelectionMessage) -> CropperResult<SelectionReply> {
        let mode = self.config.mode;
        Ok(self.loaded_mut()?.engine.handle(message, mode))
    }

    /// Job inputs from the current session plus the raw size fields
    pub fn job_request(&self, width: &str, height: &str) -> JobRequest {
        JobRequest {
            source_path: self.source_path().map(Path::to_path_buf),
            output_dir: self.config.last_output_dir.clone(),
            rect: self.source.as_ref().and_then(|s| s.engine.committed()),
            mode: self.config.mode,
            width: width.to_string(),
            height: height.to_string(),
            overwrite: self.config.overwrite,
        }
    }

    /// End the session, keeping only the remembered settings
    pub fn close(self) -> SessionConfig {
        self.config
    }

    fn loaded_mut(&mut self) -> CropperResult<&mut LoadedSource> {
        self.source.as_mut().ok_or_else(|| CropperError::InvalidSelection {
            reason: "no input video is open".to_string(),
        })
    }
}

/// Initial directory for a file picker: the current path (its parent if it is
/// a file), then the last remembered directory, then the home directory.
pub fn suggest_dir(current: Option<&Path>, last: Option<&Path>) -> Option<PathBuf> {
    if let Some(current) = current.filter(|p| !p.as_os_str().is_empty()) {
        if current.is_dir() {
            return Some(current.to_path_buf());
        }
        if let Some(parent) = current.parent().filter(|p| p.is_dir()) {
            return Some(parent.to_path_buf());
        }
    }
    if let Some(last) = last.filter(|p| p.is_dir()) {
        return Some(last.to_path_buf());
    }
    dirs::home_dir()
}
