// Crop interactor - runs one validated job from selection to deliverable

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::config::CropperConfig;
use crate::domain::model::CropJob;
use crate::domain::rules::{JobRequest, JobValidator};
use crate::engine::progress::{ProgressCallback, ProgressTracker};
use crate::engine::CropPipeline;
use crate::error::CropperResult;
use crate::output::workspace::JobWorkspace;
use crate::streams::{AudioOutcome, AudioReattacher, FfmpegMuxer, MediaMuxer};

/// Result of a finished job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropOutcome {
    /// The deliverable; the silent intermediate when audio could not be merged
    pub final_path: PathBuf,
    pub frames_read: u64,
    pub frames_written: u64,
    pub output_size: (u32, u32),
    pub audio: AudioOutcome,
    pub warnings: Vec<String>,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

/// Interactor for the crop use case
pub struct CropInteractor<M: MediaMuxer = FfmpegMuxer> {
    pipeline: CropPipeline,
    reattacher: AudioReattacher<M>,
    progress_interval: u64,
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    scratch_root: Option<PathBuf>,
}

impl CropInteractor<FfmpegMuxer> {
    /// Interactor wired to libav for both the pipeline and the mux
    pub fn from_config(config: &CropperConfig) -> Self {
        let reattacher = AudioReattacher::with_ffmpeg(config.output.faststart)
            .with_drift_warning_ms(config.audio.drift_warning_ms);
        Self::new(CropPipeline::new(config.encoder_settings()), reattacher)
            .with_progress_interval(config.progress.interval)
    }
}

impl<M: MediaMuxer> CropInteractor<M> {
    pub fn new(pipeline: CropPipeline, reattacher: AudioReattacher<M>) -> Self {
        Self {
            pipeline,
            reattacher,
            progress_interval: 10,
            callbacks: Vec::new(),
            scratch_root: None,
        }
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// Create job workspaces under `root` instead of the system temp directory
    pub fn with_scratch_root(mut self, root: PathBuf) -> Self {
        self.scratch_root = Some(root);
        self
    }

    /// Validate the raw request, then run it
    pub fn execute(&self, request: &JobRequest) -> CropperResult<CropOutcome> {
        let job = JobValidator::validate(request)?;
        self.run_job(&job)
    }

    /// Run a validated job: crop into a fresh workspace, then reattach audio.
    ///
    /// The workspace is removed on every exit path except an audio fallback,
    /// where the intermediate inside it is the deliverable.
    pub fn run_job(&self, job: &CropJob) -> CropperResult<CropOutcome> {
        let span = info_span!(
            "crop_job",
            source = %job.source_path.display(),
            rect = %job.rect,
            target = %job.target
        );
        let _enter = span.enter();
        let started = Instant::now();

        let workspace = match &self.scratch_root {
            Some(root) => JobWorkspace::new_in(root)?,
            None => JobWorkspace::new()?,
        };
        let intermediate = workspace.intermediate_path();

        let mut tracker = ProgressTracker::new(self.progress_interval);
        for callback in &self.callbacks {
            tracker.add_callback(callback.clone());
        }

        let report = self.pipeline.run(job, &intermediate, &mut tracker)?;

        let reattachment = self
            .reattacher
            .run(&job.source_path, &intermediate, &job.output_dir, job.overwrite)?;

        if reattachment.kept_intermediate() {
            let kept = workspace.keep();
            warn!("Silent video kept in {}", kept.display());
        } else {
            drop(workspace);
        }

        let elapsed = started.elapsed();
        info!(
            "Job finished in {:.2}s: {}",
            elapsed.as_secs_f64(),
            reattachment.final_path.display()
        );

        Ok(CropOutcome {
            final_path: reattachment.final_path,
            frames_read: report.frames_read,
            frames_written: report.frames_written,
            output_size: (report.output_width, report.output_height),
            audio: reattachment.audio,
            warnings: reattachment.warnings,
            elapsed,
        })
    }
}
