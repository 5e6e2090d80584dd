//! Frame progress reporting

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Receives advisory progress from the frame loop
pub trait ProgressCallback: Send + Sync {
    /// Called once before the first frame
    fn on_start(&self, operation: &str, total_frames: Option<u64>);

    /// Called every reporting interval with the frames processed so far
    fn on_progress(&self, update: &ProgressUpdate);

    /// Called when the frame loop finishes
    fn on_complete(&self, frames: u64, elapsed: Duration);

    /// Called when the job fails
    fn on_error(&self, error: &str);
}

/// One progress sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Frames processed so far; never decreases within a job
    pub frames: u64,
    /// Frame count reported by the container, if known
    pub total: Option<u64>,
    /// Percentage, capped at 100 since the container count is an estimate
    pub percent: Option<f64>,
    /// Frames per second since the start
    pub throughput: Option<f64>,
}

/// Throttles frame counts to a coarse interval and fans them out to callbacks
pub struct ProgressTracker {
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    interval: u64,
    total: Option<u64>,
    last_reported: u64,
    started: Instant,
}

impl ProgressTracker {
    /// Report every `interval` frames; an interval of zero is treated as one
    pub fn new(interval: u64) -> Self {
        Self {
            callbacks: Vec::new(),
            interval: interval.max(1),
            total: None,
            last_reported: 0,
            started: Instant::now(),
        }
    }

    /// Add a progress callback
    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    /// Builder form of [`ProgressTracker::add_callback`]
    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.add_callback(callback);
        self
    }

    pub fn start(&mut self, operation: &str, total: Option<u64>) {
        self.total = total.filter(|t| *t > 0);
        self.last_reported = 0;
        self.started = Instant::now();
        for cb in &self.callbacks {
            cb.on_start(operation, self.total);
        }
    }

    /// Record that `frames` frames are done; reports when an interval boundary is crossed
    pub fn frame_done(&mut self, frames: u64) {
        if frames < self.last_reported + self.interval {
            return;
        }
        self.last_reported = frames;

        let elapsed = self.started.elapsed().as_secs_f64();
        let update = ProgressUpdate {
            frames,
            total: self.total,
            percent: self
                .total
                .map(|total| (frames as f64 / total as f64 * 100.0).min(100.0)),
            throughput: (elapsed > 0.0).then(|| frames as f64 / elapsed),
        };

        debug!("Progress: {} frames", frames);
        for cb in &self.callbacks {
            cb.on_progress(&update);
        }
    }

    pub fn complete(&self, frames: u64) {
        let elapsed = self.started.elapsed();
        for cb in &self.callbacks {
            cb.on_complete(frames, elapsed);
        }
    }

    pub fn error(&self, error: &str) {
        for cb in &self.callbacks {
            cb.on_error(error);
        }
    }
}

/// Console progress callback for CLI usage
pub struct ConsoleProgressCallback {
    verbose: bool,
}

impl ConsoleProgressCallback {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_start(&self, operation: &str, total_frames: Option<u64>) {
        if self.verbose {
            eprintln!("Starting: {}", operation);
            if let Some(total) = total_frames {
                eprintln!("   Frames: {}", total);
            }
        }
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        match update.percent {
            Some(percent) => {
                let bar_length = 20;
                let filled = ((percent / 100.0) * bar_length as f64) as usize;
                let bar = "#".repeat(filled) + &"-".repeat(bar_length - filled.min(bar_length));
                eprint!("\r[{}] {:>5.1}% ({} frames)", bar, percent, update.frames);
            }
            None => eprint!("\rProcessed {} frames", update.frames),
        }
    }

    fn on_complete(&self, frames: u64, elapsed: Duration) {
        eprintln!("\rProcessed {} frames in {:.1}s", frames, elapsed.as_secs_f64());
    }

    fn on_error(&self, error: &str) {
        eprintln!();
        eprintln!("Error: {}", error);
    }
}

/// JSON progress callback for structured output
pub struct JsonProgressCallback;

impl ProgressCallback for JsonProgressCallback {
    fn on_start(&self, operation: &str, total_frames: Option<u64>) {
        let event = serde_json::json!({
            "event": "start",
            "operation": operation,
            "total_frames": total_frames,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        eprintln!("{}", event);
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        let event = serde_json::json!({
            "event": "progress",
            "frames": update.frames,
            "total": update.total,
            "percent": update.percent,
            "fps": update.throughput,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        eprintln!("{}", event);
    }

    fn on_complete(&self, frames: u64, elapsed: Duration) {
        let event = serde_json::json!({
            "event": "complete",
            "frames": frames,
            "elapsed_secs": elapsed.as_secs_f64(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        eprintln!("{}", event);
    }

    fn on_error(&self, error: &str) {
        let event = serde_json::json!({
            "event": "error",
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        eprintln!("{}", event);
    }
}

/// No-op progress callback for when progress tracking is disabled
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_start(&self, _operation: &str, _total_frames: Option<u64>) {}
    fn on_progress(&self, _update: &ProgressUpdate) {}
    fn on_complete(&self, _frames: u64, _elapsed: Duration) {}
    fn on_error(&self, _error: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallback {
        started: Mutex<Option<Option<u64>>>,
        frames: Mutex<Vec<u64>>,
        completed: Mutex<Option<u64>>,
        errors: Mutex<Vec<String>>,
    }

    impl ProgressCallback for RecordingCallback {
        fn on_start(&self, _operation: &str, total_frames: Option<u64>) {
            *self.started.lock().unwrap() = Some(total_frames);
        }

        fn on_progress(&self, update: &ProgressUpdate) {
            self.frames.lock().unwrap().push(update.frames);
        }

        fn on_complete(&self, frames: u64, _elapsed: Duration) {
            *self.completed.lock().unwrap() = Some(frames);
        }

        fn on_error(&self, error: &str) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    #[test]
    fn test_reports_at_coarse_interval() {
        let callback = Arc::new(RecordingCallback::default());
        let mut tracker = ProgressTracker::new(10).with_callback(callback.clone());

        tracker.start("crop", Some(35));
        for frame in 1..=35 {
            tracker.frame_done(frame);
        }
        tracker.complete(35);

        assert_eq!(*callback.started.lock().unwrap(), Some(Some(35)));
        assert_eq!(*callback.frames.lock().unwrap(), vec![10, 20, 30]);
        assert_eq!(*callback.completed.lock().unwrap(), Some(35));
    }

    #[test]
    fn test_percent_is_capped() {
        struct PercentCheck;
        impl ProgressCallback for PercentCheck {
            fn on_start(&self, _: &str, _: Option<u64>) {}
            fn on_progress(&self, update: &ProgressUpdate) {
                assert!(update.percent.unwrap() <= 100.0);
            }
            fn on_complete(&self, _: u64, _: Duration) {}
            fn on_error(&self, _: &str) {}
        }

        let mut tracker = ProgressTracker::new(1).with_callback(Arc::new(PercentCheck));
        // container under-reports the frame count
        tracker.start("crop", Some(5));
        for frame in 1..=8 {
            tracker.frame_done(frame);
        }
    }

    #[test]
    fn test_zero_interval_and_errors() {
        let callback = Arc::new(RecordingCallback::default());
        let mut tracker = ProgressTracker::new(0).with_callback(callback.clone());
        tracker.start("crop", None);
        tracker.frame_done(1);
        tracker.frame_done(2);
        tracker.error("decoder failed");

        assert_eq!(*callback.frames.lock().unwrap(), vec![1, 2]);
        assert_eq!(*callback.errors.lock().unwrap(), vec!["decoder failed".to_string()]);
    }
}
