//! Audio reattachment: the cropped video plus the source soundtrack as AAC

use std::path::Path;

use ffmpeg_next as ffmpeg;
use tracing::{debug, info, warn};

use crate::error::{CropperError, CropperResult};
use crate::output::writer::OutputWriter;
use crate::output::{self, OverwritePolicy};
use crate::streams::aac::AacTranscoder;
use crate::streams::{AudioOutcome, DriftReport, MediaMuxer, MuxReport, Reattachment};

/// Default drift above which a warning is raised
pub const DEFAULT_DRIFT_WARNING_MS: f64 = 100.0;

/// Produces the final deliverable from the intermediate and the source audio
pub struct AudioReattacher<M: MediaMuxer> {
    muxer: M,
    drift_warning_ms: f64,
}

impl AudioReattacher<FfmpegMuxer> {
    /// Reattacher backed by libavformat
    pub fn with_ffmpeg(faststart: bool) -> Self {
        Self::new(FfmpegMuxer::new(faststart))
    }
}

impl<M: MediaMuxer> AudioReattacher<M> {
    pub fn new(muxer: M) -> Self {
        Self {
            muxer,
            drift_warning_ms: DEFAULT_DRIFT_WARNING_MS,
        }
    }

    /// Set the drift that triggers a warning
    pub fn with_drift_warning_ms(mut self, threshold: f64) -> Self {
        self.drift_warning_ms = threshold.max(0.0);
        self
    }

    /// Produce `output_dir/cropped_<stem>.mp4`.
    ///
    /// A failed merge is not an error: the silent `intermediate` is returned as
    /// the deliverable and left in place. Only path resolution and the
    /// no-audio move can fail.
    pub fn run(
        &self,
        source: &Path,
        intermediate: &Path,
        output_dir: &Path,
        policy: OverwritePolicy,
    ) -> CropperResult<Reattachment> {
        let final_path = output::resolve_output_path(source, output_dir, policy)?;
        info!("Reattaching audio: {} -> {}", source.display(), final_path.display());

        let has_audio = match self.muxer.has_audio(source) {
            Ok(has_audio) => has_audio,
            Err(e) => return Ok(self.fallback(intermediate, e)),
        };

        if !has_audio {
            info!("Source has no audio track, moving video into place");
            OutputWriter::place(intermediate, &final_path)?;
            return Ok(Reattachment {
                final_path,
                audio: AudioOutcome::NoAudioTrack,
                warnings: Vec::new(),
            });
        }

        match self.muxer.mux(source, intermediate, &final_path) {
            Ok(report) => {
                let mut warnings = Vec::new();
                info!(
                    "Audio muxed ({} -> AAC {} Hz): video {:.3}s, audio {:.3}s, drift {:.1} ms{}",
                    report.source_codec,
                    report.sample_rate,
                    report.drift.video_secs,
                    report.drift.audio_secs,
                    report.drift.drift_ms,
                    if report.trimmed { ", trimmed" } else { "" }
                );
                if report.drift.exceeds(self.drift_warning_ms) {
                    let warning = format!(
                        "Audio and video durations differ by {:.0} ms (video {:.3}s, audio {:.3}s)",
                        report.drift.drift_ms, report.drift.video_secs, report.drift.audio_secs
                    );
                    warn!("{}", warning);
                    warnings.push(warning);
                }
                Ok(Reattachment {
                    final_path,
                    audio: AudioOutcome::Muxed { drift: report.drift },
                    warnings,
                })
            }
            Err(e) => {
                OutputWriter::discard(&final_path);
                Ok(self.fallback(intermediate, e))
            }
        }
    }

    fn fallback(&self, intermediate: &Path, error: CropperError) -> Reattachment {
        let reason = error.to_string();
        let warning = format!(
            "Audio could not be added ({}); the video without sound was kept at {}",
            reason,
            intermediate.display()
        );
        warn!("{}", warning);
        Reattachment {
            final_path: intermediate.to_path_buf(),
            audio: AudioOutcome::Fallback { reason },
            warnings: vec![warning],
        }
    }
}

/// libavformat-backed muxer: copies the processed video stream and transcodes
/// the source soundtrack to AAC
pub struct FfmpegMuxer {
    faststart: bool,
}

impl FfmpegMuxer {
    pub fn new(faststart: bool) -> Self {
        Self { faststart }
    }

    fn write(&self, source: &Path, video: &Path, output: &Path) -> CropperResult<MuxReport> {
        let mut video_in = open(video)?;
        let mut audio_in = open(source)?;

        let (video_index, video_tb, video_params, video_secs) = {
            let stream = video_in
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| merge_failure("processed video has no video stream".to_string()))?;
            let tb = stream.time_base();
            let secs = if stream.duration() > 0 {
                stream.duration() as f64 * f64::from(tb)
            } else {
                video_in.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64
            };
            (stream.index(), tb, stream.parameters(), secs)
        };

        let (audio_index, audio_params) = {
            let stream = audio_in
                .streams()
                .best(ffmpeg::media::Type::Audio)
                .ok_or_else(|| merge_failure("source has no audio stream".to_string()))?;
            (stream.index(), stream.parameters())
        };
        let source_codec = audio_params.id().name().to_string();

        let mut octx = ffmpeg::format::output_as(&output, "mp4")
            .map_err(|e| merge_failure(format!("Failed to create output file: {}", e)))?;

        {
            let mut stream = octx
                .add_stream(ffmpeg::encoder::find(ffmpeg::codec::Id::None))
                .map_err(|e| merge_failure(format!("Failed to add output stream: {}", e)))?;
            stream.set_parameters(video_params);
            // SAFETY: the stream was just created by this output context and its
            // codec parameters are valid for the lifetime of `stream`.
            unsafe {
                (*stream.parameters().as_mut_ptr()).codec_tag = 0;
            }
        }
        let mut aac = AacTranscoder::open(&mut octx, audio_params, video_secs)?;

        if self.faststart {
            let mut options = ffmpeg::Dictionary::new();
            options.set("movflags", "+faststart");
            octx.write_header_with(options)
        } else {
            octx.write_header()
        }
        .map_err(|e| merge_failure(format!("Failed to write output header: {}", e)))?;

        let out_video_tb = octx.stream(0).map(|s| s.time_base()).unwrap_or(video_tb);
        aac.bind_stream(&octx)?;

        debug!(
            "Merging {:.3}s of video with {} audio at {} Hz",
            video_secs,
            source_codec,
            aac.sample_rate()
        );

        let mut next_video = next_packet(&mut video_in, video_index)?;
        let mut audio_done = false;

        // Feed whichever stream is behind so the interleaver never buffers much
        loop {
            let audio_pending = !audio_done && !aac.is_full();
            match next_video.take() {
                Some(mut packet) if !audio_pending || packet_secs(&packet, video_tb) <= aac.queued_secs() => {
                    packet.set_stream(0);
                    packet.rescale_ts(video_tb, out_video_tb);
                    packet.set_position(-1);
                    packet
                        .write_interleaved(&mut octx)
                        .map_err(|e| merge_failure(format!("Failed to write video packet: {}", e)))?;
                    next_video = next_packet(&mut video_in, video_index)?;
                }
                pending => {
                    next_video = pending;
                    if !audio_pending {
                        break;
                    }
                    match next_packet(&mut audio_in, audio_index)? {
                        Some(packet) => aac.send_packet(&packet, &mut octx)?,
                        None => audio_done = true,
                    }
                }
            }
        }

        aac.finish(&mut octx)?;
        octx.write_trailer()
            .map_err(|e| merge_failure(format!("Failed to write output trailer: {}", e)))?;

        Ok(MuxReport {
            source_codec,
            sample_rate: aac.sample_rate(),
            audio_packets: aac.packets(),
            trimmed: aac.trimmed(),
            drift: DriftReport::new(video_secs, aac.queued_secs()),
        })
    }
}

impl MediaMuxer for FfmpegMuxer {
    fn has_audio(&self, source: &Path) -> CropperResult<bool> {
        let ictx = open(source)?;
        Ok(ictx.streams().best(ffmpeg::media::Type::Audio).is_some())
    }

    fn mux(&self, source: &Path, video: &Path, output: &Path) -> CropperResult<MuxReport> {
        self.write(source, video, output).map_err(|e| match e {
            merge @ CropperError::AudioMergeFailure { .. } => merge,
            other => merge_failure(other.to_string()),
        })
    }
}

fn open(path: &Path) -> CropperResult<ffmpeg::format::context::Input> {
    ffmpeg::format::input(&path).map_err(|e| merge_failure(format!("Failed to open {}: {}", path.display(), e)))
}

/// Next packet belonging to `stream_index`, or `None` at end of file
fn next_packet(ictx: &mut ffmpeg::format::context::Input, stream_index: usize) -> CropperResult<Option<ffmpeg::Packet>> {
    loop {
        let mut packet = ffmpeg::Packet::empty();
        match packet.read(ictx) {
            Ok(()) if packet.stream() == stream_index => return Ok(Some(packet)),
            Ok(()) => continue,
            Err(ffmpeg::Error::Eof) => return Ok(None),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => continue,
            Err(e) => return Err(merge_failure(format!("Failed to read packet: {}", e))),
        }
    }
}

/// Decode timestamp in seconds
fn packet_secs(packet: &ffmpeg::Packet, time_base: ffmpeg::Rational) -> f64 {
    let ts = packet.dts().or(packet.pts()).unwrap_or(0);
    ts as f64 * f64::from(time_base)
}

fn merge_failure(message: String) -> CropperError {
    CropperError::AudioMergeFailure { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Scripted muxer
    struct FakeMuxer {
        has_audio: bool,
        fail: bool,
        drift: DriftReport,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl FakeMuxer {
        fn new(has_audio: bool, fail: bool) -> Self {
            Self {
                has_audio,
                fail,
                drift: DriftReport::new(10.0, 9.99),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl MediaMuxer for FakeMuxer {
        fn has_audio(&self, _source: &Path) -> CropperResult<bool> {
            Ok(self.has_audio)
        }

        fn mux(&self, _source: &Path, _video: &Path, output: &Path) -> CropperResult<MuxReport> {
            self.calls.borrow_mut().push(output.to_path_buf());
            if self.fail {
                std::fs::write(output, b"half written").unwrap();
                return Err(merge_failure("muxer exploded".to_string()));
            }
            std::fs::write(output, b"muxed").unwrap();
            Ok(MuxReport {
                source_codec: "pcm_s16le".to_string(),
                sample_rate: 48_000,
                audio_packets: 470,
                trimmed: true,
                drift: self.drift,
            })
        }
    }

    fn setup() -> (TempDir, PathBuf, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("holiday.mov");
        let intermediate = dir.path().join("work").join("intermediate.mp4");
        let out = dir.path().join("out");
        std::fs::create_dir_all(intermediate.parent().unwrap()).unwrap();
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(&source, b"source").unwrap();
        std::fs::write(&intermediate, b"silent").unwrap();
        (dir, source, intermediate, out)
    }

    #[test]
    fn test_no_audio_moves_intermediate() {
        let (_dir, source, intermediate, out) = setup();
        let reattacher = AudioReattacher::new(FakeMuxer::new(false, false));

        let result = reattacher.run(&source, &intermediate, &out, OverwritePolicy::Always).unwrap();
        assert_eq!(result.final_path, out.join("cropped_holiday.mp4"));
        assert_eq!(result.audio, AudioOutcome::NoAudioTrack);
        assert_eq!(std::fs::read(&result.final_path).unwrap(), b"silent");
        assert!(!intermediate.exists());
        assert!(reattacher.muxer.calls.borrow().is_empty());
    }

    #[test]
    fn test_mux_failure_falls_back_to_intermediate() {
        let (_dir, source, intermediate, out) = setup();
        let reattacher = AudioReattacher::new(FakeMuxer::new(true, true));

        let result = reattacher.run(&source, &intermediate, &out, OverwritePolicy::Always).unwrap();
        assert_eq!(result.final_path, intermediate);
        assert!(result.kept_intermediate());
        assert!(intermediate.exists());
        assert!(!out.join("cropped_holiday.mp4").exists());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("muxer exploded"));
    }

    #[test]
    fn test_successful_mux_reports_drift() {
        let (_dir, source, intermediate, out) = setup();
        let reattacher = AudioReattacher::new(FakeMuxer::new(true, false)).with_drift_warning_ms(5.0);

        let result = reattacher.run(&source, &intermediate, &out, OverwritePolicy::Always).unwrap();
        assert_eq!(result.final_path, out.join("cropped_holiday.mp4"));
        match result.audio {
            AudioOutcome::Muxed { drift } => assert!((drift.drift_ms - 10.0).abs() < 1e-6),
            other => panic!("unexpected outcome {other:?}"),
        }
        // 10 ms drift is above the 5 ms threshold
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_never_policy_is_an_error() {
        let (_dir, source, intermediate, out) = setup();
        std::fs::write(out.join("cropped_holiday.mp4"), b"existing").unwrap();
        let reattacher = AudioReattacher::new(FakeMuxer::new(true, false));

        let err = reattacher
            .run(&source, &intermediate, &out, OverwritePolicy::Never)
            .unwrap_err();
        assert!(matches!(err, CropperError::OutputExists { .. }));
    }
}
