//! Sequential crop → resize → encode loop producing the silent intermediate

use std::path::Path;
use std::time::Instant;

use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling;
use ffmpeg::util::frame::video::Video as VideoFrame;
use tracing::{debug, info, warn};

use crate::domain::model::{CropJob, CropRect};
use crate::engine::frame_ops::copy_region;
use crate::engine::progress::ProgressTracker;
use crate::engine::{EncoderSettings, PipelineReport};
use crate::error::{CropperError, CropperResult};
use crate::output::writer::OutputWriter;
use crate::planner::{CropPlan, CropPlanner, OutputPixelFormat};
use crate::probe;

/// Bytes per RGB24 pixel
const RGB24_BPP: usize = 3;

/// Frame-accurate crop pipeline.
///
/// Every decoded frame is converted to RGB24, the crop region is copied out,
/// and the region is converted (and, when planned, resized bilinearly) to the
/// encoder's YUV layout. Output frame `n` gets pts `n` at the source frame rate.
pub struct CropPipeline {
    settings: EncoderSettings,
}

impl CropPipeline {
    /// Create a pipeline with the given encoder settings
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Process every frame of the job's source into `destination`.
    ///
    /// Any read or write failure aborts the loop; the partial file is removed
    /// and every FFmpeg handle is released before the error is returned.
    pub fn run(
        &self,
        job: &CropJob,
        destination: &Path,
        progress: &mut ProgressTracker,
    ) -> CropperResult<PipelineReport> {
        let started = Instant::now();
        info!("Starting crop pipeline");
        info!("Input: {}", job.source_path.display());
        info!("Intermediate: {}", destination.display());
        info!(
            "Preset: {}, CRF: {}, threads: {}",
            self.settings.preset, self.settings.crf, self.settings.threads
        );

        self.settings.validate()?;

        match self.process(job, destination, progress) {
            Ok(report) => {
                info!(
                    "Crop pipeline completed: {} frames in {:.2}s",
                    report.frames_written,
                    started.elapsed().as_secs_f64()
                );
                Ok(report)
            }
            Err(e) => {
                warn!("Crop pipeline failed: {}", e);
                progress.error(&e.to_string());
                OutputWriter::discard(destination);
                Err(e)
            }
        }
    }

    /// Owns every FFmpeg context so they drop on any return path
    fn process(
        &self,
        job: &CropJob,
        destination: &Path,
        progress: &mut ProgressTracker,
    ) -> CropperResult<PipelineReport> {
        let source = job.source_path();

        let mut ictx = probe::open_input(source)?;
        let meta = probe::meta_from_input(&ictx, source)?;
        let plan = CropPlanner::plan(job, &meta)?;

        let video_index = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| CropperError::SourceOpenFailure {
                path: source.display().to_string(),
                message: "No video stream found in input file".to_string(),
            })?
            .index();

        let mut decoder = {
            let stream = ictx.stream(video_index).ok_or_else(|| CropperError::SourceOpenFailure {
                path: source.display().to_string(),
                message: format!("Video stream {} not found", video_index),
            })?;
            ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .and_then(|ctx| ctx.decoder().video())
                .map_err(|e| CropperError::SourceOpenFailure {
                    path: source.display().to_string(),
                    message: format!("Failed to create video decoder: {}", e),
                })?
        };

        let mut octx = ffmpeg::format::output_as(&destination, "mp4").map_err(|e| write_failure(0, "Failed to create output file", e))?;
        let mut sink = EncodeSink::open(&mut octx, &plan, &self.settings)?;

        if self.settings.faststart {
            let mut options = ffmpeg::Dictionary::new();
            options.set("movflags", "+faststart");
            octx.write_header_with(options)
                .map_err(|e| write_failure(0, "Failed to write output header", e))?;
        } else {
            octx.write_header()
                .map_err(|e| write_failure(0, "Failed to write output header", e))?;
        }
        sink.stream_time_base = octx
            .stream(sink.stream_index)
            .map(|s| s.time_base())
            .ok_or_else(|| CropperError::FrameWriteFailure {
                frame: 0,
                message: "Output video stream disappeared after header".to_string(),
            })?;

        let mut stage: Option<FrameStage> = None;
        let mut counters = Counters::default();

        progress.start("crop", Some(plan.expected_frames));
        info!("Starting frame loop");

        let mut packet = ffmpeg::Packet::empty();
        loop {
            match packet.read(&mut ictx) {
                Ok(()) => {}
                Err(ffmpeg::Error::Eof) => break,
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => continue,
                Err(e) => return Err(read_failure(counters.read, "Failed to read packet", e)),
            }

            if packet.stream() != video_index {
                continue;
            }

            decoder
                .send_packet(&packet)
                .map_err(|e| read_failure(counters.read, "Failed to send packet to decoder", e))?;

            Self::drain_decoder(&mut decoder, &mut stage, &plan, &mut sink, &mut octx, &mut counters, progress)?;
        }

        debug!("Source exhausted, flushing decoder");
        decoder
            .send_eof()
            .map_err(|e| read_failure(counters.read, "Failed to flush decoder", e))?;
        Self::drain_decoder(&mut decoder, &mut stage, &plan, &mut sink, &mut octx, &mut counters, progress)?;

        if counters.read == 0 {
            return Err(CropperError::FrameReadFailure {
                frame: 0,
                message: "Source contains no decodable video frames".to_string(),
            });
        }

        sink.finish(&mut octx, counters.written)?;
        octx.write_trailer()
            .map_err(|e| write_failure(counters.written, "Failed to write output trailer", e))?;

        progress.complete(counters.written);

        Ok(PipelineReport {
            output_path: destination.to_path_buf(),
            frames_read: counters.read,
            frames_written: counters.written,
            output_width: plan.output_width,
            output_height: plan.output_height,
            pixel_format: plan.pixel_format,
            duration_secs: counters.written as f64 * plan.frame_rate.frame_duration(),
        })
    }

    /// Pull every frame the decoder has ready and push it through to the muxer
    fn drain_decoder(
        decoder: &mut ffmpeg::decoder::Video,
        stage: &mut Option<FrameStage>,
        plan: &CropPlan,
        sink: &mut EncodeSink,
        octx: &mut ffmpeg::format::context::Output,
        counters: &mut Counters,
        progress: &mut ProgressTracker,
    ) -> CropperResult<()> {
        let mut decoded = VideoFrame::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            counters.read += 1;

            if stage.is_none() {
                *stage = Some(FrameStage::new(&decoded, plan).map_err(|e| CropperError::FrameReadFailure {
                    frame: counters.read,
                    message: e,
                })?);
            }
            let Some(frame_stage) = stage.as_mut() else {
                continue;
            };

            let mut output = frame_stage.process(&decoded).map_err(|e| CropperError::FrameReadFailure {
                frame: counters.read,
                message: e,
            })?;

            output.set_pts(Some(counters.written as i64));
            sink.encode(&output, octx, counters.written)?;
            counters.written += 1;

            progress.frame_done(counters.written);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Counters {
    read: u64,
    written: u64,
}

/// Converts decoded frames into encoder-ready frames
struct FrameStage {
    to_rgb: scaling::Context,
    rgb: VideoFrame,
    cropped: VideoFrame,
    to_output: scaling::Context,
    rect: CropRect,
    output_format: Pixel,
    output_width: u32,
    output_height: u32,
}

impl FrameStage {
    /// Build scalers from the first decoded frame's actual layout
    fn new(first: &VideoFrame, plan: &CropPlan) -> Result<Self, String> {
        let (width, height) = (first.width(), first.height());
        let rect = plan.rect;
        if rect.x2() > width || rect.y2() > height {
            return Err(format!(
                "decoded frame {}x{} is smaller than the selection {}",
                width, height, rect
            ));
        }

        let to_rgb = scaling::Context::get(
            first.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| format!("Failed to create RGB converter: {}", e))?;

        let output_format = pixel_format(plan.pixel_format);
        let to_output = scaling::Context::get(
            Pixel::RGB24,
            rect.width(),
            rect.height(),
            output_format,
            plan.output_width,
            plan.output_height,
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| format!("Failed to create output scaler: {}", e))?;

        debug!(
            "Frame stage: {:?} {}x{} -> RGB24 crop {}x{} -> {:?} {}x{}",
            first.format(),
            width,
            height,
            rect.width(),
            rect.height(),
            output_format,
            plan.output_width,
            plan.output_height
        );

        Ok(Self {
            to_rgb,
            rgb: VideoFrame::new(Pixel::RGB24, width, height),
            cropped: VideoFrame::new(Pixel::RGB24, rect.width(), rect.height()),
            to_output,
            rect,
            output_format,
            output_width: plan.output_width,
            output_height: plan.output_height,
        })
    }

    /// Crop and convert one frame.
    ///
    /// The returned frame is freshly allocated since the encoder may keep a
    /// reference to it after `send_frame`.
    fn process(&mut self, decoded: &VideoFrame) -> Result<VideoFrame, String> {
        self.to_rgb
            .run(decoded, &mut self.rgb)
            .map_err(|e| format!("Failed to convert frame to RGB: {}", e))?;

        let src_stride = self.rgb.stride(0);
        let dst_stride = self.cropped.stride(0);
        copy_region(
            self.rgb.data(0),
            src_stride,
            self.cropped.data_mut(0),
            dst_stride,
            &self.rect,
            RGB24_BPP,
        )?;

        let mut output = VideoFrame::new(self.output_format, self.output_width, self.output_height);
        self.to_output
            .run(&self.cropped, &mut output)
            .map_err(|e| format!("Failed to scale cropped frame: {}", e))?;
        Ok(output)
    }
}

/// Opened H.264 encoder plus the output stream it feeds
struct EncodeSink {
    encoder: ffmpeg::encoder::Video,
    stream_index: usize,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
}

impl EncodeSink {
    fn open(
        octx: &mut ffmpeg::format::context::Output,
        plan: &CropPlan,
        settings: &EncoderSettings,
    ) -> CropperResult<Self> {
        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::H264).ok_or_else(|| CropperError::FrameWriteFailure {
            frame: 0,
            message: "No H.264 encoder available in this FFmpeg build".to_string(),
        })?;

        let global_header = octx.format().flags().contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let mut stream = octx
            .add_stream(codec)
            .map_err(|e| write_failure(0, "Failed to add video stream", e))?;
        let stream_index = stream.index();

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| write_failure(0, "Failed to create video encoder", e))?;

        let rate = ffmpeg::Rational::new(plan.frame_rate.num, plan.frame_rate.den);
        let time_base = rate.invert();

        encoder.set_width(plan.output_width);
        encoder.set_height(plan.output_height);
        encoder.set_format(pixel_format(plan.pixel_format));
        encoder.set_frame_rate(Some(rate));
        encoder.set_time_base(time_base);
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }

        let mut options = ffmpeg::Dictionary::new();
        options.set("preset", &settings.preset);
        options.set("crf", &settings.crf.to_string());
        options.set("threads", &settings.threads.to_string());

        let encoder = encoder
            .open_with(options)
            .map_err(|e| write_failure(0, "Failed to open H.264 encoder", e))?;

        stream.set_parameters(&encoder);
        stream.set_time_base(time_base);

        info!(
            "Encoder: H.264 {}x{} {:?} @ {}/{} fps",
            plan.output_width, plan.output_height, plan.pixel_format, plan.frame_rate.num, plan.frame_rate.den
        );

        Ok(Self {
            encoder,
            stream_index,
            encoder_time_base: time_base,
            stream_time_base: time_base,
        })
    }

    fn encode(
        &mut self,
        frame: &VideoFrame,
        octx: &mut ffmpeg::format::context::Output,
        index: u64,
    ) -> CropperResult<()> {
        self.encoder
            .send_frame(frame)
            .map_err(|e| write_failure(index, "Failed to send frame to encoder", e))?;
        self.write_packets(octx, index)
    }

    fn finish(&mut self, octx: &mut ffmpeg::format::context::Output, frames: u64) -> CropperResult<()> {
        self.encoder
            .send_eof()
            .map_err(|e| write_failure(frames, "Failed to flush video encoder", e))?;
        self.write_packets(octx, frames)
    }

    fn write_packets(&mut self, octx: &mut ffmpeg::format::context::Output, index: u64) -> CropperResult<()> {
        let mut encoded = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.stream_index);
            encoded.rescale_ts(self.encoder_time_base, self.stream_time_base);
            encoded
                .write_interleaved(octx)
                .map_err(|e| write_failure(index, "Failed to write encoded packet", e))?;
        }
        Ok(())
    }
}

fn pixel_format(format: OutputPixelFormat) -> Pixel {
    match format {
        OutputPixelFormat::Yuv420p => Pixel::YUV420P,
        OutputPixelFormat::Yuv444p => Pixel::YUV444P,
    }
}

fn read_failure(frame: u64, context: &str, e: ffmpeg::Error) -> CropperError {
    CropperError::FrameReadFailure {
        frame,
        message: format!("{}: {}", context, e),
    }
}

fn write_failure(frame: u64, context: &str, e: ffmpeg::Error) -> CropperError {
    CropperError::FrameWriteFailure {
        frame,
        message: format!("{}: {}", context, e),
    }
}
