//! Source soundtrack to AAC: decode, resample to stereo float planar, encode,
//! and stop at an exact sample count so the audio ends with the video.

use ffmpeg_next as ffmpeg;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::Sample;
use ffmpeg::software::resampling;
use ffmpeg::util::frame::audio::Audio as AudioFrame;
use ffmpeg::ChannelLayout;
use tracing::{debug, info};

use crate::error::{CropperError, CropperResult};

/// Sample rates the native AAC encoder accepts
const AAC_SAMPLE_RATES: &[u32] = &[
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025, 8_000, 7_350,
];

const FALLBACK_SAMPLE_RATE: u32 = 48_000;

/// Used when the encoder reports a variable frame size
const DEFAULT_FRAME_SIZE: usize = 1024;

const AAC_BIT_RATE: usize = 192_000;

const ENCODER_FORMAT: Sample = Sample::F32(SampleType::Planar);

/// Samples pulled out of the resampler in one flush call
const FLUSH_SAMPLES: usize = 4096;

/// Output rate for a source sampled at `source_rate`
pub fn encoder_rate(source_rate: u32) -> u32 {
    if AAC_SAMPLE_RATES.contains(&source_rate) {
        source_rate
    } else {
        FALLBACK_SAMPLE_RATE
    }
}

/// Number of samples at `rate` that fit in `secs` of video
pub fn sample_budget(secs: f64, rate: u32) -> u64 {
    if secs <= 0.0 {
        return 0;
    }
    (secs * f64::from(rate)).round() as u64
}

/// Stereo sample queue between the resampler and the fixed-size encoder frames
#[derive(Debug, Default)]
pub struct SampleFifo {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl SampleFifo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Append at most `max` samples per channel; returns how many were taken
    pub fn push(&mut self, left: &[f32], right: &[f32], max: usize) -> usize {
        let taken = left.len().min(right.len()).min(max);
        self.left.extend_from_slice(&left[..taken]);
        self.right.extend_from_slice(&right[..taken]);
        taken
    }

    /// Remove up to `n` samples per channel from the front
    pub fn pop(&mut self, n: usize) -> (Vec<f32>, Vec<f32>) {
        let n = n.min(self.len());
        (self.left.drain(..n).collect(), self.right.drain(..n).collect())
    }
}

/// Audio decoder, resampler and AAC encoder feeding one output stream
pub struct AacTranscoder {
    decoder: ffmpeg::decoder::Audio,
    resampler: Option<resampling::Context>,
    resampling_rate: bool,
    encoder: ffmpeg::encoder::Audio,
    fifo: SampleFifo,
    frame_size: usize,
    rate: u32,
    budget: u64,
    queued: u64,
    next_pts: i64,
    packets: u64,
    trimmed: bool,
    stream_index: usize,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
}

impl AacTranscoder {
    /// Add an AAC stream to `octx` that will carry at most `max_secs` of audio
    /// decoded with `params`. Must be called before the header is written.
    pub fn open(
        octx: &mut ffmpeg::format::context::Output,
        params: ffmpeg::codec::Parameters,
        max_secs: f64,
    ) -> CropperResult<Self> {
        let decoder = ffmpeg::codec::context::Context::from_parameters(params)
            .and_then(|ctx| ctx.decoder().audio())
            .map_err(|e| merge_failure("Failed to create audio decoder", e))?;

        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::AAC).ok_or_else(|| CropperError::AudioMergeFailure {
            message: "No AAC encoder available in this FFmpeg build".to_string(),
        })?;

        let rate = encoder_rate(decoder.rate());
        let global_header = octx.format().flags().contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let mut stream = octx
            .add_stream(codec)
            .map_err(|e| merge_failure("Failed to add audio stream", e))?;
        let stream_index = stream.index();

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .audio()
            .map_err(|e| merge_failure("Failed to create AAC encoder", e))?;

        let time_base = ffmpeg::Rational::new(1, rate as i32);
        encoder.set_rate(rate as i32);
        encoder.set_channel_layout(ChannelLayout::STEREO);
        encoder.set_format(ENCODER_FORMAT);
        encoder.set_bit_rate(AAC_BIT_RATE);
        encoder.set_time_base(time_base);
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder
            .open_with(ffmpeg::Dictionary::new())
            .map_err(|e| merge_failure("Failed to open AAC encoder", e))?;

        stream.set_parameters(&encoder);
        stream.set_time_base(time_base);

        let frame_size = match encoder.frame_size() {
            0 => DEFAULT_FRAME_SIZE,
            size => size as usize,
        };
        let budget = sample_budget(max_secs, rate);

        info!(
            "Audio: {} Hz -> AAC stereo {} Hz, {} samples max ({:.3}s)",
            decoder.rate(),
            rate,
            budget,
            max_secs
        );

        Ok(Self {
            decoder,
            resampler: None,
            resampling_rate: false,
            encoder,
            fifo: SampleFifo::new(),
            frame_size,
            rate,
            budget,
            queued: 0,
            next_pts: 0,
            packets: 0,
            trimmed: false,
            stream_index,
            encoder_time_base: time_base,
            stream_time_base: time_base,
        })
    }

    /// Pick up the time base the muxer settled on when writing the header
    pub fn bind_stream(&mut self, octx: &ffmpeg::format::context::Output) -> CropperResult<()> {
        self.stream_time_base = octx
            .stream(self.stream_index)
            .map(|s| s.time_base())
            .ok_or_else(|| CropperError::AudioMergeFailure {
                message: "Output audio stream disappeared after header".to_string(),
            })?;
        Ok(())
    }

    /// True once the sample budget has been used up
    pub fn is_full(&self) -> bool {
        self.queued >= self.budget
    }

    /// Seconds of audio accepted so far
    pub fn queued_secs(&self) -> f64 {
        self.queued as f64 / f64::from(self.rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.rate
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Whether source audio was cut off at the budget
    pub fn trimmed(&self) -> bool {
        self.trimmed
    }

    /// Decode one source packet and encode every full frame that results
    pub fn send_packet(
        &mut self,
        packet: &ffmpeg::Packet,
        octx: &mut ffmpeg::format::context::Output,
    ) -> CropperResult<()> {
        if self.is_full() {
            return Ok(());
        }
        self.decoder
            .send_packet(packet)
            .map_err(|e| merge_failure("Failed to send packet to audio decoder", e))?;
        self.drain_decoder()?;
        self.encode_ready(octx, false)
    }

    /// Flush decoder, resampler and encoder once the source is exhausted or
    /// the budget is reached
    pub fn finish(&mut self, octx: &mut ffmpeg::format::context::Output) -> CropperResult<()> {
        if !self.is_full() {
            self.decoder
                .send_eof()
                .map_err(|e| merge_failure("Failed to flush audio decoder", e))?;
            self.drain_decoder()?;
            self.flush_resampler()?;
        }

        self.encode_ready(octx, true)?;
        self.encoder
            .send_eof()
            .map_err(|e| merge_failure("Failed to flush AAC encoder", e))?;
        self.write_packets(octx)?;

        debug!(
            "AAC stream: {} samples in {} packets{}",
            self.queued,
            self.packets,
            if self.trimmed { ", trimmed to video length" } else { "" }
        );
        Ok(())
    }

    fn drain_decoder(&mut self) -> CropperResult<()> {
        let mut decoded = AudioFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            if self.is_full() {
                self.trimmed = true;
                continue;
            }
            let layout = input_layout(&decoded);
            decoded.set_channel_layout(layout);

            // built from the first frame's actual layout
            if self.resampler.is_none() {
                let resampler = resampling::Context::get(
                    decoded.format(),
                    layout,
                    decoded.rate(),
                    ENCODER_FORMAT,
                    ChannelLayout::STEREO,
                    self.rate,
                )
                .map_err(|e| merge_failure("Failed to create audio resampler", e))?;
                debug!(
                    "Audio resampler: {:?} {} Hz -> {:?} {} Hz stereo",
                    decoded.format(),
                    decoded.rate(),
                    ENCODER_FORMAT,
                    self.rate
                );
                self.resampling_rate = decoded.rate() != self.rate;
                self.resampler = Some(resampler);
            }
            let Some(resampler) = self.resampler.as_mut() else {
                continue;
            };

            let mut converted = AudioFrame::empty();
            resampler
                .run(&decoded, &mut converted)
                .map_err(|e| merge_failure("Failed to resample audio", e))?;
            self.accept(&converted);
        }
        Ok(())
    }

    /// Drain samples still buffered inside a rate-converting resampler
    fn flush_resampler(&mut self) -> CropperResult<()> {
        if !self.resampling_rate {
            return Ok(());
        }
        loop {
            let Some(resampler) = self.resampler.as_mut() else {
                return Ok(());
            };
            let mut tail = AudioFrame::new(ENCODER_FORMAT, FLUSH_SAMPLES, ChannelLayout::STEREO);
            tail.set_rate(self.rate);
            resampler
                .flush(&mut tail)
                .map_err(|e| merge_failure("Failed to flush audio resampler", e))?;
            if tail.samples() == 0 || self.is_full() {
                return Ok(());
            }
            self.accept(&tail);
        }
    }

    /// Queue resampled samples up to the budget
    fn accept(&mut self, frame: &AudioFrame) {
        let samples = frame.samples();
        if samples == 0 {
            return;
        }
        let room = (self.budget - self.queued.min(self.budget)) as usize;
        let taken = self.fifo.push(frame.plane::<f32>(0), frame.plane::<f32>(1), room);
        self.queued += taken as u64;
        if taken < samples {
            self.trimmed = true;
        }
    }

    /// Encode full frames; with `flush`, also the short final frame
    fn encode_ready(&mut self, octx: &mut ffmpeg::format::context::Output, flush: bool) -> CropperResult<()> {
        while self.fifo.len() >= self.frame_size || (flush && !self.fifo.is_empty()) {
            let (left, right) = self.fifo.pop(self.frame_size);
            let samples = left.len();

            let mut frame = AudioFrame::new(ENCODER_FORMAT, samples, ChannelLayout::STEREO);
            frame.set_rate(self.rate);
            frame.set_pts(Some(self.next_pts));
            frame.plane_mut::<f32>(0)[..samples].copy_from_slice(&left);
            frame.plane_mut::<f32>(1)[..samples].copy_from_slice(&right);
            self.next_pts += samples as i64;

            self.encoder
                .send_frame(&frame)
                .map_err(|e| merge_failure("Failed to send frame to AAC encoder", e))?;
            self.write_packets(octx)?;
        }
        Ok(())
    }

    fn write_packets(&mut self, octx: &mut ffmpeg::format::context::Output) -> CropperResult<()> {
        let mut encoded = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.stream_index);
            encoded.rescale_ts(self.encoder_time_base, self.stream_time_base);
            encoded
                .write_interleaved(octx)
                .map_err(|e| merge_failure("Failed to write audio packet", e))?;
            self.packets += 1;
        }
        Ok(())
    }
}

/// Decoded frames may carry an unspecified channel order (common for PCM in
/// MOV); fall back to the default layout for their channel count.
fn input_layout(frame: &AudioFrame) -> ChannelLayout {
    let layout = frame.channel_layout();
    if layout.is_empty() {
        ChannelLayout::default(i32::from(frame.channels()))
    } else {
        layout
    }
}

fn merge_failure(context: &str, e: ffmpeg::Error) -> CropperError {
    CropperError::AudioMergeFailure {
        message: format!("{}: {}", context, e),
    }
}
