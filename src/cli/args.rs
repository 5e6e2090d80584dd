//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::model::Point;

/// Preview canvas size given as `WxH`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// Parse `WxH` into a canvas size
pub fn parse_canvas(value: &str) -> Result<CanvasSize, String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", value))?;
    let width: u32 = w.trim().parse().map_err(|_| format!("invalid canvas width '{}'", w))?;
    let height: u32 = h.trim().parse().map_err(|_| format!("invalid canvas height '{}'", h))?;
    if width == 0 || height == 0 {
        return Err("canvas dimensions must be positive".to_string());
    }
    Ok(CanvasSize { width, height })
}

/// A drag gesture `x,y:x,y` in display pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGesture {
    pub from: Point,
    pub to: Point,
}

/// Parse `x,y:x,y` into a drag gesture
pub fn parse_drag(value: &str) -> Result<DragGesture, String> {
    let (from, to) = value
        .split_once(':')
        .ok_or_else(|| format!("expected x,y:x,y, got '{}'", value))?;
    Ok(DragGesture {
        from: Point::parse(from).map_err(|e| e.to_string())?,
        to: Point::parse(to).map_err(|e| e.to_string())?,
    })
}

fn crf_range(value: &str) -> Result<u8, String> {
    clap_num::number_range(value, 0, 51)
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Preview canvas size (WxH) to compute the display fit for
    #[arg(long, value_parser = parse_canvas)]
    pub canvas: Option<CanvasSize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the crop command
#[derive(Args, Debug)]
pub struct CropArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory (default: the input's directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Crop region in source pixels: x1,y1,x2,y2
    #[arg(long, conflicts_with = "drag", required_unless_present = "drag")]
    pub rect: Option<String>,

    /// Drag gesture in canvas pixels: x,y:x,y
    #[arg(long, value_parser = parse_drag, requires = "canvas")]
    pub drag: Option<DragGesture>,

    /// Preview canvas size (WxH) the drag was made on
    #[arg(long, value_parser = parse_canvas)]
    pub canvas: Option<CanvasSize>,

    /// Selection mode (free, square)
    #[arg(long, default_value = "free")]
    pub mode: String,

    /// Output width in pixels (empty keeps the native width)
    #[arg(long)]
    pub width: Option<String>,

    /// Output height in pixels (empty keeps the native height)
    #[arg(long)]
    pub height: Option<String>,

    /// What to do when the output file exists (always, never, rename)
    #[arg(long)]
    pub overwrite: Option<String>,

    /// Constant Rate Factor (0-51)
    #[arg(long, value_parser = crf_range)]
    pub crf: Option<u8>,

    /// Encoding preset
    #[arg(long)]
    pub preset: Option<String>,

    /// Encoder threads (0 = all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}
