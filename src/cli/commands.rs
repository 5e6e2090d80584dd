//! Command implementations

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use crate::app::{CropInteractor, CropOutcome, EditingSession, InspectInteractor, SessionConfig};
use crate::cli::args::{CropArgs, InspectArgs};
use crate::config::CropperConfig;
use crate::domain::model::{CropRect, Point, SelectionMode};
use crate::engine::progress::{ConsoleProgressCallback, JsonProgressCallback, NoOpProgressCallback, ProgressCallback};
use crate::selection::{PointerEvent, SelectionMessage, SelectionReply};
use crate::streams::AudioOutcome;
use crate::utils::format_duration;

/// Execute the inspect command
pub fn inspect(args: InspectArgs) -> Result<()> {
    info!("Starting inspect operation");

    let canvas = args.canvas.map(|c| (c.width, c.height));
    let response = InspectInteractor::execute(&args.input, canvas)
        .with_context(|| format!("Failed to inspect {}", args.input.display()))?;

    if args.json {
        println!("{}", InspectInteractor::format_as_json(&response)?);
    } else {
        print!("{}", InspectInteractor::format_as_text(&response));
    }

    info!("Inspect operation completed successfully");
    Ok(())
}

/// Execute the crop command
pub fn crop(args: CropArgs, config: &CropperConfig) -> Result<()> {
    info!("Starting crop operation");
    info!("Input: {}", args.input.display());

    let mode = SelectionMode::parse(&args.mode)?;
    let mut session = EditingSession::new(SessionConfig {
        mode,
        overwrite: config.output.overwrite,
        ..SessionConfig::default()
    });

    session
        .open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    if let Some(dir) = &args.output_dir {
        session.set_output_dir(dir.clone());
    }

    let reply = select(&mut session, &args)?;
    if let Some(warning) = &reply.warning {
        warn!("{}", warning);
    }
    info!("{}", reply.status);

    let request = session.job_request(
        args.width.as_deref().unwrap_or_default(),
        args.height.as_deref().unwrap_or_default(),
    );

    let callback: Arc<dyn ProgressCallback> = if args.quiet {
        Arc::new(NoOpProgressCallback)
    } else if args.json {
        Arc::new(JsonProgressCallback)
    } else {
        Arc::new(ConsoleProgressCallback::new(true))
    };

    let interactor = CropInteractor::from_config(config).with_progress_callback(callback);
    let outcome = interactor.execute(&request).context("Crop failed")?;

    for warning in &outcome.warnings {
        warn!("{}", warning);
    }

    if args.json {
        let report = serde_json::json!({
            "outcome": outcome,
            "finished_at": chrono::Utc::now().to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&report).context("Failed to serialize outcome")?);
    } else {
        display_outcome(&outcome);
    }

    info!("Crop operation completed successfully");
    Ok(())
}

/// Drive the selection engine from `--rect` (source pixels) or `--drag` (canvas pixels)
fn select(session: &mut EditingSession, args: &CropArgs) -> Result<SelectionReply> {
    if let Some(text) = &args.rect {
        let meta = session.meta().ok_or_else(|| anyhow!("No input video is open"))?;
        let rect = CropRect::parse(text, meta.width, meta.height)?;
        session.send(SelectionMessage::Start(point(rect.x1(), rect.y1())))?;
        let reply = session.send(SelectionMessage::Commit(point(rect.x2(), rect.y2())))?;
        if let Some(warning) = adjusted_rect_warning(&rect, reply.rect.as_ref()) {
            warn!("{}", warning);
        }
        return Ok(reply);
    }

    let (Some(drag), Some(canvas)) = (args.drag, args.canvas) else {
        return Err(anyhow!("Either --rect or --drag with --canvas is required"));
    };

    session.show_preview(canvas.width, canvas.height)?;
    if session.pointer(PointerEvent::Press(drag.from))?.is_none() {
        return Err(anyhow!(
            "Drag starts at {} which is outside the displayed image",
            drag.from
        ));
    }
    session.pointer(PointerEvent::Drag(drag.to))?;
    let reply = session
        .pointer(PointerEvent::Release(drag.to))?
        .ok_or_else(|| anyhow!("Drag release was not delivered"))?;
    if let Some((from, to)) = session.overlay() {
        debug!("Selection overlay on canvas: {} -> {}", from, to);
    }
    Ok(reply)
}

/// Warning when the committed rectangle is not the one given with `--rect`,
/// e.g. square mode shrinking a non-square rectangle
fn adjusted_rect_warning(requested: &CropRect, committed: Option<&CropRect>) -> Option<String> {
    match committed {
        Some(committed) if committed == requested => None,
        Some(committed) => Some(format!(
            "Selection {} was adjusted to {} for the current mode",
            requested, committed
        )),
        None => Some(format!("Selection {} was not accepted", requested)),
    }
}

fn point(x: u32, y: u32) -> Point {
    Point::new(x as f64, y as f64)
}

/// Display the job outcome in human-readable format
fn display_outcome(outcome: &CropOutcome) {
    println!("Crop Result");
    println!("===========");
    println!("Output: {}", outcome.final_path.display());
    println!("Size: {}x{}", outcome.output_size.0, outcome.output_size.1);
    println!("Frames: {} read, {} written", outcome.frames_read, outcome.frames_written);
    match &outcome.audio {
        AudioOutcome::Muxed { drift } => println!("Audio: reattached (drift {:.1} ms)", drift.drift_ms),
        AudioOutcome::NoAudioTrack => println!("Audio: none in source"),
        AudioOutcome::Fallback { reason } => println!("Audio: not added ({})", reason),
    }
    println!("Elapsed: {}", format_duration(outcome.elapsed));
}
