//! Selection state machine.
//!
//! The engine owns the in-progress or committed rectangle in source pixels and
//! is driven only by [`SelectionMessage`]s. Every message yields a
//! [`SelectionReply`] carrying the current rectangle, a size status line and an
//! optional user-facing warning.

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::model::{CropRect, Point, SelectionMode, SourceVideoMeta};

pub mod mapper;
pub mod square;

pub use mapper::{DisplayTransform, PointerEvent};

/// Sides below this many source pixels are flagged in the status line
pub const MIN_USEFUL_SIDE: u32 = 10;

/// Input to the selection engine, in source coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionMessage {
    Start(Point),
    Update(Point),
    Commit(Point),
    Reset,
    Lock,
    Unlock,
}

/// Where the engine is in a drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionState {
    Idle,
    Drawing { start: Point, current: Point },
    Committed { rect: CropRect },
}

/// Rectangle being dragged, already constrained by the mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LiveRect {
    pub min: Point,
    pub max: Point,
}

impl LiveRect {
    fn from_points(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Result of handling one message
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionReply {
    /// False when the message was rejected or had no effect
    pub accepted: bool,
    /// Committed rectangle, if any
    pub rect: Option<CropRect>,
    /// Rectangle being drawn, if a drag is in progress
    pub live: Option<LiveRect>,
    pub status: String,
    pub warning: Option<String>,
}

/// Selection state for one source video
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    width: u32,
    height: u32,
    state: SelectionState,
    locked: bool,
}

impl SelectionEngine {
    /// Create an idle, unlocked engine for a `width`x`height` source
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            state: SelectionState::Idle,
            locked: false,
        }
    }

    pub fn for_source(meta: &SourceVideoMeta) -> Self {
        Self::new(meta.width, meta.height)
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The committed rectangle, if any
    pub fn committed(&self) -> Option<CropRect> {
        match self.state {
            SelectionState::Committed { rect } => Some(rect),
            _ => None,
        }
    }

    /// Apply one message under the given mode
    pub fn handle(&mut self, message: SelectionMessage, mode: SelectionMode) -> SelectionReply {
        debug!("Selection message {:?} in state {:?}", message, self.state);

        match message {
            SelectionMessage::Reset => {
                self.state = SelectionState::Idle;
                self.locked = false;
                info!("Selection reset");
                self.reply(mode, true, None)
            }
            SelectionMessage::Lock => {
                self.locked = true;
                info!("Selection locked");
                self.reply(mode, true, None)
            }
            SelectionMessage::Unlock => {
                self.locked = false;
                info!("Selection unlocked");
                self.reply(mode, true, None)
            }
            _ if self.locked => self.reply(
                mode,
                false,
                Some("Selection is locked; unlock it before drawing".to_string()),
            ),
            SelectionMessage::Start(point) => self.start(point, mode),
            SelectionMessage::Update(point) => self.update(point, mode),
            SelectionMessage::Commit(point) => self.commit(point, mode),
        }
    }

    fn start(&mut self, point: Point, mode: SelectionMode) -> SelectionReply {
        match self.state {
            SelectionState::Idle => {
                let start = self.clamp(point);
                self.state = SelectionState::Drawing { start, current: start };
                self.reply(mode, true, None)
            }
            SelectionState::Drawing { .. } | SelectionState::Committed { .. } => self.reply(
                mode,
                false,
                Some("A selection already exists; reset it before drawing a new one".to_string()),
            ),
        }
    }

    fn update(&mut self, point: Point, mode: SelectionMode) -> SelectionReply {
        match self.state {
            SelectionState::Drawing { start, .. } => {
                self.state = SelectionState::Drawing {
                    start,
                    current: self.clamp(point),
                };
                self.reply(mode, true, None)
            }
            _ => self.reply(mode, false, None),
        }
    }

    fn commit(&mut self, point: Point, mode: SelectionMode) -> SelectionReply {
        let SelectionState::Drawing { start, .. } = self.state else {
            return self.reply(mode, false, None);
        };

        let current = self.clamp(point);
        let rect = match mode {
            SelectionMode::Free => self.free_rect(start, current),
            SelectionMode::Square => square::commit(start, current, self.width, self.height),
        };

        match rect {
            Some(rect) => {
                info!("Selection committed: {}", rect);
                self.state = SelectionState::Committed { rect };
                self.reply(mode, true, None)
            }
            None => {
                self.state = SelectionState::Idle;
                self.reply(
                    mode,
                    false,
                    Some("Selection has no area; drag out a larger region".to_string()),
                )
            }
        }
    }

    /// Per-axis min/max of the truncated corners
    fn free_rect(&self, start: Point, current: Point) -> Option<CropRect> {
        CropRect::from_corners(
            (start.x as u32, start.y as u32),
            (current.x as u32, current.y as u32),
            self.width,
            self.height,
        )
        .ok()
    }

    fn clamp(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(0.0, self.width as f64),
            point.y.clamp(0.0, self.height as f64),
        )
    }

    fn live_rect(&self, mode: SelectionMode) -> Option<LiveRect> {
        match self.state {
            SelectionState::Drawing { start, current } => {
                let end = match mode {
                    SelectionMode::Free => current,
                    SelectionMode::Square => square::constrain(start, current, self.width, self.height),
                };
                Some(LiveRect::from_points(start, end))
            }
            _ => None,
        }
    }

    fn reply(&self, mode: SelectionMode, accepted: bool, warning: Option<String>) -> SelectionReply {
        let rect = self.committed();
        let live = self.live_rect(mode);

        let status = match (rect, live) {
            (Some(rect), _) => size_status(mode, rect.width(), rect.height(), self.width, self.height),
            (None, Some(live)) => size_status(
                mode,
                live.width() as u32,
                live.height() as u32,
                self.width,
                self.height,
            ),
            (None, None) => size_status(mode, 0, 0, self.width, self.height),
        };

        if let Some(ref warning) = warning {
            debug!("Selection warning: {}", warning);
        }

        SelectionReply {
            accepted,
            rect,
            live,
            status,
            warning,
        }
    }
}

/// Size line shown under the preview
pub fn size_status(mode: SelectionMode, width: u32, height: u32, source_width: u32, source_height: u32) -> String {
    if width == 0 || height == 0 {
        return "Size: none selected".to_string();
    }

    let mut status = match mode {
        SelectionMode::Square => format!("Side: {} px", width),
        SelectionMode::Free => format!("Width: {} px  Height: {} px", width, height),
    };

    if width < MIN_USEFUL_SIDE || height < MIN_USEFUL_SIDE {
        status.push_str(" (too small)");
    } else if width > source_width || height > source_height {
        status.push_str(" (out of range)");
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(engine: &mut SelectionEngine, mode: SelectionMode, from: (f64, f64), to: (f64, f64)) -> SelectionReply {
        engine.handle(SelectionMessage::Start(Point::new(from.0, from.1)), mode);
        engine.handle(SelectionMessage::Update(Point::new(to.0, to.1)), mode);
        engine.handle(SelectionMessage::Commit(Point::new(to.0, to.1)), mode)
    }

    #[test]
    fn test_free_drag_commits_ordered_rect() {
        let mut engine = SelectionEngine::new(1920, 1080);
        let reply = drag(&mut engine, SelectionMode::Free, (400.7, 300.2), (100.0, 50.0));

        assert!(reply.accepted);
        let rect = reply.rect.unwrap();
        assert_eq!((rect.x1(), rect.y1(), rect.x2(), rect.y2()), (100, 50, 400, 300));
        assert_eq!(reply.status, "Width: 300 px  Height: 250 px");
        assert_eq!(engine.committed(), Some(rect));
    }

    #[test]
    fn test_free_drag_clamped_to_source() {
        let mut engine = SelectionEngine::new(640, 480);
        let rect = drag(&mut engine, SelectionMode::Free, (600.0, 400.0), (5000.0, -20.0))
            .rect
            .unwrap();
        assert_eq!((rect.x1(), rect.y1(), rect.x2(), rect.y2()), (600, 0, 640, 400));
    }

    #[test]
    fn test_square_drag() {
        let mut engine = SelectionEngine::new(1920, 1080);
        let mode = SelectionMode::Square;
        engine.handle(SelectionMessage::Start(Point::new(100.0, 100.0)), mode);
        let live = engine.handle(SelectionMessage::Update(Point::new(400.0, 250.0)), mode);
        assert_eq!(live.status, "Side: 150 px");
        let live_rect = live.live.unwrap();
        assert_eq!(live_rect.max, Point::new(250.0, 250.0));

        let reply = engine.handle(SelectionMessage::Commit(Point::new(400.0, 250.0)), mode);
        let rect = reply.rect.unwrap();
        assert_eq!((rect.x1(), rect.y1(), rect.x2(), rect.y2()), (100, 100, 250, 250));
    }

    #[test]
    fn test_start_while_committed_warns() {
        let mut engine = SelectionEngine::new(640, 480);
        let rect = drag(&mut engine, SelectionMode::Free, (10.0, 10.0), (100.0, 100.0)).rect;

        let reply = engine.handle(SelectionMessage::Start(Point::new(200.0, 200.0)), SelectionMode::Free);
        assert!(!reply.accepted);
        assert!(reply.warning.unwrap().contains("reset"));
        assert_eq!(reply.rect, rect);
    }

    #[test]
    fn test_lock_rejects_pointer_input() {
        let mut engine = SelectionEngine::new(640, 480);
        let rect = drag(&mut engine, SelectionMode::Free, (10.0, 10.0), (100.0, 100.0)).rect;

        engine.handle(SelectionMessage::Lock, SelectionMode::Free);
        assert!(engine.is_locked());
        for message in [
            SelectionMessage::Start(Point::new(1.0, 1.0)),
            SelectionMessage::Update(Point::new(2.0, 2.0)),
            SelectionMessage::Commit(Point::new(3.0, 3.0)),
        ] {
            let reply = engine.handle(message, SelectionMode::Free);
            assert!(!reply.accepted);
            assert!(reply.warning.is_some());
            assert_eq!(reply.rect, rect);
        }

        engine.handle(SelectionMessage::Unlock, SelectionMode::Free);
        assert!(!engine.is_locked());
        assert_eq!(engine.committed(), rect);
    }

    #[test]
    fn test_reset_clears_rect_and_lock() {
        let mut engine = SelectionEngine::new(640, 480);
        drag(&mut engine, SelectionMode::Free, (10.0, 10.0), (100.0, 100.0));
        engine.handle(SelectionMessage::Lock, SelectionMode::Free);

        let reply = engine.handle(SelectionMessage::Reset, SelectionMode::Free);
        assert_eq!(reply.rect, None);
        assert_eq!(reply.status, "Size: none selected");
        assert_eq!(engine.state(), SelectionState::Idle);
        assert!(!engine.is_locked());

        assert!(drag(&mut engine, SelectionMode::Free, (5.0, 5.0), (50.0, 50.0)).accepted);
    }

    #[test]
    fn test_zero_area_commit_returns_to_idle() {
        let mut engine = SelectionEngine::new(640, 480);
        let reply = drag(&mut engine, SelectionMode::Free, (100.0, 100.0), (100.4, 300.0));
        assert!(!reply.accepted);
        assert_eq!(reply.rect, None);
        assert!(reply.warning.is_some());
        assert_eq!(engine.state(), SelectionState::Idle);
    }

    #[test]
    fn test_small_selection_still_commits() {
        let mut engine = SelectionEngine::new(640, 480);
        let reply = drag(&mut engine, SelectionMode::Free, (100.0, 100.0), (105.0, 140.0));
        assert!(reply.accepted);
        assert_eq!(reply.status, "Width: 5 px  Height: 40 px (too small)");
    }

    #[test]
    fn test_size_status_lines() {
        assert_eq!(size_status(SelectionMode::Free, 0, 10, 640, 480), "Size: none selected");
        assert_eq!(size_status(SelectionMode::Square, 9, 9, 640, 480), "Side: 9 px (too small)");
        assert_eq!(
            size_status(SelectionMode::Free, 700, 20, 640, 480),
            "Width: 700 px  Height: 20 px (out of range)"
        );
    }
}
