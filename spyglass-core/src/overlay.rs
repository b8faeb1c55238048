//! Persistent highlight overlay.
//!
//! The desktop is shared with every other process, so a drawn outline does
//! not stay drawn: [`OverlayEngine`] runs a repaint loop that re-strokes the
//! current highlight about 30 times a second.  When the highlight moves or is
//! cleared, the loop asks the compositor to repaint the old area (slightly
//! enlarged to cover the stroke) so no stale outline is left behind.
//!
//! Callers only ever replace the desired state; they never draw.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::errors::SpyglassError;
use crate::geometry::{ColorId, Rectangle};
use crate::surface::DrawSurface;

pub const DEFAULT_BORDER_WIDTH: i32 = 3;
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_millis(100);

/// Pixels added to the stroke width when erasing an outline.
const ERASE_SLACK: i32 = 2;

/// What `stop()` does to the screen after the loop has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseOnStop {
    /// Invalidate the whole screen.
    FullScreen,
    /// Leave it to normal compositor refresh.
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayConfig {
    pub frame_interval: Duration,
    pub border_width: i32,
    pub failure_backoff: Duration,
    pub erase_on_stop: EraseOnStop,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            border_width: DEFAULT_BORDER_WIDTH,
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
            erase_on_stop: EraseOnStop::FullScreen,
        }
    }
}

impl OverlayConfig {
    pub fn erase_margin(&self) -> i32 {
        self.border_width + ERASE_SLACK
    }
}

/// Desired highlight: a rectangle (or none) and its color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlightState {
    pub rectangle: Option<Rectangle>,
    pub color: ColorId,
}

/// Single-slot latest-value cell.  Writers replace, the repaint loop copies
/// out; the lock is never held across drawing.
#[derive(Debug, Default)]
struct HighlightSlot(Mutex<HighlightState>);

impl HighlightSlot {
    fn replace(&self, state: HighlightState) {
        *self.0.lock() = state;
    }

    fn snapshot(&self) -> HighlightState {
        *self.0.lock()
    }
}

/// Sleep until `deadline`; no-op if it has already passed.
pub(crate) fn sleep_until(deadline: Instant) {
    if let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        thread::sleep(remaining);
    }
}

// ---------------------------------------------------------------------------
// Painter
// ---------------------------------------------------------------------------

/// Per-loop drawing state: what this loop last stroked on screen.
#[derive(Debug)]
pub(crate) struct Painter {
    border_width: i32,
    erase_margin: i32,
    last_drawn: Option<Rectangle>,
}

impl Painter {
    pub(crate) fn new(config: &OverlayConfig) -> Self {
        Self {
            border_width: config.border_width,
            erase_margin: config.erase_margin(),
            last_drawn: None,
        }
    }

    /// One repaint step against `state`.
    ///
    /// A failed erase of the previous outline does not prevent drawing the
    /// new one; the first error is returned after both were attempted.
    pub(crate) fn tick(
        &mut self,
        surface: &dyn DrawSurface,
        state: HighlightState,
    ) -> Result<(), SpyglassError> {
        match state.rectangle.filter(|r| !r.is_empty()) {
            Some(rect) => {
                let erased = match self.last_drawn {
                    Some(prev) if prev != rect => self.erase(surface, prev),
                    _ => Ok(()),
                };
                let drawn = surface.draw_outline(&rect, state.color, self.border_width);
                self.last_drawn = Some(rect);
                erased.and(drawn)
            }
            None => {
                if let Some(prev) = self.last_drawn {
                    self.erase(surface, prev)?;
                    self.last_drawn = None;
                }
                Ok(())
            }
        }
    }

    fn erase(&self, surface: &dyn DrawSurface, rect: Rectangle) -> Result<(), SpyglassError> {
        surface.invalidate(Some(rect.inflate(self.erase_margin)))
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct Shared {
    running: AtomicBool,
    slot: HighlightSlot,
}

/// Owns the repaint thread and the desired highlight.
///
/// All methods take `&self`; the engine can be shared between the command
/// thread and the tracker's hover thread.
pub struct OverlayEngine {
    config: OverlayConfig,
    surface: Arc<dyn DrawSurface>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl OverlayEngine {
    pub fn new(surface: Arc<dyn DrawSurface>, config: OverlayConfig) -> Self {
        Self {
            config,
            surface,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                slot: HighlightSlot::default(),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Launch the repaint loop.  Returns `false` if it was already running.
    pub fn start(&self) -> Result<bool, SpyglassError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(false);
        }

        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let surface = Arc::clone(&self.surface);
        let config = self.config;
        let spawned = thread::Builder::new()
            .name("spyglass-repaint".into())
            .spawn(move || repaint_loop(&shared, surface.as_ref(), &config));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                log::info!(
                    "overlay started (frame {:?}, border {}px)",
                    self.config.frame_interval,
                    self.config.border_width
                );
                Ok(true)
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Stop the loop, drop the highlight and apply the stop erase.
    pub fn stop(&self) {
        let mut worker = self.worker.lock();
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.slot.replace(HighlightState::default());

        let Some(handle) = worker.take() else {
            return;
        };
        if handle.join().is_err() {
            log::warn!("repaint thread panicked");
        }

        if self.config.erase_on_stop == EraseOnStop::FullScreen {
            if let Err(e) = self.surface.invalidate(None) {
                log::debug!("full-screen erase failed: {e}");
            }
        }
        log::info!("overlay stopped");
    }

    pub fn set_highlight(&self, rect: Rectangle, color: ColorId) {
        self.shared.slot.replace(HighlightState {
            rectangle: Some(rect),
            color,
        });
    }

    pub fn clear(&self) {
        self.shared.slot.replace(HighlightState::default());
    }

    pub fn highlight(&self) -> HighlightState {
        self.shared.slot.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

impl Drop for OverlayEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn repaint_loop(shared: &Shared, surface: &dyn DrawSurface, config: &OverlayConfig) {
    let mut painter = Painter::new(config);
    while shared.running.load(Ordering::SeqCst) {
        let tick_started = Instant::now();
        match painter.tick(surface, shared.slot.snapshot()) {
            Ok(()) => sleep_until(tick_started + config.frame_interval),
            Err(e) => {
                log::debug!("repaint failed: {e}");
                thread::sleep(config.failure_backoff);
            }
        }
    }
    log::debug!("repaint loop exiting");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
