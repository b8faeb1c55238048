//! Mouse-driven element tracking.
//!
//! [`TrackingEngine`] follows the pointer: a hover thread periodically
//! describes the element under the cursor and keeps the overlay on it, and
//! clicks reported by the global mouse hook are captured (with the element
//! under them) into a queue the controller drains on demand.
//!
//! # Threads
//!
//! | Thread | Work |
//! |--------|------|
//! | `spyglass-hover` | one `HoverTracker::poll` every `hover_interval` |
//! | `spyglass-input` | drains hook events, records clicks |
//! | `spyglass-repaint` | owned by the inner [`OverlayEngine`] |
//!
//! An optional target window restricts both hover and clicks to its
//! *current* rectangle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::element::{ElementDescription, ElementInspector};
use crate::errors::SpyglassError;
use crate::geometry::{ColorId, Rectangle};
use crate::hook::{MouseButton, MouseEvent, MouseHook};
use crate::overlay::{sleep_until, EraseOnStop, OverlayConfig, OverlayEngine};
use crate::protocol::{CapturedElement, JsonLineWriter, TrackingEvent};
use crate::surface::DrawSurface;
use crate::window::{point_in_window, WindowLocator};

pub const DEFAULT_HOVER_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_IDLE_REFRESH: Duration = Duration::from_millis(500);

/// Local time with microseconds, no offset.
pub fn timestamp_now() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingConfig {
    pub hover_interval: Duration,
    pub idle_refresh: Duration,
    pub failure_backoff: Duration,
    pub overlay: OverlayConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        let overlay = OverlayConfig {
            erase_on_stop: EraseOnStop::Nothing,
            ..OverlayConfig::default()
        };
        Self {
            hover_interval: DEFAULT_HOVER_INTERVAL,
            idle_refresh: DEFAULT_IDLE_REFRESH,
            failure_backoff: overlay.failure_backoff,
            overlay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickType {
    Left,
    Right,
}

impl From<MouseButton> for ClickType {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Right => ClickType::Right,
            MouseButton::Left | MouseButton::Middle => ClickType::Left,
        }
    }
}

/// A click recorded while tracking, waiting to be drained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingClick {
    pub x: i32,
    pub y: i32,
    pub click_type: ClickType,
    pub timestamp: String,
    pub element: Option<ElementDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStatus {
    pub is_tracking: bool,
    pub position: (i32, i32),
    pub pending_clicks: usize,
}

/// Platform collaborators of a [`TrackingEngine`].
pub struct TrackingBackends {
    pub surface: Arc<dyn DrawSurface>,
    pub inspector: Arc<dyn ElementInspector>,
    pub windows: Arc<dyn WindowLocator>,
    pub hook: Box<dyn MouseHook>,
}

#[derive(Debug, Default)]
struct TrackerState {
    position: (i32, i32),
    pending_clicks: Vec<PendingClick>,
    target: Option<isize>,
}

/// State shared between the command thread and the worker threads.
struct TrackerInner {
    config: TrackingConfig,
    running: AtomicBool,
    state: Mutex<TrackerState>,
    overlay: OverlayEngine,
    inspector: Arc<dyn ElementInspector>,
    windows: Arc<dyn WindowLocator>,
    events: Arc<JsonLineWriter>,
}

impl TrackerInner {
    fn emit(&self, event: &TrackingEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("failed to emit event: {e}");
        }
    }

    /// Element under `(x, y)`; query failures count as "nothing there".
    fn describe(&self, x: i32, y: i32) -> Option<ElementDescription> {
        match self.inspector.describe_element_at(x, y) {
            Ok(element) => element,
            Err(e) => {
                log::debug!("element query at ({x},{y}) failed: {e}");
                None
            }
        }
    }

    fn in_target(&self, target: Option<isize>, x: i32, y: i32) -> bool {
        match target {
            Some(handle) => point_in_window(self.windows.as_ref(), handle, x, y),
            None => true,
        }
    }

    fn handle_mouse_event(&self, event: MouseEvent) {
        match event {
            MouseEvent::Moved { x, y } => self.state.lock().position = (x, y),
            MouseEvent::Pressed { x, y, button } => self.record_click(x, y, button),
            MouseEvent::Released { .. } => {}
        }
    }

    fn record_click(&self, x: i32, y: i32, button: MouseButton) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        let target = self.state.lock().target;
        if !self.in_target(target, x, y) {
            log::debug!("click at ({x},{y}) outside target window");
            return;
        }

        let click = PendingClick {
            x,
            y,
            click_type: button.into(),
            timestamp: timestamp_now(),
            element: self.describe(x, y),
        };
        self.state.lock().pending_clicks.push(click.clone());
        self.emit(&TrackingEvent::Click(click));
    }
}

// ---------------------------------------------------------------------------
// Hover
// ---------------------------------------------------------------------------

/// Hover-loop state.  Owned by one loop run, so a restart forgets the
/// previously reported element.
#[derive(Debug, Default)]
struct HoverTracker {
    last_position: Option<(i32, i32)>,
    last_check: Option<Instant>,
    last_element: Option<ElementDescription>,
}

impl HoverTracker {
    fn is_due(&self, position: (i32, i32), now: Instant, idle_refresh: Duration) -> bool {
        if self.last_position != Some(position) {
            return true;
        }
        match self.last_check {
            Some(at) => now.saturating_duration_since(at) > idle_refresh,
            None => true,
        }
    }

    /// One hover step at time `now`.
    fn poll(&mut self, inner: &TrackerInner, now: Instant) -> Result<(), SpyglassError> {
        let (position, target) = {
            let state = inner.state.lock();
            (state.position, state.target)
        };
        if !self.is_due(position, now, inner.config.idle_refresh) {
            return Ok(());
        }

        let (x, y) = position;
        if !inner.in_target(target, x, y) {
            inner.overlay.clear();
        } else {
            match inner.describe(x, y) {
                Some(element) if !element.bounds.is_empty() => {
                    inner.overlay.set_highlight(
                        element.bounds,
                        ColorId::for_interactivity(element.is_interactive),
                    );
                    if self.last_element.as_ref() != Some(&element) {
                        self.last_element = Some(element.clone());
                        inner.events.send(&TrackingEvent::Hover { x, y, element })?;
                    }
                }
                _ => inner.overlay.clear(),
            }
        }

        self.last_position = Some(position);
        self.last_check = Some(now);
        Ok(())
    }
}

fn hover_loop(inner: &TrackerInner) {
    let mut tracker = HoverTracker::default();
    while inner.running.load(Ordering::SeqCst) {
        let tick_started = Instant::now();
        match tracker.poll(inner, tick_started) {
            Ok(()) => sleep_until(tick_started + inner.config.hover_interval),
            Err(e) => {
                log::debug!("hover update failed: {e}");
                thread::sleep(inner.config.failure_backoff);
            }
        }
    }
    log::debug!("hover loop exiting");
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Workers {
    hover: Option<JoinHandle<()>>,
    input: Option<JoinHandle<()>>,
}

/// Hover highlighting plus click capture, optionally scoped to one window.
pub struct TrackingEngine {
    inner: Arc<TrackerInner>,
    hook: Mutex<Box<dyn MouseHook>>,
    workers: Mutex<Workers>,
}

impl TrackingEngine {
    pub fn new(
        config: TrackingConfig,
        backends: TrackingBackends,
        events: Arc<JsonLineWriter>,
    ) -> Self {
        let TrackingBackends {
            surface,
            inspector,
            windows,
            hook,
        } = backends;
        Self {
            inner: Arc::new(TrackerInner {
                config,
                running: AtomicBool::new(false),
                state: Mutex::new(TrackerState::default()),
                overlay: OverlayEngine::new(surface, config.overlay),
                inspector,
                windows,
                events,
            }),
            hook: Mutex::new(hook),
            workers: Mutex::new(Workers::default()),
        }
    }

    /// Begin tracking, optionally restricted to the window `target`.
    ///
    /// Returns `Ok(false)` when already tracking.  A hook that cannot be
    /// installed leaves the engine stopped.
    pub fn start(&self, target: Option<isize>) -> Result<bool, SpyglassError> {
        let mut workers = self.workers.lock();
        if self.inner.running.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let target = target.filter(|&h| h != 0);
        {
            let mut state = self.inner.state.lock();
            state.target = target;
            state.pending_clicks.clear();
        }

        self.inner.overlay.start()?;

        let (tx, rx) = mpsc::channel::<MouseEvent>();
        if let Err(e) = self.hook.lock().install(tx) {
            self.inner.overlay.stop();
            return Err(e);
        }
        self.inner.running.store(true, Ordering::SeqCst);

        let spawned = self.spawn_input(rx).and_then(|input| {
            workers.input = Some(input);
            self.spawn_hover()
        });
        match spawned {
            Ok(hover) => workers.hover = Some(hover),
            Err(e) => {
                self.shutdown(&mut workers);
                return Err(e.into());
            }
        }

        log::info!("tracking started (target {target:?})");
        Ok(true)
    }

    fn spawn_input(&self, rx: mpsc::Receiver<MouseEvent>) -> std::io::Result<JoinHandle<()>> {
        let inner = Arc::clone(&self.inner);
        thread::Builder::new()
            .name("spyglass-input".into())
            .spawn(move || {
                // Ends when the hook drops its sender.
                for event in rx {
                    inner.handle_mouse_event(event);
                }
                log::debug!("input pump exiting");
            })
    }

    fn spawn_hover(&self) -> std::io::Result<JoinHandle<()>> {
        let inner = Arc::clone(&self.inner);
        thread::Builder::new()
            .name("spyglass-hover".into())
            .spawn(move || hover_loop(&inner))
    }

    /// Stop tracking.  Pending clicks stay queued until drained.
    pub fn stop(&self) {
        let mut workers = self.workers.lock();
        if self.shutdown(&mut workers) {
            log::info!("tracking stopped");
        }
    }

    /// Returns whether anything was running.
    fn shutdown(&self, workers: &mut Workers) -> bool {
        let was_running = self.inner.running.swap(false, Ordering::SeqCst);

        if let Err(e) = self.hook.lock().uninstall() {
            log::warn!("mouse hook teardown: {e}");
        }
        for handle in [workers.input.take(), workers.hover.take()].into_iter().flatten() {
            if handle.join().is_err() {
                log::warn!("tracking worker panicked");
            }
        }
        self.inner.overlay.stop();
        was_running
    }

    pub fn is_tracking(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Feed one input notification, as the hook's pump thread does.
    pub fn handle_mouse_event(&self, event: MouseEvent) {
        self.inner.handle_mouse_event(event);
    }

    /// Describe the element at `(x, y)` and report it as
    /// `element_captured` or `capture_failed`.
    pub fn capture_element_at(&self, x: i32, y: i32) -> Option<ElementDescription> {
        let element = self.inner.describe(x, y);
        match &element {
            Some(found) => self.inner.emit(&TrackingEvent::ElementCaptured {
                element: CapturedElement {
                    element: found.clone(),
                    captured_at: timestamp_now(),
                },
            }),
            None => self.inner.emit(&TrackingEvent::CaptureFailed { x, y }),
        }
        element
    }

    pub fn element_at(&self, x: i32, y: i32) -> Option<ElementDescription> {
        self.inner.describe(x, y)
    }

    /// Take every queued click, oldest first.
    pub fn drain_pending_clicks(&self) -> Vec<PendingClick> {
        std::mem::take(&mut self.inner.state.lock().pending_clicks)
    }

    pub fn set_highlight(&self, rect: Rectangle, interactive: bool) {
        self.inner
            .overlay
            .set_highlight(rect, ColorId::for_interactivity(interactive));
    }

    pub fn clear_highlight(&self) {
        self.inner.overlay.clear();
    }

    pub fn status(&self) -> TrackingStatus {
        let state = self.inner.state.lock();
        TrackingStatus {
            is_tracking: self.is_tracking(),
            position: state.position,
            pending_clicks: state.pending_clicks.len(),
        }
    }

    pub fn overlay(&self) -> &OverlayEngine {
        &self.inner.overlay
    }
}

impl Drop for TrackingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ScreenRect;
    use crate::overlay::HighlightState;
    use crate::testing::{
        element, wait_until, FakeWindows, MockHook, MockHookHandle, RecordingSurface,
        ScriptedInspector, SharedBuffer,
    };

    struct Rig {
        engine: TrackingEngine,
        inspector: Arc<ScriptedInspector>,
        windows: Arc<FakeWindows>,
        hook: MockHookHandle,
        out: SharedBuffer,
    }

    impl Rig {
        fn set_target(&self, target: Option<isize>) {
            self.engine.inner.state.lock().target = target;
        }
    }

    fn rig() -> Rig {
        let inspector = Arc::new(ScriptedInspector::default());
        let windows = Arc::new(FakeWindows::default());
        let (hook, handle) = MockHook::new();
        let out = SharedBuffer::default();
        let config = TrackingConfig {
            hover_interval: Duration::from_millis(5),
            overlay: OverlayConfig {
                frame_interval: Duration::from_millis(5),
                ..TrackingConfig::default().overlay
            },
            ..TrackingConfig::default()
        };
        let engine = TrackingEngine::new(
            config,
            TrackingBackends {
                surface: Arc::new(RecordingSurface::default()),
                inspector: inspector.clone(),
                windows: windows.clone(),
                hook: Box::new(hook),
            },
            Arc::new(JsonLineWriter::new(out.clone())),
        );
        Rig {
            engine,
            inspector,
            windows,
            hook: handle,
            out,
        }
    }

    fn events_named(out: &SharedBuffer, name: &str) -> Vec<serde_json::Value> {
        out.messages()
            .into_iter()
            .filter(|m| m["event"] == name)
            .collect()
    }

    fn button_at(bounds: Rectangle) -> ElementDescription {
        element("OK", "Button", bounds)
    }

    #[test]
    fn test_middle_button_counts_as_left() {
        assert_eq!(ClickType::from(MouseButton::Middle), ClickType::Left);
        assert_eq!(ClickType::from(MouseButton::Right), ClickType::Right);
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp_now();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, "%Y-%m-%dT%H:%M:%S%.6f").is_ok());
        assert_eq!(ts.rsplit('.').next().map(str::len), Some(6));
    }

    #[test]
    fn test_hover_reports_each_element_once() {
        let r = rig();
        let bounds = Rectangle::new(10, 10, 80, 20);
        r.inspector.set(Some(button_at(bounds)));
        let mut hover = HoverTracker::default();
        let t0 = Instant::now();

        r.engine.handle_mouse_event(MouseEvent::Moved { x: 20, y: 15 });
        hover.poll(&r.engine.inner, t0).unwrap();
        r.engine.handle_mouse_event(MouseEvent::Moved { x: 21, y: 15 });
        hover.poll(&r.engine.inner, t0 + Duration::from_millis(50)).unwrap();

        assert_eq!(r.inspector.calls(), 2);
        let hovers = events_named(&r.out, "hover");
        assert_eq!(hovers.len(), 1);
        assert_eq!(hovers[0]["x"], 20);
        assert_eq!(hovers[0]["element"]["type"], "button");
        assert_eq!(
            r.engine.overlay().highlight(),
            HighlightState {
                rectangle: Some(bounds),
                color: ColorId::Green
            }
        );
    }

    #[test]
    fn test_hover_skips_until_idle_refresh() {
        let r = rig();
        r.inspector
            .set(Some(element("Body", "Text", Rectangle::new(0, 0, 10, 10))));
        let mut hover = HoverTracker::default();
        let t0 = Instant::now();

        hover.poll(&r.engine.inner, t0).unwrap();
        hover.poll(&r.engine.inner, t0 + Duration::from_millis(200)).unwrap();
        hover.poll(&r.engine.inner, t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(r.inspector.calls(), 1);

        hover.poll(&r.engine.inner, t0 + Duration::from_millis(501)).unwrap();
        assert_eq!(r.inspector.calls(), 2);
        assert_eq!(r.engine.overlay().highlight().color, ColorId::Blue);
    }

    #[test]
    fn test_hover_reemits_when_value_changes_in_place() {
        let r = rig();
        let bounds = Rectangle::new(0, 0, 120, 24);
        let mut field = element("Search", "Edit", bounds);
        field.value = Some("ru".into());
        r.inspector.set(Some(field.clone()));
        let mut hover = HoverTracker::default();
        let t0 = Instant::now();

        r.engine.handle_mouse_event(MouseEvent::Moved { x: 10, y: 10 });
        hover.poll(&r.engine.inner, t0).unwrap();

        field.value = Some("rust".into());
        r.inspector.set(Some(field));
        hover.poll(&r.engine.inner, t0 + Duration::from_millis(200)).unwrap();
        assert_eq!(events_named(&r.out, "hover").len(), 1);

        hover.poll(&r.engine.inner, t0 + Duration::from_millis(501)).unwrap();
        let hovers = events_named(&r.out, "hover");
        assert_eq!(hovers.len(), 2);
        assert_eq!(hovers[0]["element"]["value"], "ru");
        assert_eq!(hovers[1]["element"]["value"], "rust");
        assert_eq!(hovers[1]["x"], 10);
    }

    #[test]
    fn test_hover_clears_when_nothing_usable() {
        let r = rig();
        let mut hover = HoverTracker::default();
        let t0 = Instant::now();
        r.engine.set_highlight(Rectangle::new(0, 0, 5, 5), true);

        r.inspector
            .set(Some(button_at(Rectangle::new(0, 0, 0, 0))));
        hover.poll(&r.engine.inner, t0).unwrap();
        assert_eq!(r.engine.overlay().highlight().rectangle, None);

        r.engine.set_highlight(Rectangle::new(0, 0, 5, 5), true);
        r.inspector.fail_with("uia down");
        hover.poll(&r.engine.inner, t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(r.engine.overlay().highlight().rectangle, None);
        assert!(events_named(&r.out, "hover").is_empty());
    }

    #[test]
    fn test_hover_outside_target_clears_without_query() {
        let r = rig();
        r.windows.place(0x10, ScreenRect::new(0, 0, 100, 100));
        r.set_target(Some(0x10));
        r.inspector
            .set(Some(button_at(Rectangle::new(200, 200, 10, 10))));
        let mut hover = HoverTracker::default();
        r.engine.set_highlight(Rectangle::new(1, 1, 5, 5), false);

        r.engine.handle_mouse_event(MouseEvent::Moved { x: 150, y: 150 });
        hover.poll(&r.engine.inner, Instant::now()).unwrap();

        assert_eq!(r.inspector.calls(), 0);
        assert_eq!(r.engine.overlay().highlight().rectangle, None);
    }

    #[test]
    fn test_hover_restart_forgets_last_element() {
        let r = rig();
        r.inspector
            .set(Some(button_at(Rectangle::new(0, 0, 10, 10))));
        let t0 = Instant::now();

        HoverTracker::default().poll(&r.engine.inner, t0).unwrap();
        HoverTracker::default().poll(&r.engine.inner, t0).unwrap();

        assert_eq!(events_named(&r.out, "hover").len(), 2);
    }

    #[test]
    fn test_start_is_idempotent_and_installs_hook_once() {
        let r = rig();
        assert!(r.engine.start(None).unwrap());
        assert!(!r.engine.start(None).unwrap());
        assert_eq!(r.hook.installs(), 1);
        assert!(r.engine.overlay().is_running());

        r.engine.stop();
        r.engine.stop();
        assert!(!r.hook.is_installed());
        assert_eq!(r.hook.uninstalls(), 1);
        assert!(!r.engine.overlay().is_running());
    }

    #[test]
    fn test_hook_failure_rolls_back_start() {
        let r = rig();
        r.hook.fail_next_install();
        assert!(r.engine.start(None).is_err());
        assert!(!r.engine.is_tracking());
        assert!(!r.engine.overlay().is_running());

        assert!(r.engine.start(None).unwrap());
        r.engine.stop();
    }

    #[test]
    fn test_clicks_are_captured_in_order() {
        let r = rig();
        let ok = button_at(Rectangle::new(0, 0, 50, 20));
        r.inspector.set(Some(ok.clone()));
        r.engine.start(None).unwrap();

        r.hook.emit(MouseEvent::Pressed { x: 1, y: 1, button: MouseButton::Left });
        r.hook.emit(MouseEvent::Released { x: 1, y: 1, button: MouseButton::Left });
        r.hook.emit(MouseEvent::Pressed { x: 2, y: 2, button: MouseButton::Right });
        r.hook.emit(MouseEvent::Pressed { x: 3, y: 3, button: MouseButton::Middle });
        assert!(wait_until(Duration::from_secs(2), || r.engine.status().pending_clicks == 3));

        let clicks = r.engine.drain_pending_clicks();
        let summary: Vec<_> = clicks.iter().map(|c| (c.x, c.click_type)).collect();
        assert_eq!(
            summary,
            vec![(1, ClickType::Left), (2, ClickType::Right), (3, ClickType::Left)]
        );
        assert_eq!(clicks[0].element.as_ref(), Some(&ok));
        assert!(r.engine.drain_pending_clicks().is_empty());

        let emitted = events_named(&r.out, "click");
        assert_eq!(emitted.len(), 3);
        assert_eq!(emitted[1]["clickType"], "right");
        r.engine.stop();
    }

    #[test]
    fn test_click_with_failed_query_has_null_element() {
        let r = rig();
        r.inspector.fail_with("boom");
        r.engine.start(None).unwrap();
        r.engine.handle_mouse_event(MouseEvent::Pressed {
            x: 4,
            y: 4,
            button: MouseButton::Left,
        });
        let clicks = r.engine.drain_pending_clicks();
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].element, None);
        r.engine.stop();
    }

    #[test]
    fn test_click_gated_on_current_target_rect() {
        let r = rig();
        r.windows.place(0x20, ScreenRect::new(0, 0, 100, 100));
        r.engine.start(Some(0x20)).unwrap();

        let press = |x, y| {
            r.engine.handle_mouse_event(MouseEvent::Pressed {
                x,
                y,
                button: MouseButton::Left,
            })
        };
        press(150, 150);
        assert_eq!(r.engine.status().pending_clicks, 0);

        r.windows.place(0x20, ScreenRect::new(100, 100, 200, 200));
        press(150, 150);
        assert_eq!(r.engine.status().pending_clicks, 1);

        r.windows.close(0x20);
        press(150, 150);
        assert_eq!(r.engine.status().pending_clicks, 1);
        r.engine.stop();
    }

    #[test]
    fn test_clicks_ignored_when_not_tracking() {
        let r = rig();
        r.engine.handle_mouse_event(MouseEvent::Pressed {
            x: 1,
            y: 1,
            button: MouseButton::Left,
        });
        assert_eq!(r.engine.status().pending_clicks, 0);
    }

    #[test]
    fn test_moves_update_status_position() {
        let r = rig();
        r.engine.handle_mouse_event(MouseEvent::Moved { x: 640, y: 360 });
        let status = r.engine.status();
        assert_eq!(status.position, (640, 360));
        assert!(!status.is_tracking);
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::json!({"isTracking": false, "position": [640, 360], "pendingClicks": 0})
        );
    }

    #[test]
    fn test_concurrent_clicks_survive_drains() {
        let r = rig();
        r.engine.start(None).unwrap();
        let engine = &r.engine;

        let drained = thread::scope(|s| {
            let producer = s.spawn(|| {
                for i in 0..200 {
                    engine.handle_mouse_event(MouseEvent::Pressed {
                        x: i,
                        y: 0,
                        button: MouseButton::Left,
                    });
                }
            });
            let mut drained = Vec::new();
            while !producer.is_finished() {
                drained.extend(engine.drain_pending_clicks());
            }
            drained.extend(engine.drain_pending_clicks());
            drained
        });

        let xs: Vec<i32> = drained.iter().map(|c| c.x).collect();
        assert_eq!(xs, (0..200).collect::<Vec<_>>());
        r.engine.stop();
    }

    #[test]
    fn test_capture_reports_element_or_failure() {
        let r = rig();
        r.inspector
            .set(Some(element("Search", "Edit", Rectangle::new(5, 5, 100, 20))));
        assert!(r.engine.capture_element_at(10, 10).is_some());

        r.inspector.set(None);
        assert!(r.engine.capture_element_at(7, 8).is_none());

        let messages = r.out.messages();
        assert_eq!(messages[0]["event"], "element_captured");
        assert_eq!(messages[0]["element"]["type"], "edit");
        assert!(messages[0]["element"]["capturedAt"].is_string());
        assert_eq!(
            messages[1],
            serde_json::json!({"event": "capture_failed", "x": 7, "y": 8})
        );
    }

    #[test]
    fn test_start_clears_queue_and_stop_keeps_it() {
        let r = rig();
        r.engine.start(None).unwrap();
        r.engine.handle_mouse_event(MouseEvent::Pressed {
            x: 1,
            y: 1,
            button: MouseButton::Left,
        });
        r.engine.stop();
        assert_eq!(r.engine.status().pending_clicks, 1);

        r.engine.start(None).unwrap();
        assert_eq!(r.engine.status().pending_clicks, 0);
        r.engine.stop();
    }
}
