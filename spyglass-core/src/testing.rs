//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::element::{ElementDescription, ElementInspector, ElementProperties};
use crate::errors::SpyglassError;
use crate::geometry::{ColorId, Rectangle, ScreenRect};
use crate::hook::{MouseEvent, MouseHook};
use crate::surface::DrawSurface;
use crate::window::WindowLocator;

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOp {
    Draw {
        rect: Rectangle,
        color: ColorId,
        border_width: i32,
    },
    Invalidate(Option<ScreenRect>),
}

/// Records every call; either call kind can be switched to fail.
#[derive(Default)]
pub struct RecordingSurface {
    ops: Mutex<Vec<SurfaceOp>>,
    fail_draws: AtomicBool,
    fail_invalidates: AtomicBool,
}

impl RecordingSurface {
    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.ops.lock().clone()
    }

    pub fn take_ops(&self) -> Vec<SurfaceOp> {
        std::mem::take(&mut *self.ops.lock())
    }

    pub fn draws(&self) -> Vec<Rectangle> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::Draw { rect, .. } => Some(*rect),
                SurfaceOp::Invalidate(_) => None,
            })
            .collect()
    }

    pub fn set_fail_draws(&self, fail: bool) {
        self.fail_draws.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_invalidates(&self, fail: bool) {
        self.fail_invalidates.store(fail, Ordering::SeqCst);
    }
}

impl DrawSurface for RecordingSurface {
    fn draw_outline(
        &self,
        rect: &Rectangle,
        color: ColorId,
        border_width: i32,
    ) -> Result<(), SpyglassError> {
        self.ops.lock().push(SurfaceOp::Draw {
            rect: *rect,
            color,
            border_width,
        });
        if self.fail_draws.load(Ordering::SeqCst) {
            return Err(SpyglassError::DrawError("scripted draw failure".into()));
        }
        Ok(())
    }

    fn invalidate(&self, region: Option<ScreenRect>) -> Result<(), SpyglassError> {
        self.ops.lock().push(SurfaceOp::Invalidate(region));
        if self.fail_invalidates.load(Ordering::SeqCst) {
            return Err(SpyglassError::DrawError("scripted invalidate failure".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

/// Element fixture with the given control type and bounds.
pub fn element(name: &str, control_type: &str, bounds: Rectangle) -> ElementDescription {
    ElementDescription::from(ElementProperties {
        name: name.to_owned(),
        control_type: control_type.to_owned(),
        class_name: String::new(),
        automation_id: String::new(),
        value: None,
        is_enabled: true,
        is_offscreen: false,
        bounds,
        parent_name: None,
    })
}

/// Answers every query with the currently scripted result.
pub struct ScriptedInspector {
    result: Mutex<Result<Option<ElementDescription>, String>>,
    calls: AtomicUsize,
}

impl Default for ScriptedInspector {
    fn default() -> Self {
        Self {
            result: Mutex::new(Ok(None)),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedInspector {
    pub fn set(&self, element: Option<ElementDescription>) {
        *self.result.lock() = Ok(element);
    }

    pub fn fail_with(&self, message: &str) {
        *self.result.lock() = Err(message.to_owned());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ElementInspector for ScriptedInspector {
    fn describe_element_at(
        &self,
        _x: i32,
        _y: i32,
    ) -> Result<Option<ElementDescription>, SpyglassError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .lock()
            .clone()
            .map_err(SpyglassError::InspectError)
    }
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// Window table keyed by handle; unknown handles fail like a closed window.
#[derive(Default)]
pub struct FakeWindows {
    rects: Mutex<HashMap<isize, ScreenRect>>,
}

impl FakeWindows {
    pub fn place(&self, handle: isize, rect: ScreenRect) {
        self.rects.lock().insert(handle, rect);
    }

    pub fn close(&self, handle: isize) {
        self.rects.lock().remove(&handle);
    }
}

impl WindowLocator for FakeWindows {
    fn window_rect(&self, handle: isize) -> Result<ScreenRect, SpyglassError> {
        self.rects
            .lock()
            .get(&handle)
            .copied()
            .ok_or_else(|| SpyglassError::WindowError(format!("{handle:#x} is not a window")))
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockHookState {
    sender: Option<Sender<MouseEvent>>,
    installs: usize,
    uninstalls: usize,
    fail_install: bool,
}

/// Test side of a [`MockHook`]: injects events and inspects install state.
#[derive(Clone, Default)]
pub struct MockHookHandle {
    state: Arc<Mutex<MockHookState>>,
}

impl MockHookHandle {
    /// Deliver `event` as the OS would; `false` when no hook is installed.
    pub fn emit(&self, event: MouseEvent) -> bool {
        match self.state.lock().sender.as_ref() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    pub fn installs(&self) -> usize {
        self.state.lock().installs
    }

    pub fn uninstalls(&self) -> usize {
        self.state.lock().uninstalls
    }

    pub fn is_installed(&self) -> bool {
        self.state.lock().sender.is_some()
    }

    pub fn fail_next_install(&self) {
        self.state.lock().fail_install = true;
    }
}

pub struct MockHook {
    state: Arc<Mutex<MockHookState>>,
}

impl MockHook {
    pub fn new() -> (Self, MockHookHandle) {
        let handle = MockHookHandle::default();
        (
            Self {
                state: Arc::clone(&handle.state),
            },
            handle,
        )
    }
}

impl MouseHook for MockHook {
    fn install(&mut self, sender: Sender<MouseEvent>) -> Result<(), SpyglassError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_install) {
            return Err(SpyglassError::HookError("scripted install failure".into()));
        }
        state.installs += 1;
        state.sender = Some(sender);
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), SpyglassError> {
        let mut state = self.state.lock();
        if state.sender.take().is_some() {
            state.uninstalls += 1;
        }
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.state.lock().sender.is_some()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Cloneable in-memory writer for capturing protocol output.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.bytes.lock())
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Parsed JSON lines.
    pub fn messages(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
