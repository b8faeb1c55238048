//! Global mouse input source.
//!
//! [`LowLevelMouseHook`] installs a `WH_MOUSE_LL` hook on a dedicated thread
//! that pumps messages, and forwards moves and button transitions over an
//! `mpsc` channel.  The hook procedure itself does no work beyond the send:
//! Windows silently drops low-level hooks that take too long, so element
//! queries happen on the receiving side.
//!
//! Uninstalling drops the sender, which disconnects the channel and ends
//! whatever loop is draining it.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::errors::SpyglassError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// One notification from the global input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEvent {
    Moved { x: i32, y: i32 },
    Pressed { x: i32, y: i32, button: MouseButton },
    Released { x: i32, y: i32, button: MouseButton },
}

/// Subscribe/unsubscribe seam over the global input source.
pub trait MouseHook: Send {
    fn install(&mut self, sender: Sender<MouseEvent>) -> Result<(), SpyglassError>;
    fn uninstall(&mut self) -> Result<(), SpyglassError>;
    fn is_installed(&self) -> bool;
}

/// Progress reports from a hook thread while it starts up.  The thread id
/// comes first, as soon as the thread owns a message queue.
#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Debug)]
enum Startup {
    Queue(u32),
    Installed,
    Failed(SpyglassError),
}

#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Debug)]
enum StartupOutcome {
    Ready(u32),
    Failed {
        thread_id: Option<u32>,
        error: SpyglassError,
    },
    TimedOut {
        thread_id: Option<u32>,
    },
}

/// Wait up to `timeout` for the hook thread to finish installing.  Whatever
/// the outcome, the thread id is kept if it was reported.
#[cfg_attr(not(windows), allow(dead_code))]
fn await_startup(rx: &Receiver<Startup>, timeout: Duration) -> StartupOutcome {
    let deadline = Instant::now() + timeout;
    let mut thread_id = None;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(Startup::Queue(id)) => thread_id = Some(id),
            Ok(Startup::Installed) => {
                return match thread_id {
                    Some(id) => StartupOutcome::Ready(id),
                    None => StartupOutcome::Failed {
                        thread_id,
                        error: SpyglassError::HookError(
                            "hook thread reported no message queue".into(),
                        ),
                    },
                }
            }
            Ok(Startup::Failed(error)) => return StartupOutcome::Failed { thread_id, error },
            Err(RecvTimeoutError::Timeout) => return StartupOutcome::TimedOut { thread_id },
            Err(RecvTimeoutError::Disconnected) => {
                return StartupOutcome::Failed {
                    thread_id,
                    error: SpyglassError::HookError("hook thread exited during startup".into()),
                }
            }
        }
    }
}

#[cfg(windows)]
pub use win32::LowLevelMouseHook;

#[cfg(windows)]
mod win32 {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{channel, Sender};
    use std::sync::Arc;
    use std::thread::JoinHandle;
    use std::time::Duration;

    use parking_lot::{const_mutex, Mutex};
    use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
        SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HC_ACTION, HHOOK, MSG,
        MSLLHOOKSTRUCT, PM_NOREMOVE, WH_MOUSE_LL, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN,
        WM_MBUTTONUP, WM_MOUSEMOVE, WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP,
    };

    use super::{await_startup, MouseButton, MouseEvent, MouseHook, Startup, StartupOutcome};
    use crate::errors::SpyglassError;

    /// The hook procedure has no user data pointer, so the active sender
    /// lives here.  At most one hook is installed per process.
    static HOOK_SENDER: Mutex<Option<Sender<MouseEvent>>> = const_mutex(None);

    const READY_TIMEOUT: Duration = Duration::from_secs(2);

    struct HookThread {
        thread_id: u32,
        join: JoinHandle<()>,
    }

    /// [`MouseHook`] backed by `SetWindowsHookExW(WH_MOUSE_LL)`.
    #[derive(Default)]
    pub struct LowLevelMouseHook {
        hook_thread: Option<HookThread>,
    }

    fn translate(msg: u32, x: i32, y: i32) -> Option<MouseEvent> {
        let event = match msg {
            WM_MOUSEMOVE => MouseEvent::Moved { x, y },
            WM_LBUTTONDOWN => MouseEvent::Pressed { x, y, button: MouseButton::Left },
            WM_RBUTTONDOWN => MouseEvent::Pressed { x, y, button: MouseButton::Right },
            WM_MBUTTONDOWN => MouseEvent::Pressed { x, y, button: MouseButton::Middle },
            WM_LBUTTONUP => MouseEvent::Released { x, y, button: MouseButton::Left },
            WM_RBUTTONUP => MouseEvent::Released { x, y, button: MouseButton::Right },
            WM_MBUTTONUP => MouseEvent::Released { x, y, button: MouseButton::Middle },
            _ => return None,
        };
        Some(event)
    }

    unsafe extern "system" fn mouse_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        if n_code == HC_ACTION as i32 {
            let info = &*(l_param.0 as *const MSLLHOOKSTRUCT);
            if let Some(event) = translate(w_param.0 as u32, info.pt.x, info.pt.y) {
                // Never block the input thread on a contended lock.
                if let Some(guard) = HOOK_SENDER.try_lock() {
                    if let Some(sender) = guard.as_ref() {
                        let _ = sender.send(event);
                    }
                }
            }
        }
        CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param)
    }

    impl MouseHook for LowLevelMouseHook {
        fn install(&mut self, sender: Sender<MouseEvent>) -> Result<(), SpyglassError> {
            if self.hook_thread.is_some() {
                return Ok(());
            }

            *HOOK_SENDER.lock() = Some(sender);

            // install() returns only once the hook is live (or has failed).
            let (ready_tx, ready_rx) = channel::<Startup>();
            let abandoned = Arc::new(AtomicBool::new(false));
            let thread_abandoned = Arc::clone(&abandoned);

            let spawned = std::thread::Builder::new()
                .name("spyglass-mouse-hook".into())
                .spawn(move || {
                    // Ensure the thread has a message queue before anyone posts to it.
                    let mut msg = MSG::default();
                    unsafe {
                        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
                    }
                    let _ = ready_tx.send(Startup::Queue(unsafe { GetCurrentThreadId() }));
                    if thread_abandoned.load(Ordering::SeqCst) {
                        return;
                    }

                    let fail = |what: &str, e: windows::core::Error| {
                        let _ = ready_tx.send(Startup::Failed(SpyglassError::HookError(
                            format!("{what}: {e}"),
                        )));
                    };
                    let hmodule = match unsafe { GetModuleHandleW(None) } {
                        Ok(h) => h,
                        Err(e) => return fail("GetModuleHandleW", e),
                    };
                    let hook = match unsafe {
                        SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), hmodule, 0)
                    } {
                        Ok(h) if !h.0.is_null() => h,
                        Ok(_) => {
                            return fail("SetWindowsHookExW", windows::core::Error::from_win32())
                        }
                        Err(e) => return fail("SetWindowsHookExW", e),
                    };

                    let _ = ready_tx.send(Startup::Installed);

                    // Low-level hook callbacks are delivered through this loop.
                    loop {
                        let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                        if r.0 == 0 || r.0 == -1 {
                            break;
                        }
                        unsafe {
                            let _ = TranslateMessage(&msg);
                            DispatchMessageW(&msg);
                        }
                    }

                    unsafe {
                        let _ = UnhookWindowsHookEx(hook);
                    }
                    log::debug!("mouse hook thread exiting");
                });

            let join = match spawned {
                Ok(join) => join,
                Err(e) => {
                    *HOOK_SENDER.lock() = None;
                    return Err(SpyglassError::HookError(format!("spawn hook thread: {e}")));
                }
            };

            let thread_id = match await_startup(&ready_rx, READY_TIMEOUT) {
                StartupOutcome::Ready(id) => id,
                StartupOutcome::Failed { error, .. } => {
                    *HOOK_SENDER.lock() = None;
                    let _ = join.join();
                    return Err(error);
                }
                StartupOutcome::TimedOut { mut thread_id } => {
                    *HOOK_SENDER.lock() = None;
                    abandoned.store(true, Ordering::SeqCst);
                    // The id may have raced the deadline.
                    while let Ok(report) = ready_rx.try_recv() {
                        if let Startup::Queue(id) = report {
                            thread_id = Some(id);
                        }
                    }
                    if let Some(id) = thread_id {
                        unsafe {
                            let _ = PostThreadMessageW(id, WM_QUIT, WPARAM(0), LPARAM(0));
                        }
                    }
                    let _ = join.join();
                    return Err(SpyglassError::HookError(
                        "hook thread did not signal readiness".into(),
                    ));
                }
            };

            log::info!("mouse hook installed on thread {thread_id}");
            self.hook_thread = Some(HookThread { thread_id, join });
            Ok(())
        }

        fn uninstall(&mut self) -> Result<(), SpyglassError> {
            // Drop the sender first: no new events, and the receiver disconnects.
            *HOOK_SENDER.lock() = None;

            if let Some(th) = self.hook_thread.take() {
                unsafe {
                    PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0))
                        .map_err(|e| SpyglassError::HookError(format!("PostThreadMessageW: {e}")))?;
                }
                if th.join.join().is_err() {
                    return Err(SpyglassError::HookError("hook thread panicked".into()));
                }
                log::info!("mouse hook removed");
            }
            Ok(())
        }

        fn is_installed(&self) -> bool {
            self.hook_thread.is_some()
        }
    }

    impl Drop for LowLevelMouseHook {
        fn drop(&mut self) {
            if !self.is_installed() {
                return;
            }
            if let Err(e) = self.uninstall() {
                log::warn!("mouse hook teardown: {e}");
            }
        }
    }

}

/// Placeholder off Windows: there is no global input source to hook.
#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct LowLevelMouseHook;

#[cfg(not(windows))]
impl MouseHook for LowLevelMouseHook {
    fn install(&mut self, _sender: Sender<MouseEvent>) -> Result<(), SpyglassError> {
        Err(SpyglassError::Unsupported("global mouse hook"))
    }

    fn uninstall(&mut self) -> Result<(), SpyglassError> {
        Ok(())
    }

    fn is_installed(&self) -> bool {
        false
    }
}

impl LowLevelMouseHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this build can hook global mouse input at all.
    pub fn is_available() -> bool {
        cfg!(windows)
    }
}
