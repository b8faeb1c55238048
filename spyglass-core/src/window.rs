//! Target-window geometry via Win32.
//!
//! The tracker gates hover and click handling on a target window.  Windows
//! move and close, so the rectangle is never cached: every gate decision
//! calls [`WindowLocator::window_rect`] again.

use crate::errors::SpyglassError;
use crate::geometry::ScreenRect;

/// Query seam for "bounding rectangle of window handle".
pub trait WindowLocator: Send + Sync {
    fn window_rect(&self, handle: isize) -> Result<ScreenRect, SpyglassError>;
}

/// Whether `(x, y)` lies inside the window's *current* rectangle.
///
/// An invalid handle or a failed query counts as "outside".
pub fn point_in_window(locator: &dyn WindowLocator, handle: isize, x: i32, y: i32) -> bool {
    match locator.window_rect(handle) {
        Ok(rect) => rect.contains(x, y),
        Err(e) => {
            log::debug!("target window {handle:#x} unavailable: {e}");
            false
        }
    }
}

/// [`WindowLocator`] backed by `IsWindow` + `GetWindowRect`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Windows;

impl WindowLocator for Win32Windows {
    #[cfg(windows)]
    fn window_rect(&self, handle: isize) -> Result<ScreenRect, SpyglassError> {
        use windows::Win32::Foundation::{HWND, RECT};
        use windows::Win32::UI::WindowsAndMessaging::{GetWindowRect, IsWindow};

        let hwnd = HWND(handle as *mut core::ffi::c_void);
        if !unsafe { IsWindow(hwnd) }.as_bool() {
            return Err(SpyglassError::WindowError(format!(
                "{handle:#x} is not a window"
            )));
        }

        let mut raw = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut raw) }
            .map_err(|e| SpyglassError::WindowError(format!("GetWindowRect({handle:#x}): {e}")))?;

        Ok(ScreenRect::new(raw.left, raw.top, raw.right, raw.bottom))
    }

    #[cfg(not(windows))]
    fn window_rect(&self, _handle: isize) -> Result<ScreenRect, SpyglassError> {
        Err(SpyglassError::Unsupported("window geometry"))
    }
}
