//! Immediate-mode drawing on the shared desktop surface.
//!
//! The overlay owns no window.  It strokes rectangles straight onto the
//! screen device context and erases them by asking the compositor to
//! repaint the affected region.  Other processes repaint the same pixels at
//! any time, so nothing here tracks pixel state.

use crate::errors::SpyglassError;
use crate::geometry::{ColorId, Rectangle, ScreenRect};

/// Drawing seam used by the repaint loop.
pub trait DrawSurface: Send + Sync {
    /// Stroke an unfilled rectangle outline `border_width` pixels wide.
    fn draw_outline(
        &self,
        rect: &Rectangle,
        color: ColorId,
        border_width: i32,
    ) -> Result<(), SpyglassError>;

    /// Request a repaint of `region`, or of the whole screen when `None`.
    fn invalidate(&self, region: Option<ScreenRect>) -> Result<(), SpyglassError>;
}

/// [`DrawSurface`] that draws with GDI on the desktop DC.
#[derive(Debug, Default, Clone, Copy)]
pub struct GdiSurface;

#[cfg(windows)]
mod gdi {
    use windows::Win32::Foundation::{COLORREF, HWND, RECT};
    use windows::Win32::Graphics::Gdi::{
        CreatePen, DeleteObject, GetDC, GetStockObject, InvalidateRect, Rectangle as GdiRectangle,
        ReleaseDC, SelectObject, UpdateWindow, HDC, HGDIOBJ, HPEN, NULL_BRUSH, PS_SOLID,
    };
    use windows::Win32::UI::WindowsAndMessaging::GetDesktopWindow;

    use super::*;

    fn desktop() -> HWND {
        HWND(std::ptr::null_mut())
    }

    /// Screen DC released on drop.
    struct ScreenDc(HDC);

    impl ScreenDc {
        fn acquire() -> Result<Self, SpyglassError> {
            let dc = unsafe { GetDC(desktop()) };
            if dc.is_invalid() {
                return Err(SpyglassError::DrawError("GetDC(NULL) failed".into()));
            }
            Ok(Self(dc))
        }
    }

    impl Drop for ScreenDc {
        fn drop(&mut self) {
            unsafe { ReleaseDC(desktop(), self.0) };
        }
    }

    /// Pen selected into a DC; restores the previous pen and brush, then
    /// deletes the pen on drop.
    struct SelectedPen {
        dc: HDC,
        pen: HPEN,
        old_pen: HGDIOBJ,
        old_brush: HGDIOBJ,
    }

    impl SelectedPen {
        fn select(dc: HDC, color: ColorId, width: i32) -> Result<Self, SpyglassError> {
            let pen = unsafe { CreatePen(PS_SOLID, width, COLORREF(color.colorref())) };
            if pen.is_invalid() {
                return Err(SpyglassError::DrawError(format!(
                    "CreatePen({}, {width}) failed",
                    color.name()
                )));
            }
            unsafe {
                let old_pen = SelectObject(dc, pen);
                let old_brush = SelectObject(dc, GetStockObject(NULL_BRUSH));
                Ok(Self {
                    dc,
                    pen,
                    old_pen,
                    old_brush,
                })
            }
        }
    }

    impl Drop for SelectedPen {
        fn drop(&mut self) {
            unsafe {
                SelectObject(self.dc, self.old_pen);
                SelectObject(self.dc, self.old_brush);
                let _ = DeleteObject(self.pen);
            }
        }
    }

    impl DrawSurface for GdiSurface {
        fn draw_outline(
            &self,
            rect: &Rectangle,
            color: ColorId,
            border_width: i32,
        ) -> Result<(), SpyglassError> {
            let dc = ScreenDc::acquire()?;
            let _pen = SelectedPen::select(dc.0, color, border_width)?;

            let drawn = unsafe { GdiRectangle(dc.0, rect.x, rect.y, rect.right(), rect.bottom()) };
            if !drawn.as_bool() {
                return Err(SpyglassError::DrawError(format!(
                    "Rectangle({},{},{},{}) failed",
                    rect.x,
                    rect.y,
                    rect.right(),
                    rect.bottom()
                )));
            }
            Ok(())
        }

        fn invalidate(&self, region: Option<ScreenRect>) -> Result<(), SpyglassError> {
            let ok = match region {
                Some(r) => {
                    let raw = RECT {
                        left: r.left,
                        top: r.top,
                        right: r.right,
                        bottom: r.bottom,
                    };
                    unsafe { InvalidateRect(desktop(), Some(&raw as *const RECT), true) }
                }
                None => unsafe {
                    let ok = InvalidateRect(desktop(), None, true);
                    let _ = UpdateWindow(GetDesktopWindow());
                    ok
                },
            };
            if !ok.as_bool() {
                return Err(SpyglassError::DrawError(format!(
                    "InvalidateRect({region:?}) failed"
                )));
            }
            Ok(())
        }
    }
}

#[cfg(not(windows))]
impl DrawSurface for GdiSurface {
    fn draw_outline(
        &self,
        _rect: &Rectangle,
        _color: ColorId,
        _border_width: i32,
    ) -> Result<(), SpyglassError> {
        Err(SpyglassError::Unsupported("GDI drawing"))
    }

    fn invalidate(&self, _region: Option<ScreenRect>) -> Result<(), SpyglassError> {
        Err(SpyglassError::Unsupported("GDI drawing"))
    }
}
