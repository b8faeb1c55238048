//! `spyglass_core` -- screen highlight overlay and UI element tracker.
//!
//! Everything the `spyglass-overlay` and `spyglass-tracker` services do
//! lives here; the binaries only parse arguments, install logging and wire
//! the Win32 backends into the engines.  Every platform call sits behind a
//! trait, so the engines run against in-memory doubles in tests and the
//! crate builds (with `Unsupported` backends) off Windows.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`errors`] | `SpyglassError` enum via `thiserror` |
//! | [`com`] | `ComScope` RAII wrapper for COM apartment init |
//! | [`geometry`] | `Rectangle`, `ScreenRect`, highlight `ColorId` palette |
//! | [`element`] | `ElementDescription` and the `ElementInspector` seam |
//! | [`uia`] | UI Automation inspector via `windows-rs` |
//! | [`surface`] | `DrawSurface` seam and the GDI desktop backend |
//! | [`window`] | Target-window geometry (`IsWindow` + `GetWindowRect`) |
//! | [`hook`] | Global `WH_MOUSE_LL` mouse hook feeding an `mpsc` channel |
//! | [`overlay`] | `OverlayEngine`: ~30 fps repaint loop for one highlight |
//! | [`tracking`] | `TrackingEngine`: hover highlighting and click capture |
//! | [`protocol`] | JSON-lines commands, replies and events |
//! | [`service`] | stdin command loops for both services |

pub mod com;
pub mod element;
pub mod errors;
pub mod geometry;
pub mod hook;
pub mod overlay;
pub mod protocol;
pub mod service;
pub mod surface;
pub mod tracking;
pub mod uia;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;
