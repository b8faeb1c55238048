//! Error types for `spyglass_core`.
//!
//! Every collaborator boundary (drawing surface, accessibility layer, window
//! queries, input hook) returns [`SpyglassError`].  The engines decide which
//! failures are recoverable; nothing here is logged or swallowed.

use thiserror::Error;

/// Top-level error type for the `spyglass_core` library.
///
/// Each variant corresponds to a distinct subsystem.
#[derive(Debug, Error)]
pub enum SpyglassError {
    /// COM apartment initialisation failure.
    #[error("ComError: {0}")]
    ComError(String),

    /// UI Automation element lookup failure.
    #[error("InspectError: {0}")]
    InspectError(String),

    /// Desktop drawing failure (device context, pen, invalidation).
    #[error("DrawError: {0}")]
    DrawError(String),

    /// Window handle is invalid or its rectangle could not be read.
    #[error("WindowError: {0}")]
    WindowError(String),

    /// Global mouse hook could not be installed or removed.
    #[error("HookError: {0}")]
    HookError(String),

    /// A command line was well-formed JSON but not a usable command.
    #[error("ProtocolError: {0}")]
    ProtocolError(String),

    /// The capability has no backend on this platform.
    #[error("Unsupported: {0} is only available on Windows")]
    Unsupported(&'static str),

    /// Reading commands or writing responses failed.
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),

    /// Response serialization failed.
    #[error("JsonError: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convert a `windows::core::Error` (COM / Win32 HRESULT failure) into a
/// `SpyglassError::ComError`.
#[cfg(windows)]
impl From<windows::core::Error> for SpyglassError {
    fn from(err: windows::core::Error) -> Self {
        SpyglassError::ComError(format!("Windows COM error: {err}"))
    }
}
