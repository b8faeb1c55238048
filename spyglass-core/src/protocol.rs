//! Newline-delimited JSON protocol shared by both services.
//!
//! Input lines are objects tagged by `action`; output lines are objects
//! tagged by `status` (overlay service) or `event` (tracking service), plus
//! bare `{"error": ...}` lines.  [`JsonLineWriter`] serialises and flushes
//! each line under one lock, so replies from the command thread and events
//! from the hover and input threads never interleave.

use std::io::Write;

use parking_lot::Mutex;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};

use crate::element::ElementDescription;
use crate::errors::SpyglassError;
use crate::tracking::{PendingClick, TrackingStatus};

/// Longest prefix of a rejected line echoed back by the tracking service.
pub const MAX_ECHOED_INPUT: usize = 100;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Line-oriented JSON sink, flushed after every message.
pub struct JsonLineWriter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLineWriter {
    pub fn new<W: Write + Send + 'static>(out: W) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<(), SpyglassError> {
        let line = serde_json::to_string(message)?;
        let mut out = self.out.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

/// `{"error": ...}` line, optionally echoing (a prefix of) the bad input.
#[derive(Debug, Serialize)]
pub struct ErrorReply {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

impl ErrorReply {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            input: None,
        }
    }

    pub fn invalid_json() -> Self {
        Self::new("Invalid JSON")
    }

    /// Invalid-JSON reply carrying the first [`MAX_ECHOED_INPUT`] characters.
    pub fn invalid_json_echo(line: &str) -> Self {
        Self {
            error: "Invalid JSON".into(),
            input: Some(line.chars().take(MAX_ECHOED_INPUT).collect()),
        }
    }
}

/// Replies of the overlay service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OverlayReply {
    Ready { message: &'static str },
    Started { message: &'static str },
    Stopped { message: &'static str },
    Highlighted { x: i32, y: i32, width: i32, height: i32 },
    Cleared,
}

/// `element` payload of `element_captured`: the description plus the
/// capture time.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedElement {
    #[serde(flatten)]
    pub element: ElementDescription,
    #[serde(rename = "capturedAt")]
    pub captured_at: String,
}

/// Replies and unsolicited events of the tracking service.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackingEvent {
    Ready {
        #[serde(rename = "inputHook")]
        input_hook: bool,
        #[serde(rename = "uiAutomation")]
        ui_automation: bool,
    },
    TrackingStarted {
        #[serde(rename = "targetHandle")]
        target_handle: Option<isize>,
    },
    TrackingStopped,
    Hover {
        x: i32,
        y: i32,
        element: ElementDescription,
    },
    Click(PendingClick),
    ElementCaptured {
        element: CapturedElement,
    },
    CaptureFailed {
        x: i32,
        y: i32,
    },
    PendingClicks {
        clicks: Vec<PendingClick>,
    },
    ElementInfo {
        element: Option<ElementDescription>,
    },
    Status(TrackingStatus),
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Coordinates arrive as JSON numbers of either kind; anything beyond the
/// `i32` range is clamped.
fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let n = f64::deserialize(deserializer)?;
    if n.is_nan() {
        return Err(D::Error::custom("coordinate is not a number"));
    }
    Ok(n.clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

fn default_extent() -> i32 {
    100
}

fn default_true() -> bool {
    true
}

/// Commands understood by the overlay service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OverlayCommand {
    Start,
    Stop,
    Highlight {
        #[serde(default, deserialize_with = "lenient_i32")]
        x: i32,
        #[serde(default, deserialize_with = "lenient_i32")]
        y: i32,
        #[serde(default = "default_extent", deserialize_with = "lenient_i32")]
        width: i32,
        #[serde(default = "default_extent", deserialize_with = "lenient_i32")]
        height: i32,
        #[serde(default)]
        color: Option<String>,
    },
    Clear,
    Exit,
    #[serde(other)]
    Unknown,
}

/// Commands understood by the tracking service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TrackingCommand {
    Start {
        #[serde(default, rename = "targetHandle")]
        target_handle: Option<i64>,
    },
    Stop,
    Capture {
        #[serde(default, deserialize_with = "lenient_i32")]
        x: i32,
        #[serde(default, deserialize_with = "lenient_i32")]
        y: i32,
    },
    GetClicks,
    GetElement {
        #[serde(default, deserialize_with = "lenient_i32")]
        x: i32,
        #[serde(default, deserialize_with = "lenient_i32")]
        y: i32,
    },
    Highlight {
        #[serde(default, deserialize_with = "lenient_i32")]
        x: i32,
        #[serde(default, deserialize_with = "lenient_i32")]
        y: i32,
        #[serde(default = "default_extent", deserialize_with = "lenient_i32")]
        width: i32,
        #[serde(default = "default_extent", deserialize_with = "lenient_i32")]
        height: i32,
        #[serde(default = "default_true")]
        interactive: bool,
    },
    ClearHighlight,
    Status,
    Exit,
    #[serde(other)]
    Unknown,
}

/// Why an input line produced no command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// Not parseable as JSON at all.
    InvalidJson,
    /// Valid JSON, but not a command object with usable fields.
    InvalidCommand(String),
}

/// Parse one input line.  Blank lines yield `Ok(None)`.
pub fn parse_command<C: DeserializeOwned>(line: &str) -> Result<Option<C>, LineError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|_| LineError::InvalidJson)?;
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| LineError::InvalidCommand(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
