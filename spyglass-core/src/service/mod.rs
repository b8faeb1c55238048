//! Line-driven command services.
//!
//! Each service reads one JSON command per line from a [`BufRead`], applies
//! it to the engine it was handed, and answers through a shared
//! [`JsonLineWriter`](crate::protocol::JsonLineWriter).  [`serve`] owns the
//! read loop and its end-of-input rules; the services only dispatch.

mod overlay;
mod tracking;

pub use overlay::OverlayService;
pub use tracking::TrackingService;

use std::io::BufRead;

use crate::errors::SpyglassError;

/// Whether the read loop continues after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// One command dispatcher driven by [`serve`].
pub trait LineHandler {
    /// Handle one raw input line.  `Err` only for output failures.
    fn handle_line(&self, line: &str) -> Result<Flow, SpyglassError>;

    /// Answer a line that is not text at all.  `line` is its lossy decoding.
    fn reject_line(&self, line: &str) -> Result<(), SpyglassError>;

    /// Report an input failure to the controller.
    fn report_error(&self, message: &str) -> Result<(), SpyglassError>;

    /// Stop the engine; called at end of input and on read failure.
    fn shutdown(&self);
}

/// Run `handler` over every line of `input`.
///
/// End of input stops the engine and returns `Ok`.  A read failure is
/// reported, stops the engine and is returned.  A line that is not UTF-8
/// goes to [`LineHandler::reject_line`] and reading continues.
pub fn serve<H: LineHandler + ?Sized, R: BufRead>(
    handler: &H,
    mut input: R,
) -> Result<(), SpyglassError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::error!("failed to read command: {e}");
                if let Err(report) = handler.report_error(&e.to_string()) {
                    log::warn!("could not report read failure: {report}");
                }
                handler.shutdown();
                return Err(e.into());
            }
        }
        let raw = trim_line_ending(&buf);
        let flow = match std::str::from_utf8(raw) {
            Ok(line) => handler.handle_line(line),
            Err(e) => {
                log::debug!("rejecting non-UTF-8 line: {e}");
                handler
                    .reject_line(&String::from_utf8_lossy(raw))
                    .map(|()| Flow::Continue)
            }
        };
        match flow {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => return Ok(()),
            Err(e) => {
                handler.shutdown();
                return Err(e);
            }
        }
    }
    log::info!("end of input");
    handler.shutdown();
    Ok(())
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
