use std::io::BufRead;

use crate::errors::SpyglassError;
use crate::geometry::Rectangle;
use crate::protocol::{
    parse_command, ErrorReply, JsonLineWriter, LineError, TrackingCommand, TrackingEvent,
};
use crate::tracking::TrackingEngine;

use super::{serve, Flow, LineHandler};

/// Command dispatcher for the tracker.  Shares its writer with the engine,
/// which emits `hover` and `click` events on its own threads.
pub struct TrackingService<'a> {
    engine: &'a TrackingEngine,
    out: &'a JsonLineWriter,
}

impl<'a> TrackingService<'a> {
    pub fn new(engine: &'a TrackingEngine, out: &'a JsonLineWriter) -> Self {
        Self { engine, out }
    }

    /// Emit `ready` with the backend availability flags.
    pub fn announce_ready(
        &self,
        input_hook: bool,
        ui_automation: bool,
    ) -> Result<(), SpyglassError> {
        self.out.send(&TrackingEvent::Ready {
            input_hook,
            ui_automation,
        })
    }

    /// Serve commands from `input` until `exit` or end of input.
    pub fn run<R: BufRead>(&self, input: R) -> Result<(), SpyglassError> {
        serve(self, input)
    }

    pub fn handle(&self, command: TrackingCommand) -> Result<Flow, SpyglassError> {
        match command {
            TrackingCommand::Start { target_handle } => {
                let target = target_handle.map(|h| h as isize);
                match self.engine.start(target) {
                    Ok(true) => self.out.send(&TrackingEvent::TrackingStarted {
                        target_handle: target,
                    })?,
                    Ok(false) => log::debug!("already tracking"),
                    Err(e) => {
                        log::warn!("tracking start failed: {e}");
                        self.out.send(&ErrorReply::new(e.to_string()))?;
                    }
                }
            }
            TrackingCommand::Stop => {
                self.engine.stop();
                self.out.send(&TrackingEvent::TrackingStopped)?;
            }
            TrackingCommand::Capture { x, y } => {
                self.engine.capture_element_at(x, y);
            }
            TrackingCommand::GetClicks => {
                let clicks = self.engine.drain_pending_clicks();
                self.out.send(&TrackingEvent::PendingClicks { clicks })?;
            }
            TrackingCommand::GetElement { x, y } => {
                let element = self.engine.element_at(x, y);
                self.out.send(&TrackingEvent::ElementInfo { element })?;
            }
            TrackingCommand::Highlight {
                x,
                y,
                width,
                height,
                interactive,
            } => self
                .engine
                .set_highlight(Rectangle::new(x, y, width, height), interactive),
            TrackingCommand::ClearHighlight => self.engine.clear_highlight(),
            TrackingCommand::Status => {
                self.out.send(&TrackingEvent::Status(self.engine.status()))?;
            }
            TrackingCommand::Exit => {
                self.engine.stop();
                return Ok(Flow::Exit);
            }
            TrackingCommand::Unknown => log::debug!("ignoring unknown action"),
        }
        Ok(Flow::Continue)
    }
}

impl LineHandler for TrackingService<'_> {
    fn handle_line(&self, line: &str) -> Result<Flow, SpyglassError> {
        match parse_command::<TrackingCommand>(line) {
            Ok(Some(command)) => self.handle(command),
            Ok(None) => Ok(Flow::Continue),
            Err(LineError::InvalidJson) => {
                self.reject_line(line)?;
                Ok(Flow::Continue)
            }
            Err(LineError::InvalidCommand(detail)) => {
                self.out
                    .send(&ErrorReply::new(format!("Invalid command: {detail}")))?;
                Ok(Flow::Continue)
            }
        }
    }

    fn reject_line(&self, line: &str) -> Result<(), SpyglassError> {
        self.out.send(&ErrorReply::invalid_json_echo(line))
    }

    fn report_error(&self, message: &str) -> Result<(), SpyglassError> {
        self.out.send(&ErrorReply::new(message))
    }

    fn shutdown(&self) {
        self.engine.stop();
    }
}
