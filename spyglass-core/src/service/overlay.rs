use std::io::BufRead;

use crate::errors::SpyglassError;
use crate::geometry::{ColorId, Rectangle};
use crate::overlay::OverlayEngine;
use crate::protocol::{
    parse_command, ErrorReply, JsonLineWriter, LineError, OverlayCommand, OverlayReply,
};

use super::{serve, Flow, LineHandler};

/// Command dispatcher for the standalone overlay.
pub struct OverlayService<'a> {
    engine: &'a OverlayEngine,
    out: &'a JsonLineWriter,
}

impl<'a> OverlayService<'a> {
    pub fn new(engine: &'a OverlayEngine, out: &'a JsonLineWriter) -> Self {
        Self { engine, out }
    }

    pub fn announce_ready(&self) -> Result<(), SpyglassError> {
        self.out.send(&OverlayReply::Ready {
            message: "Overlay service ready",
        })
    }

    /// Serve commands from `input` until `exit` or end of input.
    pub fn run<R: BufRead>(&self, input: R) -> Result<(), SpyglassError> {
        serve(self, input)
    }

    pub fn handle(&self, command: OverlayCommand) -> Result<Flow, SpyglassError> {
        match command {
            OverlayCommand::Start => match self.engine.start() {
                Ok(true) => self.out.send(&OverlayReply::Started {
                    message: "Overlay started",
                })?,
                Ok(false) => log::debug!("overlay already running"),
                Err(e) => self.out.send(&ErrorReply::new(e.to_string()))?,
            },
            OverlayCommand::Stop => {
                self.engine.stop();
                self.out.send(&OverlayReply::Stopped {
                    message: "Overlay stopped",
                })?;
            }
            OverlayCommand::Highlight {
                x,
                y,
                width,
                height,
                color,
            } => {
                let color = color.as_deref().map_or(ColorId::Green, ColorId::from_name);
                self.engine
                    .set_highlight(Rectangle::new(x, y, width, height), color);
                self.out.send(&OverlayReply::Highlighted {
                    x,
                    y,
                    width,
                    height,
                })?;
            }
            OverlayCommand::Clear => {
                self.engine.clear();
                self.out.send(&OverlayReply::Cleared)?;
            }
            OverlayCommand::Exit => {
                self.engine.stop();
                return Ok(Flow::Exit);
            }
            OverlayCommand::Unknown => log::debug!("ignoring unknown action"),
        }
        Ok(Flow::Continue)
    }
}

impl LineHandler for OverlayService<'_> {
    fn handle_line(&self, line: &str) -> Result<Flow, SpyglassError> {
        match parse_command::<OverlayCommand>(line) {
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

    fn reject_line(&self, _line: &str) -> Result<(), SpyglassError> {
        self.out.send(&ErrorReply::invalid_json())
    }

    fn report_error(&self, message: &str) -> Result<(), SpyglassError> {
        self.out.send(&ErrorReply::new(message))
    }

    fn shutdown(&self) {
        self.engine.stop();
    }
}
