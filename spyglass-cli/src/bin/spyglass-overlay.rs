//! Screen highlight overlay service.
//!
//! Reads line-delimited JSON commands from stdin, keeps one highlight
//! outline painted on screen, and answers on stdout.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use spyglass_core::overlay::{OverlayConfig, OverlayEngine, DEFAULT_BORDER_WIDTH};
use spyglass_core::protocol::{JsonLineWriter, OverlayCommand};
use spyglass_core::service::OverlayService;
use spyglass_core::surface::GdiSurface;

#[derive(Parser)]
#[command(name = "spyglass-overlay", about = "Screen highlight overlay service")]
struct Args {
    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Outline stroke width in pixels
    #[arg(long, default_value_t = DEFAULT_BORDER_WIDTH, value_parser = clap::value_parser!(i32).range(1..=64))]
    border_width: i32,

    /// Repaint period in milliseconds
    #[arg(long, default_value_t = 33, value_parser = clap::value_parser!(u64).range(1..))]
    frame_interval_ms: u64,

    /// Wait for an explicit `start` command before painting
    #[arg(long)]
    no_autostart: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    spyglass_cli::logging::init(args.verbose);

    let config = OverlayConfig {
        frame_interval: Duration::from_millis(args.frame_interval_ms),
        border_width: args.border_width,
        ..OverlayConfig::default()
    };
    let engine = OverlayEngine::new(Arc::new(GdiSurface), config);
    let out = JsonLineWriter::stdout();
    let service = OverlayService::new(&engine, &out);

    if let Err(e) = service.announce_ready() {
        log::error!("cannot write to stdout: {e}");
        return ExitCode::FAILURE;
    }
    if !args.no_autostart {
        if let Err(e) = service.handle(OverlayCommand::Start) {
            log::error!("cannot write to stdout: {e}");
            return ExitCode::FAILURE;
        }
    }

    match service.run(io::stdin().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("overlay service failed: {e}");
            ExitCode::FAILURE
        }
    }
}
