//! Element tracking service.
//!
//! Highlights the UI element under the mouse, records clicks, and reports
//! both as line-delimited JSON events on stdout while taking commands on
//! stdin.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use spyglass_core::hook::LowLevelMouseHook;
use spyglass_core::overlay::{OverlayConfig, DEFAULT_BORDER_WIDTH};
use spyglass_core::protocol::JsonLineWriter;
use spyglass_core::service::TrackingService;
use spyglass_core::surface::GdiSurface;
use spyglass_core::tracking::{TrackingBackends, TrackingConfig, TrackingEngine};
use spyglass_core::uia::UiaInspector;
use spyglass_core::window::Win32Windows;

#[derive(Parser)]
#[command(name = "spyglass-tracker", about = "UI element hover and click tracker")]
struct Args {
    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Outline stroke width in pixels
    #[arg(long, default_value_t = DEFAULT_BORDER_WIDTH, value_parser = clap::value_parser!(i32).range(1..=64))]
    border_width: i32,

    /// Hover sampling period in milliseconds
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    hover_interval_ms: u64,

    /// Re-inspect a stationary pointer after this many milliseconds
    #[arg(long, default_value_t = 500)]
    idle_refresh_ms: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    spyglass_cli::logging::init(args.verbose);

    let defaults = TrackingConfig::default();
    let config = TrackingConfig {
        hover_interval: Duration::from_millis(args.hover_interval_ms),
        idle_refresh: Duration::from_millis(args.idle_refresh_ms),
        overlay: OverlayConfig {
            border_width: args.border_width,
            ..defaults.overlay
        },
        ..defaults
    };

    let out = Arc::new(JsonLineWriter::stdout());
    let engine = TrackingEngine::new(
        config,
        TrackingBackends {
            surface: Arc::new(GdiSurface),
            inspector: Arc::new(UiaInspector::new()),
            windows: Arc::new(Win32Windows),
            hook: Box::new(LowLevelMouseHook::new()),
        },
        Arc::clone(&out),
    );
    let service = TrackingService::new(&engine, &out);

    if let Err(e) =
        service.announce_ready(LowLevelMouseHook::is_available(), UiaInspector::is_available())
    {
        log::error!("cannot write to stdout: {e}");
        return ExitCode::FAILURE;
    }

    match service.run(io::stdin().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("tracking service failed: {e}");
            ExitCode::FAILURE
        }
    }
}
