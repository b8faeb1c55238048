use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber.  stdout carries the protocol, so
/// nothing may log there.
///
/// Without `verbose` the level is pinned to `info`; with it, `RUST_LOG`
/// may override the `debug` default.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
