//! Logging configuration for querycsv.
//!
//! Standard output carries CSV only, so every log line goes to stderr.

use tracing_subscriber::EnvFilter;

/// Initializes logging to stderr.
///
/// `RUST_LOG` takes precedence; otherwise only warnings and errors are shown, or debug
/// output for this crate when `verbose` is set.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,querycsv=debug"
    } else {
        "warn"
    }
}
