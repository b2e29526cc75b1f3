use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// Output goes to stderr so CSV written to stdout stays clean. The filter
/// comes from `RUST_LOG` and defaults to `warn`, e.g. `RUST_LOG=storefront=debug`.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}
