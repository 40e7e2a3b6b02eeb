#![forbid(unsafe_code)]

//! Structured log output for native hosts.
//!
//! The runtime only emits `tracing` events and spans. Embedders that want
//! JSON lines on stderr call [`init_json_logging`] once at startup; the
//! filter comes from `RUST_LOG`, falling back to the given default
//! directive (for example `"scrollstage_runtime=debug"`).

use tracing_subscriber::EnvFilter;

/// Error returned when a global subscriber is already installed.
#[derive(Debug)]
pub struct LoggingInitError(Box<dyn std::error::Error + Send + Sync>);

impl std::fmt::Display for LoggingInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to install tracing subscriber: {}", self.0)
    }
}

impl std::error::Error for LoggingInitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

/// Install a global JSON subscriber with span close events.
pub fn init_json_logging(default_directive: &str) -> Result<(), LoggingInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(LoggingInitError)
}
