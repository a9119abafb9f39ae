//! Logging setup for host programs.
//!
//! The session logs through `tracing` and never installs a subscriber
//! itself. Programs that don't have one yet can call [`init`].

use tracing_subscriber::EnvFilter;

/// Error returned when a global subscriber is already installed.
pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Builds the filter: `RUST_LOG` if set and valid, `default_filter`
/// otherwise.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs a `fmt` subscriber writing to stderr.
///
/// # Errors
/// Fails if a global subscriber has already been set.
pub fn try_init(default_filter: &str) -> Result<(), InitError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}

/// Like [`try_init`], but leaves an existing subscriber in place.
pub fn init(default_filter: &str) {
    if try_init(default_filter).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
