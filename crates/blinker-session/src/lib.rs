//! # blinker-session
//!
//! Keeps one logical session with a Blinker device-control server alive.
//!
//! A [`Session`] is configured with a [`SessionBuilder`] and started with
//! the shared key. From then on a background task owns the connection:
//!
//! - the **connector** resolves and dials the configured address, and
//!   after every disconnect dials again with a tiered [`Backoff`];
//! - the **protocol loop** drives each live connection: heartbeats,
//!   periodic status reports, and `powerset` commands handed to the
//!   host's callback.
//!
//! The caller can observe the session ([`Session::is_running`],
//! [`Session::is_connected`]), stop it ([`Session::close`]), wait for it
//! to wind down ([`Session::wait_done`]) and re-arm it
//! ([`Session::reset`]).
//!
//! Per-connection failures never reach the caller; they are logged
//! through `tracing` and answered with a reconnect.

/// Emits a `tracing` event if the session's own level filter allows it.
macro_rules! log_event {
    ($shared:expr, $lvl:ident, $($arg:tt)+) => {
        if $shared.log_enabled(::tracing::Level::$lvl) {
            ::tracing::event!(::tracing::Level::$lvl, $($arg)+);
        }
    };
}

pub mod backoff;
mod builder;
mod config;
mod connector;
mod error;
mod protocol;
mod session;
mod state;

pub use backoff::Backoff;
pub use builder::{PowerSetFn, ResolveFailFn, SessionBuilder, UpdateFn};
pub use config::{DEFAULT_TIMEOUT, MAX_TIMEOUT, MIN_TIMEOUT, ServerAddress, SessionConfig};
pub use error::SessionError;
pub use session::Session;
pub use state::RunState;
