//! Error types for the session layer.

use std::time::Duration;

use blinker_protocol::ProtocolError;
use blinker_transport::TransportError;

/// Errors that can occur while starting or running a session.
///
/// Only [`InvalidArgument`](SessionError::InvalidArgument),
/// [`AlreadyRunning`](SessionError::AlreadyRunning) and
/// [`NoRuntime`](SessionError::NoRuntime) ever reach the caller, from
/// [`Session::start`](crate::Session::start). The rest end a single
/// connection; the connector logs them and dials again.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An empty key, or neither a server address nor a connection was
    /// configured.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// `start` was called while the session was not idle.
    #[error("session is already running")]
    AlreadyRunning,

    /// `start` was called outside a Tokio runtime.
    #[error("no Tokio runtime to run the session on")]
    NoRuntime,

    /// Nothing was received from the server for too long.
    #[error("no data received for {0:?}")]
    TimedOut(Duration),

    /// The connection failed (other than a read timeout).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
