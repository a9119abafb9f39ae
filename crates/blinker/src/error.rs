//! Unified error type for the Blinker client.

use blinker_protocol::ProtocolError;
use blinker_session::SessionError;
use blinker_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Host programs that use the sub-crates directly (a custom
/// [`Connection`](blinker_transport::Connection), say, or the wire codec
/// on its own) can funnel everything through `?` into this one type.
#[derive(Debug, thiserror::Error)]
pub enum BlinkerError {
    /// A transport-level error (resolve, dial, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (bad arguments, already running).
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let blinker_err: BlinkerError = err.into();
        assert!(matches!(blinker_err, BlinkerError::Transport(_)));
        assert!(blinker_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let blinker_err: BlinkerError = err.into();
        assert!(matches!(blinker_err, BlinkerError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let blinker_err: BlinkerError = SessionError::AlreadyRunning.into();
        assert!(matches!(blinker_err, BlinkerError::Session(_)));
        assert_eq!(blinker_err.to_string(), "session is already running");
    }

    #[test]
    fn test_question_mark_converts_session_error() {
        fn start_with_empty_key() -> Result<(), BlinkerError> {
            Err(SessionError::InvalidArgument("key must not be empty"))?;
            Ok(())
        }
        let err = start_with_empty_key().unwrap_err();
        assert!(err.to_string().contains("key must not be empty"));
    }
}
