//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The JSON text didn't parse, or didn't match the expected type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The outer base64 layer was malformed.
    #[error("base64 decode failed: {0}")]
    Base64(base64::DecodeError),

    /// The frame decoded but violates the protocol, e.g. a payload that
    /// doesn't fit its action.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
