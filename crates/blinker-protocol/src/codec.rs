//! Codec trait and implementations for serializing/deserializing frames.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The device protocol layers two of them: frames are JSON-encoded, and
//! the JSON text is then base64-encoded. That's expressed here as a
//! [`Base64Codec`] wrapping a [`JsonCodec`], see [`WireCodec`].

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync`: the session keeps its codec in state shared with
///   the background task, and Tokio may poll that task on any worker
///   thread.
/// - `'static`: the codec owns everything it needs, so it can sit in an
///   `Arc` that outlives the call to `start`.
///
/// ## Generic methods
///
/// `encode<T: Serialize>` and `decode<T: DeserializeOwned>` work for any
/// serde type, so one codec handles frames, bare payloads and
/// `serde_json::Value` alike. `DeserializeOwned` means the decoded value
/// doesn't borrow from `data`; the session reuses its read buffer for
/// the next message right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns a decode error if the bytes are malformed, incomplete, or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Base64Codec
// ---------------------------------------------------------------------------

/// A [`Codec`] that base64-encodes (standard alphabet, padded) whatever
/// the inner codec produces.
///
/// It's generic over the inner codec rather than hard-wired to JSON, so
/// the two layers can be tested apart: `JsonCodec` on its own shows the
/// readable frame, and `Base64Codec<JsonCodec>` is what goes on the wire.
///
/// Decoding skips `\r` and `\n` anywhere in the input. Some servers
/// terminate each frame with a line break, and the alphabet never uses
/// those bytes.
///
/// ## Example
///
/// ```rust
/// use blinker_protocol::{Codec, Frame, WireCodec};
///
/// let codec = WireCodec::default();
/// let bytes = codec.encode(&Frame::keepalive("k")).unwrap();
/// assert_eq!(bytes, b"eyJrZXkiOiJrIiwiYWN0aW9uIjoia2VlcGFsaXZlIn0=");
///
/// let frame: Frame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, Frame::keepalive("k"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec<C = JsonCodec> {
    inner: C,
}

impl<C: Codec> Base64Codec<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: Codec> Codec for Base64Codec<C> {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        let raw = self.inner.encode(value)?;
        Ok(STANDARD.encode(raw).into_bytes())
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        // The ? operator: a base64 error becomes ProtocolError::Base64
        // through map_err, and an inner error is already a ProtocolError.
        let raw = STANDARD
            .decode(strip_line_breaks(data))
            .map_err(ProtocolError::Base64)?;
        self.inner.decode(&raw)
    }
}

/// The codec used on the wire: JSON, then base64.
pub type WireCodec = Base64Codec<JsonCodec>;

/// Borrows `data` unless it actually contains a line break.
fn strip_line_breaks(data: &[u8]) -> Cow<'_, [u8]> {
    let is_break = |b: &u8| matches!(b, b'\r' | b'\n');
    if data.iter().any(is_break) {
        Cow::Owned(data.iter().copied().filter(|b| !is_break(b)).collect())
    } else {
        Cow::Borrowed(data)
    }
}
