//! Wire protocol for Blinker devices.
//!
//! This crate defines what a device and the control server say to each
//! other:
//!
//! - **Types** ([`Frame`], [`Action`], [`PowerSetPayload`],
//!   [`UpdatePayload`]): the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`Base64Codec`],
//!   [`WireCodec`]): how those structures become bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong along the way.
//!
//! # Wire format
//!
//! Each frame is JSON-encoded and the JSON text is base64-encoded; the
//! resulting ASCII is written as one message with no length prefix. The
//! server may also send the bare bytes `ok` as an acknowledgment
//! ([`is_ack`]).
//!
//! ```text
//! {"key":"<secret>","action":"update","payload":{"status":true,"confirm_id":42}}
//!   → base64 → eyJrZXkiOi...
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Base64Codec, Codec, JsonCodec, WireCodec};
pub use error::ProtocolError;
pub use types::{Action, Frame, PowerSetPayload, UpdatePayload, is_ack};
