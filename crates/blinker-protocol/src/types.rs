//! Frame types for the device protocol's wire format.
//!
//! Every message on the wire is a [`Frame`]: an envelope naming the shared
//! key, an [`Action`], and an action-specific payload. A device only ever
//! sends `keepalive` and `update` frames and only ever acts on `powerset`
//! frames, but the envelope is symmetric so a server (or a test standing
//! in for one) can use the same types.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// What a frame asks the other side to do.
///
/// Serialized as a lowercase string: `"keepalive"`, `"update"`,
/// `"powerset"`. Any other string decodes as [`Action::Unknown`] rather
/// than failing, so a newer server can add actions without breaking the
/// envelope decode; the session simply ignores what it doesn't know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Liveness signal. Carries no payload.
    Keepalive,

    /// Status report from the device ([`UpdatePayload`]).
    Update,

    /// Remote command to set the power state ([`PowerSetPayload`]).
    PowerSet,

    /// Any action string this crate doesn't recognize.
    #[serde(other, skip_serializing)]
    Unknown,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keepalive => write!(f, "keepalive"),
            Self::Update => write!(f, "update"),
            Self::PowerSet => write!(f, "powerset"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Payload of a `powerset` command.
///
/// `confirm_id` is a correlation id chosen by the server; the device
/// echoes it in the [`UpdatePayload`] that acknowledges the command.
///
/// Missing fields decode as their zero value (`false`, `0`). Servers
/// in the field omit `confirm_id` when nothing needs confirming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerSetPayload {
    pub value: bool,
    pub confirm_id: i64,
}

/// Payload of an `update` status report.
///
/// `confirm_id` is 0 for unsolicited periodic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePayload {
    pub status: bool,
    pub confirm_id: i64,
}

impl UpdatePayload {
    /// An unsolicited report (no command being acknowledged).
    pub fn periodic(status: bool) -> Self {
        Self {
            status,
            confirm_id: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// The envelope for every protocol message.
///
/// Field order matters for byte-level compatibility with existing
/// servers: `key`, `action`, then `payload`. The payload is kept as a raw
/// JSON value so the envelope can be decoded (and its key checked)
/// before committing to a payload type.
///
/// ```rust
/// use blinker_protocol::{Action, Frame};
///
/// let frame = Frame::keepalive("secret");
/// assert_eq!(frame.action, Action::Keepalive);
/// assert!(frame.payload.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The shared secret identifying the session.
    pub key: String,

    pub action: Action,

    /// Action-specific data. `None` only when the field is absent; an
    /// explicit JSON `null` is kept as `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub payload: Option<serde_json::Value>,
}

impl Frame {
    /// A `keepalive` frame.
    pub fn keepalive(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            action: Action::Keepalive,
            payload: None,
        }
    }

    /// An `update` frame carrying a status report.
    pub fn update(key: impl Into<String>, payload: UpdatePayload) -> Self {
        Self {
            key: key.into(),
            action: Action::Update,
            payload: Some(payload_value(&payload)),
        }
    }

    /// A `powerset` command frame.
    pub fn power_set(key: impl Into<String>, payload: PowerSetPayload) -> Self {
        Self {
            key: key.into(),
            action: Action::PowerSet,
            payload: Some(payload_value(&payload)),
        }
    }

    /// Decodes the payload as `T`.
    ///
    /// A `null` payload decodes like an empty object, so a `T` with
    /// `#[serde(default)]` comes out as its default value.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if the payload is absent or doesn't
    /// have the shape of `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.payload {
            None => Err(serde::de::Error::custom("missing payload")),
            Some(serde_json::Value::Null) => {
                serde_json::from_value(serde_json::Value::Object(serde_json::Map::new()))
            }
            Some(value) => T::deserialize(value),
        }
    }
}

/// Wraps whatever is present, `null` included, so only an absent field
/// falls back to `None` through `#[serde(default)]`.
fn present<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<serde_json::Value>, D::Error> {
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Both payload types are plain structs of bools and integers, which
/// always serialize to a JSON object.
fn payload_value<T: Serialize>(payload: &T) -> serde_json::Value {
    serde_json::to_value(payload).unwrap_or(serde_json::Value::Null)
}

/// Returns `true` if `data` is the bare two-byte acknowledgment `ok`.
///
/// Servers answer some frames with the literal bytes `ok` rather than a
/// base64 frame; those carry no information beyond liveness.
pub fn is_ack(data: &[u8]) -> bool {
    data == b"ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keepalive_serializes_without_payload() {
        let json = serde_json::to_string(&Frame::keepalive("k1")).unwrap();
        assert_eq!(json, r#"{"key":"k1","action":"keepalive"}"#);
    }

    #[test]
    fn test_update_serializes_in_wire_field_order() {
        let frame = Frame::update(
            "k1",
            UpdatePayload {
                status: true,
                confirm_id: 42,
            },
        );
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(
            json,
            r#"{"key":"k1","action":"update","payload":{"status":true,"confirm_id":42}}"#
        );
    }

    #[test]
    fn test_power_set_decodes_from_server_json() {
        let json = r#"{"key":"k1","action":"powerset","payload":{"value":true,"confirm_id":7}}"#;
        let frame: Frame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.action, Action::PowerSet);

        let payload: PowerSetPayload = frame.payload_as().unwrap();
        assert_eq!(
            payload,
            PowerSetPayload {
                value: true,
                confirm_id: 7
            }
        );
    }

    #[test]
    fn test_unrecognized_action_decodes_as_unknown() {
        let json = r#"{"key":"k1","action":"reboot"}"#;
        let frame: Frame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.action, Action::Unknown);
        assert!(frame.payload.is_none());
    }

    #[test]
    fn test_payload_as_missing_payload_is_error() {
        let frame = Frame {
            key: "k1".into(),
            action: Action::PowerSet,
            payload: None,
        };
        assert!(frame.payload_as::<PowerSetPayload>().is_err());
    }

    #[test]
    fn test_payload_as_null_payload_is_default() {
        let json = r#"{"key":"k1","action":"powerset","payload":null}"#;
        let frame: Frame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.payload, Some(serde_json::Value::Null));

        let payload: PowerSetPayload = frame.payload_as().unwrap();
        assert_eq!(payload, PowerSetPayload::default());
    }

    #[test]
    fn test_payload_as_missing_confirm_id_is_zero() {
        let json = r#"{"key":"k1","action":"powerset","payload":{"value":true}}"#;
        let frame: Frame = serde_json::from_str(json).unwrap();
        let payload: PowerSetPayload = frame.payload_as().unwrap();
        assert_eq!(
            payload,
            PowerSetPayload {
                value: true,
                confirm_id: 0
            }
        );
    }

    #[test]
    fn test_payload_as_wrong_shape_is_error() {
        let json = r#"{"key":"k1","action":"powerset","payload":{"value":"yes"}}"#;
        let frame: Frame = serde_json::from_str(json).unwrap();
        assert!(frame.payload_as::<PowerSetPayload>().is_err());
    }

    #[test]
    fn test_confirm_id_accepts_full_i64_range() {
        let json = format!(
            r#"{{"key":"k","action":"powerset","payload":{{"value":false,"confirm_id":{}}}}}"#,
            i64::MAX
        );
        let frame: Frame = serde_json::from_str(&json).unwrap();
        let payload: PowerSetPayload = frame.payload_as().unwrap();
        assert_eq!(payload.confirm_id, i64::MAX);
    }

    #[test]
    fn test_is_ack_only_matches_exact_bytes() {
        assert!(is_ack(b"ok"));
        assert!(!is_ack(b"ok\n"));
        assert!(!is_ack(b"OK"));
        assert!(!is_ack(b""));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::PowerSet.to_string(), "powerset");
        assert_eq!(Action::Keepalive.to_string(), "keepalive");
    }
}
