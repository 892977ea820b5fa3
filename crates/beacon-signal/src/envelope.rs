//! Envelope model.
//!
//! The envelope is the unit of application data exchanged through the
//! relay. Only the routing fields (`type`, `target`, `from`) and the
//! relay-generated fields (`id`, `message`) are interpreted; every
//! other field passes through untouched via the flattened `extra` map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SignalError;
use crate::types::ConnectionId;

/// Reserved envelope type discriminators.
pub mod kind {
    /// Sent by the relay to a freshly connected peer, carrying its id.
    pub const WELCOME: &str = "welcome";
    /// Sent by the relay when delivery to a target fails.
    pub const ERROR: &str = "error";
}

/// A relay envelope.
///
/// Application-defined fields beyond the ones named here survive a
/// forward unmodified; the relay only stamps `from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Discriminator; opaque to the relay except the reserved
    /// [`kind::WELCOME`] and [`kind::ERROR`] values.
    #[serde(rename = "type")]
    pub kind: String,

    /// Routing destination, if the sender wants the envelope forwarded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ConnectionId>,

    /// Sender identity, stamped by the relay on every forward. Any
    /// caller-supplied value is overwritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ConnectionId>,

    /// Assigned identifier; only present in `welcome` envelopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ConnectionId>,

    /// Human-readable failure reason; only present in `error` envelopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// All other fields, passed through unmodified.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Parse a raw inbound message as an envelope.
    pub fn parse(raw: &str) -> Result<Self, SignalError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize the envelope for the wire.
    pub fn to_json(&self) -> Result<String, SignalError> {
        serde_json::to_string(self)
            .map_err(|e| SignalError::internal(format!("envelope serialization failed: {e}")))
    }

    /// Build the welcome envelope announcing a connection's identifier.
    pub fn welcome(id: ConnectionId) -> Self {
        Self {
            kind: kind::WELCOME.to_string(),
            target: None,
            from: None,
            id: Some(id),
            message: None,
            extra: Map::new(),
        }
    }

    /// Build the error envelope reporting a failed delivery.
    pub fn not_found(target: &ConnectionId) -> Self {
        Self {
            kind: kind::ERROR.to_string(),
            target: None,
            from: None,
            id: None,
            message: Some(format!("Device {target} not found")),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_routing_fields() {
        let envelope = Envelope::parse(r#"{"type":"ping","target":"T1"}"#).unwrap();

        assert_eq!(envelope.kind, "ping");
        assert_eq!(envelope.target, Some(ConnectionId::from("T1")));
        assert!(envelope.from.is_none());
        assert!(envelope.extra.is_empty());
    }

    #[test]
    fn test_parse_preserves_extra_fields() {
        let raw = r#"{"type":"offer","target":"T1","sdp":"v=0...","candidates":[1,2]}"#;
        let envelope = Envelope::parse(raw).unwrap();

        assert_eq!(envelope.extra.get("sdp"), Some(&json!("v=0...")));
        assert_eq!(envelope.extra.get("candidates"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(matches!(
            Envelope::parse("not json at all"),
            Err(SignalError::MalformedEnvelope(_))
        ));
        // Valid JSON but not an envelope (no type discriminator).
        assert!(Envelope::parse(r#"{"target":"T1"}"#).is_err());
        assert!(Envelope::parse(r#"[1,2,3]"#).is_err());
    }

    #[test]
    fn test_roundtrip_keeps_extra_fields() {
        let raw = r#"{"type":"ping","target":"T1","value":1}"#;
        let mut envelope = Envelope::parse(raw).unwrap();
        envelope.from = Some(ConnectionId::from("S1"));

        let json: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            json!({"type":"ping","target":"T1","from":"S1","value":1})
        );
    }

    #[test]
    fn test_welcome_shape() {
        let envelope = Envelope::welcome(ConnectionId::from("ABC1234"));
        let json: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(json, json!({"type":"welcome","id":"ABC1234"}));
    }

    #[test]
    fn test_not_found_shape() {
        let envelope = Envelope::not_found(&ConnectionId::from("ZZZZZZZ"));
        let json: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(
            json,
            json!({"type":"error","message":"Device ZZZZZZZ not found"})
        );
    }

    #[test]
    fn test_absent_options_not_serialized() {
        let envelope = Envelope::parse(r#"{"type":"log"}"#).unwrap();
        let text = envelope.to_json().unwrap();

        assert!(!text.contains("target"));
        assert!(!text.contains("from"));
        assert!(!text.contains("message"));
    }
}
