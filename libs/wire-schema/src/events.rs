//! WebSocket event envelopes.
//!
//! Events are JSON text frames tagged by `type`. The client only ever sends
//! `message:send`; the relay only ever pushes `message:receive`, and only to
//! the named recipient while it is connected.

use serde::{Deserialize, Serialize};

/// Events flowing client → relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "message:send")]
    MessageSend {
        to: String,
        ciphertext: String,
        nonce: String,
    },
}

/// Events flowing relay → client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "message:receive")]
    MessageReceive {
        from: String,
        ciphertext: String,
        nonce: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_event_round_trips_with_tag() {
        let evt = ClientEvent::MessageSend {
            to: "bob".into(),
            ciphertext: "YWJj".into(),
            nonce: "bm9uY2U=".into(),
        };
        let json = serde_json::to_string(&evt).unwrap();
        assert!(json.contains(r#""type":"message:send""#));

        let back: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, evt);
    }

    #[test]
    fn server_event_uses_receive_tag() {
        let evt = ServerEvent::MessageReceive {
            from: "alice".into(),
            ciphertext: "YWJj".into(),
            nonce: "bm9uY2U=".into(),
        };
        let json = serde_json::to_string(&evt).unwrap();
        assert!(json.contains(r#""type":"message:receive""#));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let json = r#"{"type":"message:edit","to":"bob","ciphertext":"x","nonce":"y"}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());
    }
}
