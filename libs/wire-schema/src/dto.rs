//! REST request and response bodies.

use serde::{Deserialize, Serialize};

/// `POST /api/auth` body. `publicKey` is required only for first-time
/// registration; on later logins it overwrites the stored key when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    #[serde(rename = "publicKey", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

/// `POST /api/publickeys` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterKeyRequest {
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// `POST /api/getpublickey` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupKeyRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupKeyResponse {
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// One entry of `GET /api/contacts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactDto {
    pub username: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// One entry of `GET /api/messages?with=X`, both directions of the pair,
/// ascending by `createdAt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    #[serde(rename = "from")]
    pub sender: String,
    #[serde(rename = "to")]
    pub recipient: String,
    pub ciphertext: String,
    pub nonce: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// `POST /api/contacts/add` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddContactRequest {
    #[serde(rename = "contactUsername")]
    pub contact_username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_request_omits_missing_key() {
        let req = AuthRequest {
            username: "alice".into(),
            public_key: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"username":"alice"}"#);
    }

    #[test]
    fn message_dto_uses_wire_field_names() {
        let json = r#"{"from":"alice","to":"bob","ciphertext":"YWJj","nonce":"bg==","createdAt":"2026-01-01T00:00:00Z"}"#;
        let msg: MessageDto = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender, "alice");
        assert_eq!(msg.recipient, "bob");

        let back = serde_json::to_string(&msg).unwrap();
        assert!(back.contains(r#""from":"alice""#));
        assert!(back.contains(r#""createdAt""#));
    }
}
