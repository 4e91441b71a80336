use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Decryption tag mismatch: tampered ciphertext, wrong nonce or wrong
    /// counterpart key. Kept separate from transport failures so the caller
    /// can render an undecryptable-message state instead of retrying.
    #[error("authentication failure: ciphertext could not be verified")]
    Authentication,

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("keystore error: {0}")]
    Keystore(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("session is not ready: {0}")]
    NotReady(&'static str),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            // A rejected handshake carries the HTTP status, which lets the
            // caller tell an auth problem apart from a network problem.
            WsError::Http(response) => ClientError::Api {
                status: response.status().as_u16(),
                message: "websocket handshake rejected".into(),
            },
            other => ClientError::Transport(other.to_string()),
        }
    }
}
