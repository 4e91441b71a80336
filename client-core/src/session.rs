//! Connection state machine and event-driven message flow.
//!
//! A session moves `LoggedOut → Authenticating → Ready`. Once `Ready`, the
//! realtime loop owns the WebSocket: sends drain from an outbox channel,
//! receives surface as [`SessionEvent`]s. A dropped connection is retried
//! with a fixed delay and re-registers by simply connecting again; the relay
//! keeps at most one live connection per username, so the newest one wins.

use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::engine::CryptoEngine;
use crate::error::{ClientError, ClientResult};
use crate::keystore::Keystore;
use crate::ws::WsConnection;
use wire_schema::{ClientEvent, ContactDto, MessageDto, ServerEvent};

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Placeholder shown for a self-authored message whose plaintext has left
/// the outbox cache.
const SENT_MESSAGE_PLACEHOLDER: &str = "(sent message)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Authenticating,
    Ready,
}

/// Resolved message content. `Undecryptable` renders as an error state in
/// place of the message; it never aborts the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Plaintext(String),
    Undecryptable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    pub from: String,
    pub to: String,
    pub body: MessageBody,
    pub time: String,
}

/// Events surfaced to the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    MessageReceived { from: String, body: MessageBody },
    Disconnected,
}

/// A queued send. Failed sends are not retried; durable delivery is the
/// relay's job once the frame is accepted.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub to: String,
    pub text: String,
}

pub struct Session<K: Keystore> {
    engine: CryptoEngine<K>,
    api: ApiClient,
    ws_url: String,
    state: SessionState,
    username: Option<String>,
}

impl<K: Keystore> Session<K> {
    pub fn new(store: K, http_base_url: impl Into<String>, ws_base_url: impl Into<String>) -> Self {
        Self {
            engine: CryptoEngine::new(store),
            api: ApiClient::new(http_base_url),
            ws_url: ws_base_url.into(),
            state: SessionState::LoggedOut,
            username: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn engine(&self) -> &CryptoEngine<K> {
        &self.engine
    }

    fn require_ready(&self) -> ClientResult<&str> {
        if self.state != SessionState::Ready {
            return Err(ClientError::NotReady("login first"));
        }
        self.username
            .as_deref()
            .ok_or(ClientError::NotReady("login first"))
    }

    /// Authenticate as `username`: make sure a keypair exists, trade the
    /// public key for a token, and re-register the key.
    pub async fn login(&mut self, username: &str) -> ClientResult<()> {
        self.state = SessionState::Authenticating;
        match self.try_login(username).await {
            Ok(()) => {
                self.username = Some(username.to_string());
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::LoggedOut;
                Err(e)
            }
        }
    }

    async fn try_login(&mut self, username: &str) -> ClientResult<()> {
        let public_key = self.engine.ensure_keypair()?.to_base64();
        self.api.authenticate(username, Some(&public_key)).await?;
        self.api.register_public_key(&public_key).await?;
        Ok(())
    }

    /// Conversation partners with their current public keys.
    pub async fn contacts(&self) -> ClientResult<Vec<ContactDto>> {
        self.require_ready()?;
        self.api.contacts().await
    }

    pub async fn add_contact(&self, username: &str) -> ClientResult<()> {
        self.require_ready()?;
        self.api.add_contact(username).await
    }

    /// Peer public key, from the local cache or the directory on miss.
    pub async fn peer_public_key(&self, username: &str) -> ClientResult<String> {
        self.require_ready()?;
        if let Some(cached) = self.engine.cached_peer_key(username)? {
            return Ok(cached);
        }
        let key = self
            .api
            .get_public_key(username)
            .await?
            .ok_or(ClientError::Api {
                status: 404,
                message: format!("user \"{username}\" not found"),
            })?;
        self.engine.cache_peer_key(username, &key)?;
        Ok(key)
    }

    /// Fetch and resolve the conversation with `with`, ascending by time.
    /// Received entries are decrypted; self-authored entries come from the
    /// outbox cache.
    pub async fn fetch_conversation(&self, with: &str) -> ClientResult<Vec<DecryptedMessage>> {
        let me = self.require_ready()?.to_string();
        let history = self.api.history(with).await?;

        let mut out = Vec::with_capacity(history.len());
        for entry in history {
            let resolved = if entry.recipient == me {
                let peer_key = self.peer_public_key(&entry.sender).await?;
                resolve_history_entry(&self.engine, &me, &peer_key, &entry)
            } else {
                resolve_history_entry(&self.engine, &me, "", &entry)
            };
            out.push(resolved);
        }
        Ok(out)
    }

    /// Drive the realtime channel until the outbox closes. Reconnects with a
    /// fixed delay on transport failures; an auth rejection is returned to
    /// the caller so it can re-authenticate instead of looping.
    pub async fn run_realtime(
        &self,
        mut outbox: UnboundedReceiver<OutboundMessage>,
        events: UnboundedSender<SessionEvent>,
    ) -> ClientResult<()> {
        self.require_ready()?;
        let token = self
            .api
            .token()
            .ok_or(ClientError::NotReady("not authenticated"))?
            .to_string();

        loop {
            let mut conn = match WsConnection::connect(&self.ws_url, &token).await {
                Ok(conn) => conn,
                Err(ClientError::Api { status: 401, .. }) => {
                    return Err(ClientError::Api {
                        status: 401,
                        message: "realtime handshake rejected, re-authentication required".into(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "realtime connect failed, retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            };
            debug!("realtime channel connected");

            loop {
                tokio::select! {
                    queued = outbox.recv() => {
                        match queued {
                            Some(message) => {
                                // One attempt per message; a failed send is
                                // surfaced in the log and dropped.
                                if let Err(e) = self.send_message(&mut conn, message).await {
                                    warn!(error = %e, "send failed");
                                }
                            }
                            None => {
                                let _ = conn.close().await;
                                return Ok(());
                            }
                        }
                    }
                    incoming = conn.next_event() => {
                        match incoming {
                            Ok(Some(ServerEvent::MessageReceive { from, ciphertext, nonce })) => {
                                let body = self.resolve_incoming(&from, &ciphertext, &nonce).await;
                                if events.send(SessionEvent::MessageReceived { from, body }).is_err() {
                                    return Ok(());
                                }
                            }
                            Ok(None) | Err(_) => break,
                        }
                    }
                }
            }

            let _ = events.send(SessionEvent::Disconnected);
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn send_message(
        &self,
        conn: &mut WsConnection,
        message: OutboundMessage,
    ) -> ClientResult<()> {
        let peer_key = self.peer_public_key(&message.to).await?;
        let (ciphertext, nonce) = self.engine.encrypt_for(&peer_key, &message.text)?;
        conn.send(&ClientEvent::MessageSend {
            to: message.to,
            ciphertext,
            nonce,
        })
        .await
    }

    async fn resolve_incoming(&self, from: &str, ciphertext: &str, nonce: &str) -> MessageBody {
        let peer_key = match self.peer_public_key(from).await {
            Ok(key) => key,
            Err(e) => {
                warn!(%from, error = %e, "sender key unavailable");
                return MessageBody::Undecryptable;
            }
        };
        match self.engine.decrypt_from(&peer_key, ciphertext, nonce) {
            Ok(text) => MessageBody::Plaintext(text),
            Err(_) => MessageBody::Undecryptable,
        }
    }
}

/// Resolve one history entry into displayable form.
///
/// Messages addressed to `me` are decrypted with the sender's public key;
/// self-authored messages are looked up in the outbox cache (with a
/// placeholder once the cache has been cleared). Decryption failure maps to
/// `Undecryptable`, never to an error.
pub fn resolve_history_entry<K: Keystore>(
    engine: &CryptoEngine<K>,
    me: &str,
    sender_public_b64: &str,
    entry: &MessageDto,
) -> DecryptedMessage {
    let body = if entry.recipient == me {
        match engine.decrypt_from(sender_public_b64, &entry.ciphertext, &entry.nonce) {
            Ok(text) => MessageBody::Plaintext(text),
            Err(_) => MessageBody::Undecryptable,
        }
    } else {
        match engine.cached_sent_plaintext(&entry.nonce) {
            Ok(Some(text)) => MessageBody::Plaintext(text),
            _ => MessageBody::Plaintext(SENT_MESSAGE_PLACEHOLDER.to_string()),
        }
    };

    DecryptedMessage {
        from: entry.sender.clone(),
        to: entry.recipient.clone(),
        body,
        time: entry.created_at.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeystore;

    #[test]
    fn new_session_starts_logged_out() {
        let session = Session::new(MemoryKeystore::new(), "http://localhost:4000", "ws://localhost:4000");
        assert_eq!(session.state(), SessionState::LoggedOut);
        assert!(matches!(
            session.require_ready(),
            Err(ClientError::NotReady(_))
        ));
    }

    #[test]
    fn received_entry_is_decrypted_with_sender_key() {
        let alice = CryptoEngine::new(MemoryKeystore::new());
        let alice_public = alice.ensure_keypair().unwrap();
        let bob = CryptoEngine::new(MemoryKeystore::new());
        let bob_public = bob.ensure_keypair().unwrap();

        let (ciphertext, nonce) = alice.encrypt_for(&bob_public.to_base64(), "hi bob").unwrap();
        let entry = MessageDto {
            sender: "alice".into(),
            recipient: "bob".into(),
            ciphertext,
            nonce,
            created_at: "2026-01-01T00:00:00Z".into(),
        };

        let resolved = resolve_history_entry(&bob, "bob", &alice_public.to_base64(), &entry);
        assert_eq!(resolved.body, MessageBody::Plaintext("hi bob".into()));
    }

    #[test]
    fn tampered_entry_resolves_to_undecryptable() {
        let alice = CryptoEngine::new(MemoryKeystore::new());
        let alice_public = alice.ensure_keypair().unwrap();
        let bob = CryptoEngine::new(MemoryKeystore::new());
        let bob_public = bob.ensure_keypair().unwrap();

        let (ciphertext, nonce) = alice.encrypt_for(&bob_public.to_base64(), "hi bob").unwrap();
        let entry = MessageDto {
            sender: "alice".into(),
            recipient: "bob".into(),
            // Valid base64, wrong bytes
            ciphertext: format!("AAAA{}", &ciphertext[4..]),
            nonce,
            created_at: "2026-01-01T00:00:00Z".into(),
        };

        let resolved = resolve_history_entry(&bob, "bob", &alice_public.to_base64(), &entry);
        assert_eq!(resolved.body, MessageBody::Undecryptable);
    }

    #[test]
    fn sent_entry_comes_from_outbox_cache() {
        let alice = CryptoEngine::new(MemoryKeystore::new());
        alice.ensure_keypair().unwrap();
        let bob = CryptoEngine::new(MemoryKeystore::new());
        let bob_public = bob.ensure_keypair().unwrap();

        let (ciphertext, nonce) = alice.encrypt_for(&bob_public.to_base64(), "my words").unwrap();
        let entry = MessageDto {
            sender: "alice".into(),
            recipient: "bob".into(),
            ciphertext,
            nonce,
            created_at: "2026-01-01T00:00:00Z".into(),
        };

        let resolved = resolve_history_entry(&alice, "alice", "", &entry);
        assert_eq!(resolved.body, MessageBody::Plaintext("my words".into()));
    }

    #[test]
    fn sent_entry_without_cache_uses_placeholder() {
        let alice = CryptoEngine::new(MemoryKeystore::new());
        alice.ensure_keypair().unwrap();

        let entry = MessageDto {
            sender: "alice".into(),
            recipient: "bob".into(),
            ciphertext: "YWJj".into(),
            nonce: "bm8tc3VjaC1ub25jZQ==".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
        };

        let resolved = resolve_history_entry(&alice, "alice", "", &entry);
        assert_eq!(
            resolved.body,
            MessageBody::Plaintext(SENT_MESSAGE_PLACEHOLDER.into())
        );
    }
}
