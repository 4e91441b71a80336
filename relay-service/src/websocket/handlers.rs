//! Real-time channel: one task per connection.
//!
//! A connection moves Connecting → Authenticated (token verified at
//! handshake) → Active (registered in the presence store) → Closed. A
//! reconnect is a brand-new connection that replaces the registry entry;
//! there is no server-side reconnect or backoff logic.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::presence::RouteOutcome;
use crate::services::{
    contact_graph::ContactGraph, key_directory::KeyDirectory, message_store::MessageStore,
};
use crate::state::AppState;
use wire_schema::{validate, ClientEvent, MessageNonce, ServerEvent};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Token validation at handshake. Rejecting the upgrade with 401 gives the
/// client a reason it can distinguish from a transport failure, so it knows
/// to re-authenticate instead of blindly reconnecting.
fn authenticate_handshake(
    state: &AppState,
    params: &WsParams,
    headers: &HeaderMap,
) -> Result<String, AppError> {
    let token = params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    });

    match token {
        None => Err(AppError::Unauthorized),
        Some(t) => state.tokens.verify(&t),
    }
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let username = match authenticate_handshake(&state, &params, &headers) {
        Ok(username) => username,
        Err(_) => {
            warn!("websocket handshake rejected: invalid or missing token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(state, username, socket))
}

async fn handle_socket(state: AppState, username: String, socket: WebSocket) {
    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = unbounded_channel();

    // Last-write-wins: a second connection for the same username takes the
    // slot and the old one is left to drain and close on its own.
    state.presence.register(&username, connection_id, tx).await;
    info!(%username, %connection_id, "connection active");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Payloads routed to this user
            maybe = rx.recv() => {
                match maybe {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Frames from the client
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(txt))) => {
                        match serde_json::from_str::<ClientEvent>(txt.as_str()) {
                            Ok(evt) => {
                                if let Err(e) = handle_client_event(&state, &username, evt).await {
                                    warn!(%username, error = %e, "inbound event failed");
                                }
                            }
                            Err(_) => debug!(%username, "ignoring malformed frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // Guarded by connection id: if a newer connection already replaced this
    // one, its registry entry stays.
    state.presence.unregister(&username, connection_id).await;
    info!(%username, %connection_id, "connection closed");
}

async fn handle_client_event(
    state: &AppState,
    sender_name: &str,
    evt: ClientEvent,
) -> Result<(), AppError> {
    match evt {
        ClientEvent::MessageSend {
            to,
            ciphertext,
            nonce,
        } => relay_message(state, sender_name, &to, ciphertext, nonce).await,
    }
}

/// Store-then-route pipeline for one message. Delivery is fire-and-forget:
/// the durable append is the source of truth and an offline recipient gets
/// the message on its next history fetch.
pub async fn relay_message(
    state: &AppState,
    from: &str,
    to: &str,
    ciphertext: String,
    nonce: String,
) -> Result<(), AppError> {
    MessageNonce::parse(&nonce).map_err(|e| AppError::BadRequest(format!("nonce: {e}")))?;
    validate::validate_ciphertext(&ciphertext)
        .map_err(|e| AppError::BadRequest(format!("ciphertext: {e}")))?;

    let sender = KeyDirectory::find_user(&state.db, from)
        .await?
        .ok_or(AppError::NotFound)?;

    let recipient = match KeyDirectory::find_user(&state.db, to).await? {
        Some(user) => user,
        None => {
            // Unknown recipient: drop silently, mirroring the REST 404 being
            // the only place this is surfaced.
            warn!(%from, %to, "message to unknown recipient dropped");
            return Ok(());
        }
    };

    MessageStore::append(&state.db, sender.id, recipient.id, &ciphertext, &nonce).await?;

    ContactGraph::ensure_edge(&state.db, sender.id, recipient.id).await?;
    ContactGraph::ensure_edge(&state.db, recipient.id, sender.id).await?;

    let event = ServerEvent::MessageReceive {
        from: from.to_string(),
        ciphertext,
        nonce,
    };
    let payload = serde_json::to_string(&event).map_err(|_| AppError::Internal)?;

    match state.presence.route_to(to, Message::Text(payload)).await {
        RouteOutcome::Delivered => debug!(%from, %to, "message pushed to live connection"),
        RouteOutcome::Absent => debug!(%from, %to, "recipient offline, message stored"),
    }

    Ok(())
}
