use crate::state::AppState;
use axum::middleware;
use axum::{
    routing::{get, post},
    Router,
};

pub mod auth;
use auth::authenticate;
pub mod keys;
use keys::{get_public_key, register_public_key};
pub mod contacts;
use contacts::{add_contact, list_contacts};
pub mod messages;
use messages::get_history;

use crate::websocket::handlers::ws_handler;

pub fn build_router(state: AppState) -> Router {
    // Token issuance and liveness are reachable without a token. The
    // websocket route authenticates in its own handshake because browser
    // clients cannot attach headers to an upgrade request.
    let public = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/auth", post(authenticate))
        .route("/api/ws", get(ws_handler));

    // Everything else requires a verified bearer token.
    let secured = Router::new()
        .route("/api/publickeys", post(register_public_key))
        .route("/api/getpublickey", post(get_public_key))
        .route("/api/contacts", get(list_contacts))
        .route("/api/contacts/add", post(add_contact))
        .route("/api/messages", get(get_history))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    let router = public.merge(secured).with_state(state);

    crate::middleware::with_defaults(router)
}
