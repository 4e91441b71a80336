//! Full-stack scenario: two client sessions against a live relay instance.
//!
//! Needs a Postgres pointed at by `DATABASE_URL`:
//!
//! ```sh
//! DATABASE_URL=postgres://... cargo test -p relay-service --test scenario_test -- --ignored
//! ```

use std::sync::Arc;
use std::time::Duration;

use client_core::session::{MessageBody, OutboundMessage, Session, SessionEvent, SessionState};
use client_core::MemoryKeystore;
use relay_service::config::Config;
use relay_service::presence::{InMemoryPresence, PresenceStore};
use relay_service::security::token::TokenService;
use relay_service::state::AppState;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::timeout;
use uuid::Uuid;

const EVENT_WAIT: Duration = Duration::from_secs(5);

async fn spawn_relay() -> (String, String, Pool<Postgres>) {
    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL env var required for tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("failed to connect to DATABASE_URL");
    relay_service::migrations::run_all(&pool)
        .await
        .expect("migrations failed");

    let presence: Arc<dyn PresenceStore> = Arc::new(InMemoryPresence::new());
    let state = AppState {
        db: pool.clone(),
        presence,
        tokens: Arc::new(TokenService::new("scenario-test-secret")),
        config: Arc::new(Config {
            database_url: db_url,
            token_secret: "scenario-test-secret".into(),
            port: 0,
        }),
    };
    let app = relay_service::routes::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind failed");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), format!("ws://{addr}"), pool)
}

fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

async fn cleanup_users(pool: &Pool<Postgres>, usernames: &[&str]) {
    for username in usernames {
        let _ = sqlx::query(
            "DELETE FROM messages WHERE sender_id IN (SELECT id FROM users WHERE username = $1) \
             OR recipient_id IN (SELECT id FROM users WHERE username = $1)",
        )
        .bind(username)
        .execute(pool)
        .await;
        let _ = sqlx::query(
            "DELETE FROM contacts WHERE user_id IN (SELECT id FROM users WHERE username = $1) \
             OR contact_id IN (SELECT id FROM users WHERE username = $1)",
        )
        .bind(username)
        .execute(pool)
        .await;
        let _ = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(pool)
            .await;
    }
}

#[tokio::test]
#[ignore]
async fn two_parties_exchange_messages_online_and_offline() {
    let (http_url, ws_url, pool) = spawn_relay().await;
    let alice_name = unique_name("alice");
    let bob_name = unique_name("bob");

    // Both parties register keypairs and authenticate.
    let mut alice = Session::new(MemoryKeystore::new(), http_url.clone(), ws_url.clone());
    alice.login(&alice_name).await.expect("alice login");
    assert_eq!(alice.state(), SessionState::Ready);
    let alice = Arc::new(alice);

    let mut bob = Session::new(MemoryKeystore::new(), http_url.clone(), ws_url.clone());
    bob.login(&bob_name).await.expect("bob login");
    let bob = Arc::new(bob);

    // Bob goes online.
    let (bob_outbox_tx, bob_outbox_rx) = unbounded_channel::<OutboundMessage>();
    let (bob_events_tx, mut bob_events_rx) = unbounded_channel::<SessionEvent>();
    let bob_task = {
        let bob = bob.clone();
        tokio::spawn(async move { bob.run_realtime(bob_outbox_rx, bob_events_tx).await })
    };

    // Alice goes online and sends "hi" while Bob is connected.
    let (alice_outbox_tx, alice_outbox_rx) = unbounded_channel::<OutboundMessage>();
    let (alice_events_tx, mut alice_events_rx) = unbounded_channel::<SessionEvent>();
    let alice_task = {
        let alice = alice.clone();
        tokio::spawn(async move { alice.run_realtime(alice_outbox_rx, alice_events_tx).await })
    };
    // Give both realtime registrations a moment to land.
    tokio::time::sleep(Duration::from_millis(300)).await;

    alice_outbox_tx
        .send(OutboundMessage {
            to: bob_name.clone(),
            text: "hi".into(),
        })
        .expect("queue send");

    let event = timeout(EVENT_WAIT, bob_events_rx.recv())
        .await
        .expect("bob should receive an event")
        .expect("events channel open");
    match event {
        SessionEvent::MessageReceived { from, body } => {
            assert_eq!(from, alice_name);
            assert_eq!(body, MessageBody::Plaintext("hi".into()));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let alice_view = alice
        .fetch_conversation(&bob_name)
        .await
        .expect("alice history");
    assert_eq!(alice_view.len(), 1);
    assert_eq!(alice_view[0].body, MessageBody::Plaintext("hi".into()));

    // Alice goes offline.
    drop(alice_outbox_tx);
    alice_task
        .await
        .expect("alice task join")
        .expect("alice realtime clean shutdown");

    // Bob sends "hello" while Alice is offline: no realtime event can reach
    // her, but the message is durable.
    bob_outbox_tx
        .send(OutboundMessage {
            to: alice_name.clone(),
            text: "hello".into(),
        })
        .expect("queue send");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(
        alice_events_rx.try_recv().is_err(),
        "offline alice must not see realtime events"
    );

    // On Alice's next history fetch, "hello" is present and decrypts.
    let alice_view = alice
        .fetch_conversation(&bob_name)
        .await
        .expect("alice history after reconnect");
    assert_eq!(alice_view.len(), 2);
    assert_eq!(alice_view[1].from, bob_name);
    assert_eq!(alice_view[1].body, MessageBody::Plaintext("hello".into()));

    // Each party lists the other exactly once.
    let alice_contacts = alice.contacts().await.expect("alice contacts");
    assert_eq!(
        alice_contacts
            .iter()
            .filter(|c| c.username == bob_name)
            .count(),
        1
    );
    let bob_contacts = bob.contacts().await.expect("bob contacts");
    assert_eq!(
        bob_contacts
            .iter()
            .filter(|c| c.username == alice_name)
            .count(),
        1
    );

    drop(bob_outbox_tx);
    bob_task
        .await
        .expect("bob task join")
        .expect("bob realtime clean shutdown");

    cleanup_users(&pool, &[&alice_name, &bob_name]).await;
}
