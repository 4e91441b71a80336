//! Append-only store of encrypted messages between user pairs.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;
use wire_schema::MessageDto;

pub struct MessageStore;

impl MessageStore {
    /// Durably append one message; returns the database timestamp assigned
    /// to it. Rows are never updated or deleted.
    pub async fn append(
        db: &Pool<Postgres>,
        sender_id: Uuid,
        recipient_id: Uuid,
        ciphertext: &str,
        nonce: &str,
    ) -> Result<DateTime<Utc>, AppError> {
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO messages (id, sender_id, recipient_id, ciphertext, nonce) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING created_at",
        )
        .bind(Uuid::new_v4())
        .bind(sender_id)
        .bind(recipient_id)
        .bind(ciphertext)
        .bind(nonce)
        .fetch_one(db)
        .await?;
        Ok(created_at)
    }

    /// Both directions of the pair conversation, ascending by timestamp.
    /// No pagination; the full conversation is returned.
    pub async fn history(
        db: &Pool<Postgres>,
        username_a: &str,
        username_b: &str,
    ) -> Result<Vec<MessageDto>, AppError> {
        let rows = sqlx::query(
            r#"SELECT sender.username AS sender,
                      recipient.username AS recipient,
                      m.ciphertext,
                      m.nonce,
                      m.created_at
               FROM messages m
               JOIN users sender ON m.sender_id = sender.id
               JOIN users recipient ON m.recipient_id = recipient.id
               WHERE (sender.username = $1 AND recipient.username = $2)
                  OR (sender.username = $2 AND recipient.username = $1)
               ORDER BY m.created_at ASC, m.id ASC"#,
        )
        .bind(username_a)
        .bind(username_b)
        .fetch_all(db)
        .await?;

        let out = rows
            .into_iter()
            .map(|r| {
                let created_at: DateTime<Utc> = r.get("created_at");
                MessageDto {
                    sender: r.get("sender"),
                    recipient: r.get("recipient"),
                    ciphertext: r.get("ciphertext"),
                    nonce: r.get("nonce"),
                    created_at: created_at.to_rfc3339(),
                }
            })
            .collect();
        Ok(out)
    }
}
