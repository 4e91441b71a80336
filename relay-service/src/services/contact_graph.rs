//! Directed edge set recording which users have exchanged messages.

use crate::error::AppError;
use sqlx::{Pool, Postgres};
use uuid::Uuid;
use wire_schema::ContactDto;

pub struct ContactGraph;

impl ContactGraph {
    /// Insert the `(owner, peer)` edge iff absent.
    ///
    /// The conditional insert is atomic at the database, so two overlapping
    /// calls for the same pair leave exactly one row.
    pub async fn ensure_edge(
        db: &Pool<Postgres>,
        owner_id: Uuid,
        peer_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO contacts (user_id, contact_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, contact_id) DO NOTHING",
        )
        .bind(owner_id)
        .bind(peer_id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Conversation partners of `owner_id` with their current public keys.
    /// Unordered beyond insertion.
    pub async fn list_contacts_of(
        db: &Pool<Postgres>,
        owner_id: Uuid,
    ) -> Result<Vec<ContactDto>, AppError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT u.username, u.public_key \
             FROM users u \
             JOIN contacts c ON u.id = c.contact_id \
             WHERE c.user_id = $1",
        )
        .bind(owner_id)
        .fetch_all(db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(username, public_key)| ContactDto {
                username,
                public_key,
            })
            .collect())
    }
}
