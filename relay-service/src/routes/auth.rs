use axum::{extract::State, Json};

use crate::error::AppError;
use crate::services::key_directory::KeyDirectory;
use crate::state::AppState;
use wire_schema::{AuthRequest, AuthResponse, PublicKey};

/// `POST /api/auth` — the only unauthenticated call.
///
/// First authentication of a username creates the user record; a returning
/// username that supplies a key has its stored key overwritten without any
/// proof of possession of the previous private key (see the note on
/// `KeyDirectory::overwrite_key`). A token is issued in every success case.
pub async fn authenticate(
    State(state): State<AppState>,
    Json(body): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("username is required".into()));
    }

    match KeyDirectory::find_user(&state.db, username).await? {
        None => {
            let raw_key = body.public_key.as_deref().ok_or_else(|| {
                AppError::BadRequest("publicKey is required for new user registration".into())
            })?;
            let key = PublicKey::parse(raw_key)
                .map_err(|e| AppError::BadRequest(format!("publicKey: {e}")))?;
            KeyDirectory::create(&state.db, username, key.as_str()).await?;
            tracing::info!(%username, "registered new user");
        }
        Some(_) => {
            if let Some(raw_key) = body.public_key.as_deref() {
                let key = PublicKey::parse(raw_key)
                    .map_err(|e| AppError::BadRequest(format!("publicKey: {e}")))?;
                KeyDirectory::overwrite_key(&state.db, username, key.as_str()).await?;
            }
        }
    }

    let token = state.tokens.issue(username)?;
    Ok(Json(AuthResponse { token }))
}
