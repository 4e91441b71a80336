use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::services::key_directory::KeyDirectory;
use crate::state::AppState;
use wire_schema::{LookupKeyRequest, LookupKeyResponse, PublicKey, RegisterKeyRequest};

/// `POST /api/publickeys` — associate a public key with the caller.
pub async fn register_public_key(
    State(state): State<AppState>,
    Extension(AuthUser(username)): Extension<AuthUser>,
    Json(body): Json<RegisterKeyRequest>,
) -> Result<StatusCode, AppError> {
    let key = PublicKey::parse(&body.public_key)
        .map_err(|e| AppError::BadRequest(format!("publicKey: {e}")))?;
    KeyDirectory::overwrite_key(&state.db, &username, key.as_str()).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/getpublickey` — current key for a username, 404 if unknown.
/// Unknown username is a distinct outcome from any transport failure.
pub async fn get_public_key(
    State(state): State<AppState>,
    Json(body): Json<LookupKeyRequest>,
) -> Result<Json<LookupKeyResponse>, AppError> {
    if body.username.trim().is_empty() {
        return Err(AppError::BadRequest("username is required".into()));
    }
    let public_key = KeyDirectory::lookup(&state.db, &body.username).await?;
    Ok(Json(LookupKeyResponse { public_key }))
}
