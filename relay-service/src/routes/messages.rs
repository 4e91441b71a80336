use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::services::message_store::MessageStore;
use crate::state::AppState;
use wire_schema::MessageDto;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub with: String,
}

/// `GET /api/messages?with=X` — both directions of the conversation between
/// the caller and `X`, ascending by timestamp. An unknown peer yields an
/// empty list.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(AuthUser(username)): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageDto>>, AppError> {
    if query.with.trim().is_empty() {
        return Err(AppError::BadRequest("with parameter is required".into()));
    }
    let history = MessageStore::history(&state.db, &username, &query.with).await?;
    Ok(Json(history))
}
