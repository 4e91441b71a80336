use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::services::{contact_graph::ContactGraph, key_directory::KeyDirectory};
use crate::state::AppState;
use wire_schema::{AddContactRequest, ContactDto};

/// `GET /api/contacts` — conversation partners of the caller.
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(AuthUser(username)): Extension<AuthUser>,
) -> Result<Json<Vec<ContactDto>>, AppError> {
    let owner = KeyDirectory::find_user(&state.db, &username)
        .await?
        .ok_or(AppError::NotFound)?;
    let contacts = ContactGraph::list_contacts_of(&state.db, owner.id).await?;
    Ok(Json(contacts))
}

/// `POST /api/contacts/add` — insert the caller→contact edge if absent.
/// 404 when either side is unknown.
pub async fn add_contact(
    State(state): State<AppState>,
    Extension(AuthUser(username)): Extension<AuthUser>,
    Json(body): Json<AddContactRequest>,
) -> Result<StatusCode, AppError> {
    if body.contact_username.trim().is_empty() {
        return Err(AppError::BadRequest("contactUsername is required".into()));
    }

    let owner = KeyDirectory::find_user(&state.db, &username)
        .await?
        .ok_or(AppError::NotFound)?;
    let contact = KeyDirectory::find_user(&state.db, &body.contact_username)
        .await?
        .ok_or(AppError::NotFound)?;

    ContactGraph::ensure_edge(&state.db, owner.id, contact.id).await?;
    Ok(StatusCode::OK)
}
