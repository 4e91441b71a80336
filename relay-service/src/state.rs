use crate::{config::Config, presence::PresenceStore, security::token::TokenService};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub presence: Arc<dyn PresenceStore>,
    pub tokens: Arc<TokenService>,
    pub config: Arc<Config>,
}
