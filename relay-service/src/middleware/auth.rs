use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;

/// Username extracted from a verified bearer token, inserted into request
/// extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// Middleware to extract the bearer token and attach the verified username.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, AppError> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    // Parse Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    // Verify token and extract the bound username
    let username = state.tokens.verify(token)?;

    req.extensions_mut().insert(AuthUser(username));

    Ok(next.run(req).await)
}
