use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use wire_schema::error::{error_codes, error_types};
use wire_schema::ErrorResponse;

/// Map domain errors to HTTP responses.
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::BadRequest(_) => (error_types::VALIDATION_ERROR, error_codes::INVALID_REQUEST),
        AppError::Unauthorized => (
            error_types::AUTHENTICATION_ERROR,
            error_codes::INVALID_CREDENTIALS,
        ),
        AppError::NotFound => (error_types::NOT_FOUND_ERROR, error_codes::USER_NOT_FOUND),
        AppError::Database(_) => (error_types::SERVER_ERROR, error_codes::DATABASE_ERROR),
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => (
            error_types::SERVER_ERROR,
            error_codes::INTERNAL_SERVER_ERROR,
        ),
    };

    // Storage failures are fatal to the request and logged here; the details
    // stay out of the response body.
    let message = match err {
        AppError::Database(e) => {
            tracing::error!(error = %e, "database error");
            "database error".to_string()
        }
        other => other.to_string(),
    };

    (
        status,
        ErrorResponse::new(&message, status.as_u16(), error_type, code),
    )
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, response) = map_error(&err);
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400() {
        let (status, body) = map_error(&AppError::BadRequest("username is required".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_type, error_types::VALIDATION_ERROR);
        assert!(body.message.contains("username is required"));
    }

    #[test]
    fn auth_errors_map_to_401() {
        let (status, body) = map_error(&AppError::Unauthorized);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error_type, error_types::AUTHENTICATION_ERROR);
    }

    #[test]
    fn database_errors_hide_details() {
        let (status, body) = map_error(&AppError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "database error");
    }
}
