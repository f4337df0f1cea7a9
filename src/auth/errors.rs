use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Invalid authorization header format")]
    InvalidAuthHeader,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token expired")]
    TokenExpired,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User account is inactive")]
    UserInactive,
    #[error("Email address has not been verified")]
    EmailNotVerified,
    #[error("This account signs in with Google")]
    PasswordNotSet,
    #[error("Email already exists")]
    EmailExists,
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    Forbidden(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken(_)
            | AuthError::TokenExpired
            | AuthError::UserNotFound
            | AuthError::InvalidCredentials
            | AuthError::UserInactive
            | AuthError::PasswordNotSet => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions | AuthError::EmailNotVerified | AuthError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            AuthError::EmailExists => StatusCode::CONFLICT,
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Token and database details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader => {
                "Missing or invalid authorization header".to_string()
            }
            AuthError::InvalidToken(_) | AuthError::TokenExpired => "Invalid or expired token".to_string(),
            AuthError::DatabaseError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.public_message(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::MissingAuthHeader.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::PasswordNotSet.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::EmailNotVerified.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::InsufficientPermissions.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::EmailExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::DatabaseError("pool timed out".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        assert_eq!(
            AuthError::InvalidToken("InvalidSignature".to_string()).public_message(),
            "Invalid or expired token"
        );
        assert_eq!(
            AuthError::DatabaseError("connection refused".to_string()).public_message(),
            "Internal server error"
        );
        assert_eq!(
            AuthError::Forbidden("Setup already completed".to_string()).public_message(),
            "Setup already completed"
        );
    }
}
