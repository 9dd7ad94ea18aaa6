use thiserror::Error;

use crate::{AuthzError, StoreError, TokenError};

/// Errors surfaced by the auth core.
///
/// `Display` may carry internal detail and is meant for logs; use
/// [`AuthError::client_message`] for anything sent back to a caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Wrong password or unknown user; the two are indistinguishable.
    #[error("invalid credentials")]
    CredentialMismatch,

    #[error("a user with the name {0} already exists")]
    DuplicateUsername(String),

    /// Bad signature, malformed, expired or wrong-shape token.
    #[error("invalid token: {0}")]
    TokenInvalid(#[from] TokenError),

    #[error("permission denied: {0}")]
    PermissionDenied(#[from] AuthzError),

    #[error("user not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Flat, detail-free message suitable for a response body.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::CredentialMismatch => "invalid credentials".to_string(),
            AuthError::DuplicateUsername(_) | AuthError::InvalidInput(_) => self.to_string(),
            AuthError::TokenInvalid(_) => "invalid token".to_string(),
            AuthError::PermissionDenied(_) => "user missing permissions".to_string(),
            AuthError::NotFound => "user not found".to_string(),
            AuthError::Hashing(_) | AuthError::StoreUnavailable(_) | AuthError::Internal(_) => {
                "internal server error".to_string()
            }
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateUsername(name) => AuthError::DuplicateUsername(name),
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_hide_internals() {
        let err = AuthError::StoreUnavailable("connection refused on 10.0.0.3".to_string());
        assert_eq!(err.client_message(), "internal server error");

        let err = AuthError::from(TokenError::InvalidSignature);
        assert_eq!(err.client_message(), "invalid token");
        assert_eq!(
            AuthError::from(TokenError::Expired).client_message(),
            err.client_message()
        );
    }

    #[test]
    fn store_errors_translate() {
        assert_eq!(
            AuthError::from(StoreError::DuplicateUsername("x".to_string())),
            AuthError::DuplicateUsername("x".to_string())
        );
        assert_eq!(
            AuthError::DuplicateUsername("x".to_string()).client_message(),
            "a user with the name x already exists"
        );
    }
}
