use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use schoolbooks_auth::{AuthError, AuthzError};

/// Every body the API produces on failure: `{"error": "..."}`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": message.into(),
        })),
    )
        .into_response()
}

/// Success envelope for endpoints with nothing to return.
pub fn json_ok() -> Response {
    json_error(StatusCode::OK, "")
}

pub fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::CredentialMismatch | AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AuthError::DuplicateUsername(_) => StatusCode::CONFLICT,
        AuthError::TokenInvalid(_) => StatusCode::UNAUTHORIZED,
        AuthError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        AuthError::NotFound => StatusCode::NOT_FOUND,
        AuthError::Hashing(_) | AuthError::StoreUnavailable(_) | AuthError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Map an auth error to its conventional status. Internal causes are logged, never returned.
pub fn auth_error_to_response(err: AuthError) -> Response {
    let status = status_for(&err);
    log_if_internal(&err, status);
    json_error(status, err.client_message())
}

/// Like [`auth_error_to_response`] but with a fixed status, for endpoints whose
/// clients expect failures on a 200.
pub fn auth_error_with_status(err: AuthError, status: StatusCode) -> Response {
    log_if_internal(&err, status_for(&err));
    json_error(status, err.client_message())
}

pub fn forbidden(err: AuthzError) -> Response {
    tracing::info!(reason = %err, "request denied");
    json_error(StatusCode::FORBIDDEN, "user missing permissions")
}

pub fn bad_json(rejection: JsonRejection, status: StatusCode) -> Response {
    json_error(status, rejection.body_text())
}

fn log_if_internal(err: &AuthError, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
}
