//! Login, logout, registration and refresh.
//!
//! Login and registration answer failures with a 200 and an `{"error"}` body;
//! refresh answers every failure with a 401.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
};

use crate::app::{dto, errors, services::AppServices};
use crate::cookies;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register", post(register))
        .route("/refresh", get(refresh))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CredentialsRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::bad_json(rejection, StatusCode::OK),
    };

    let session = match services.sessions().login(&body.username, &body.password).await {
        Ok(session) => session,
        Err(e) => return errors::auth_error_with_status(e, StatusCode::OK),
    };

    let max_age = services.codec().config().refresh_token_ttl;
    let cookie = cookies::refresh_cookie(&session.refresh_token, max_age);
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(dto::AccessTokenResponse {
            access_token: session.access_token,
        }),
    )
        .into_response()
}

/// Tokens are stateless; logging out only asks the browser to drop the cookie.
pub async fn logout() -> Response {
    (
        AppendHeaders([(SET_COOKIE, cookies::cleared_refresh_cookie())]),
        errors::json_ok(),
    )
        .into_response()
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CredentialsRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::bad_json(rejection, StatusCode::OK),
    };

    match services.sessions().register(&body.username, &body.password).await {
        Ok(_) => errors::json_ok(),
        Err(e) => errors::auth_error_with_status(e, StatusCode::OK),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = cookies::refresh_token_from_headers(&headers) else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "no refresh token");
    };

    match services.sessions().refresh(token).await {
        Ok(access_token) => Json(dto::AccessTokenResponse { access_token }).into_response(),
        Err(e) => errors::auth_error_with_status(e, StatusCode::UNAUTHORIZED),
    }
}
