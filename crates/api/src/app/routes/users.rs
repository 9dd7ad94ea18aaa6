use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use schoolbooks_auth::{
    AccessClaims, AuthError, Identity, Role, TokenCodec, authorize_school,
    authorize_self_or_sys_admin,
};
use schoolbooks_core::{SchoolId, UserId};

use crate::app::{dto, errors, services::AppServices};
use crate::authz::authorize_user_update;
use crate::middleware::{require_role, require_role_with_claims};

pub fn router(codec: &Arc<TokenCodec>) -> Router {
    Router::new()
        .route("/", require_role(codec, &[Role::SysAdmin], get(list_users)))
        .route("/me", require_role_with_claims(codec, &Role::ALL, get(get_me)))
        .route("/by-id", require_role_with_claims(codec, &Role::ALL, get(get_user_by_id)))
        .route(
            "/by-school",
            require_role_with_claims(codec, &[Role::Admin], get(get_users_by_school)),
        )
        .route("/update", require_role_with_claims(codec, &[Role::Admin], post(update_user)))
        .route("/password", require_role_with_claims(codec, &Role::ALL, post(change_password)))
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.store().list().await {
        Ok(users) => Json(users).into_response(),
        Err(e) => errors::auth_error_to_response(e.into()),
    }
}

pub async fn get_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(claims): Extension<AccessClaims>,
) -> Response {
    identity_response(&services, claims.user_id).await
}

pub async fn get_user_by_id(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(claims): Extension<AccessClaims>,
    Query(query): Query<dto::UserIdQuery>,
) -> Response {
    let user_id = match parse_id::<UserId>("userId", query.user_id.as_deref()) {
        Ok(id) => id,
        Err(res) => return res,
    };
    if let Err(e) = authorize_self_or_sys_admin(&claims, user_id) {
        return errors::forbidden(e);
    }
    identity_response(&services, user_id).await
}

pub async fn get_users_by_school(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(claims): Extension<AccessClaims>,
    Query(query): Query<dto::SchoolIdQuery>,
) -> Response {
    let school_id = match parse_id::<SchoolId>("schoolId", query.school_id.as_deref()) {
        Ok(id) => id,
        Err(res) => return res,
    };
    if let Err(e) = authorize_school(&claims, school_id) {
        return errors::forbidden(e);
    }
    match services.store().list_by_school(school_id).await {
        Ok(users) => Json(users).into_response(),
        Err(e) => errors::auth_error_to_response(e.into()),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(claims): Extension<AccessClaims>,
    body: Result<Json<dto::UpdateUserRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::bad_json(rejection, StatusCode::BAD_REQUEST),
    };

    let username = body.username.trim();
    if username.is_empty() {
        return errors::auth_error_to_response(AuthError::invalid_input("username must not be empty"));
    }
    if body.roles.is_empty() {
        return errors::auth_error_to_response(AuthError::invalid_input("roles must not be empty"));
    }

    let current = match services.store().identity_by_id(body.id).await {
        Ok(Some(identity)) => identity,
        Ok(None) => return errors::auth_error_to_response(AuthError::NotFound),
        Err(e) => return errors::auth_error_to_response(e.into()),
    };

    let requested = Identity {
        id: body.id,
        school_id: body.school_id,
        username: username.to_string(),
        roles: body.roles,
        locale: body.locale,
    };
    if let Err(e) = authorize_user_update(&claims, &current, &requested) {
        return errors::forbidden(e);
    }

    match services.store().update_identity(&requested).await {
        Ok(()) => {
            tracing::info!(user_id = %requested.id, by = %claims.user_id, "user updated");
            Json(requested).into_response()
        }
        Err(e) => errors::auth_error_to_response(e.into()),
    }
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(claims): Extension<AccessClaims>,
    body: Result<Json<dto::PasswordUpdateRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::bad_json(rejection, StatusCode::BAD_REQUEST),
    };

    match services
        .sessions()
        .change_password(claims.user_id, &body.old_password, &body.new_password)
        .await
    {
        Ok(()) => errors::json_ok(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

async fn identity_response(services: &AppServices, user_id: UserId) -> Response {
    match services.store().identity_by_id(user_id).await {
        Ok(Some(identity)) => Json(identity).into_response(),
        Ok(None) => errors::auth_error_to_response(AuthError::NotFound),
        Err(e) => errors::auth_error_to_response(e.into()),
    }
}

fn parse_id<T: FromStr>(name: &str, raw: Option<&str>) -> Result<T, Response> {
    let raw = raw.ok_or_else(|| {
        errors::json_error(StatusCode::BAD_REQUEST, format!("missing query parameter {name}"))
    })?;
    raw.parse::<T>().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, format!("invalid {name}: {raw}"))
    })
}
