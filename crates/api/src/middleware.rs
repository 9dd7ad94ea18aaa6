//! Role gates in front of protected handlers.
//!
//! A gate extracts the bearer token, verifies it as an access token and checks
//! the caller's roles against the route's allow-list before the handler runs.
//! Gates `with_claims` also hand the verified [`AccessClaims`] to the handler
//! through request extensions.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    routing::MethodRouter,
};

use schoolbooks_auth::{AccessClaims, Role, TokenCodec, authorize_roles};

use crate::app::errors::json_error;

pub const NO_ACCESS_TOKEN: &str = "no access token";
pub const INVALID_ACCESS_TOKEN: &str = "invalid access token";
pub const MISSING_PERMISSIONS: &str = "user missing permissions";

#[derive(Clone)]
pub struct RoleGate {
    codec: Arc<TokenCodec>,
    allowed: Arc<[Role]>,
    forward_claims: bool,
}

impl RoleGate {
    pub fn new(codec: Arc<TokenCodec>, allowed: &[Role]) -> Self {
        Self {
            codec,
            allowed: allowed.into(),
            forward_claims: false,
        }
    }

    pub fn with_claims(mut self) -> Self {
        self.forward_claims = true;
        self
    }

    /// Wrap `route` so it only runs for callers holding one of the allowed roles.
    pub fn wrap(self, route: MethodRouter) -> MethodRouter {
        route.route_layer(axum::middleware::from_fn_with_state(self, role_gate))
    }
}

/// Gate a route; the handler does not see the claims.
pub fn require_role(codec: &Arc<TokenCodec>, allowed: &[Role], route: MethodRouter) -> MethodRouter {
    RoleGate::new(codec.clone(), allowed).wrap(route)
}

/// Gate a route and forward the verified claims as `Extension<AccessClaims>`.
pub fn require_role_with_claims(
    codec: &Arc<TokenCodec>,
    allowed: &[Role],
    route: MethodRouter,
) -> MethodRouter {
    RoleGate::new(codec.clone(), allowed).with_claims().wrap(route)
}

pub async fn role_gate(
    State(gate): State<RoleGate>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return json_error(StatusCode::UNAUTHORIZED, NO_ACCESS_TOKEN);
    };

    let claims = match gate.codec.verify::<AccessClaims>(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::info!(reason = %e, "access token rejected");
            return json_error(StatusCode::UNAUTHORIZED, INVALID_ACCESS_TOKEN);
        }
    };

    if let Err(e) = authorize_roles(&claims.roles, &gate.allowed) {
        tracing::info!(user_id = %claims.user_id, reason = %e, "role gate denied");
        return json_error(StatusCode::FORBIDDEN, MISSING_PERMISSIONS);
    }

    if gate.forward_claims {
        req.extensions_mut().insert(claims);
    }

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
