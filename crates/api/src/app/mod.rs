//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the session issuer and credential store handlers share
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: the `{"error": ...}` envelope

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: Arc<AppServices>, cors_allow_origin: Option<&str>) -> Router {
    let router = routes::router(services.codec())
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    match cors_allow_origin.and_then(cors_layer) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Credentialed CORS for a single browser origin; the refresh cookie needs it.
fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match origin.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(_) => {
            tracing::warn!(origin, "CORS: invalid origin, cross-origin requests disabled");
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .allow_credentials(true),
    )
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use schoolbooks_auth::AuthConfig;
    use tower::ServiceExt;

    use super::*;

    fn services() -> Arc<AppServices> {
        Arc::new(AppServices::in_memory(AuthConfig::new("app-test").with_bcrypt_cost(4)).unwrap())
    }

    #[tokio::test]
    async fn health_is_public() {
        let res = build_app(services(), None)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_echoes_configured_origin_with_credentials() {
        let res = build_app(services(), Some("http://localhost:3000"))
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/auth/refresh")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[test]
    fn invalid_origin_disables_cors() {
        assert!(cors_layer("bad\norigin").is_none());
    }
}
