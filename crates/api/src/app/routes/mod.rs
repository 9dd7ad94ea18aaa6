use axum::{Router, routing::get};

use schoolbooks_auth::TokenCodec;

pub mod auth;
pub mod system;
pub mod users;

/// Every route the service exposes. Gates need the codec at construction time.
pub fn router(codec: &std::sync::Arc<TokenCodec>) -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/api/auth", auth::router())
        .nest("/api/users", users::router(codec))
}
