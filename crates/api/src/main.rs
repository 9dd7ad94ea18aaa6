use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use schoolbooks_api::app::{AppServices, build_app};
use schoolbooks_auth::{CredentialStore, InMemoryCredentialStore};
use schoolbooks_infra::{AppConfig, PostgresCredentialStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    schoolbooks_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(auth = ?config.auth, port = config.port, "configuration loaded");

    let store: Arc<dyn CredentialStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresCredentialStore::connect(url)
                .await
                .context("failed to connect to the credential database")?;
            store.ensure_schema().await.context("failed to prepare schema")?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory credential store");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let services = Arc::new(AppServices::new(config.auth.clone(), store)?);
    if let Some(admin) = &config.bootstrap_sys_admin {
        services
            .ensure_sys_admin(&admin.username, &admin.password)
            .await
            .context("failed to bootstrap sys admin")?;
    }

    let app = build_app(services, config.cors_allow_origin.as_deref());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
