//! Service wiring shared by every handler.

use std::sync::Arc;

use schoolbooks_auth::{
    AuthConfig, AuthError, CredentialStore, InMemoryCredentialStore, Role, SessionIssuer, TokenCodec,
};

pub struct AppServices {
    sessions: SessionIssuer,
}

impl AppServices {
    pub fn new(config: AuthConfig, store: Arc<dyn CredentialStore>) -> Result<Self, AuthError> {
        let codec = Arc::new(TokenCodec::new(Arc::new(config)));
        Ok(Self {
            sessions: SessionIssuer::new(codec, store)?,
        })
    }

    /// Services backed by a fresh in-memory credential store.
    pub fn in_memory(config: AuthConfig) -> Result<Self, AuthError> {
        Self::new(config, Arc::new(InMemoryCredentialStore::new()))
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        self.sessions.codec()
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        self.sessions.store()
    }

    /// Make sure a `SysAdmin` account with this name exists.
    ///
    /// An existing account keeps its password; it only gains the role.
    pub async fn ensure_sys_admin(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let mut identity = match self.store().identity_by_username(username).await? {
            Some(existing) => existing,
            None => self.sessions.register(username, password).await?,
        };
        if identity.roles.contains(&Role::SysAdmin) {
            return Ok(());
        }
        identity.roles.insert(0, Role::SysAdmin);
        self.store().update_identity(&identity).await?;
        tracing::info!(user_id = %identity.id, "bootstrap sys admin ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_admin_is_idempotent() {
        let services = AppServices::in_memory(AuthConfig::new("k").with_bcrypt_cost(4)).unwrap();
        services.ensure_sys_admin("root", "pw").await.unwrap();
        services.ensure_sys_admin("root", "other").await.unwrap();

        let root = services.store().identity_by_username("root").await.unwrap().unwrap();
        assert_eq!(root.roles, vec![Role::SysAdmin, Role::User]);
        assert!(services.sessions().login("root", "pw").await.is_ok());
    }
}
