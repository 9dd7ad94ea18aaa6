//! Login, refresh, registration and password change.
//!
//! Every operation is a short-circuiting pipeline:
//! `lookup credentials -> verify password -> lookup identity -> issue tokens`.
//! There is no server-side session; issued tokens are the only state.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use schoolbooks_core::UserId;

use crate::claims::RefreshClaims;
use crate::credentials::{CredentialStore, Identity, StoredIdentity};
use crate::{AuthError, PasswordHasher, TokenCodec, TokenError};

/// Tokens minted by a successful login.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub identity: Identity,
    pub access_token: String,
    /// To be delivered only through an HTTP-only cookie.
    pub refresh_token: String,
}

pub struct SessionIssuer {
    codec: Arc<TokenCodec>,
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    /// Verified against when the username is unknown, so both rejections cost the same.
    dummy_hash: String,
}

impl SessionIssuer {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn CredentialStore>) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(codec.config().bcrypt_cost);
        let dummy_hash = hasher.hash("unknown-user-placeholder")?;
        Ok(Self {
            codec,
            store,
            hasher,
            dummy_hash,
        })
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedSession, AuthError> {
        // Same normalization as `register`.
        let username = username.trim();
        let stored = match self.store.password_hash_by_username(username).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(error = %e, "credential lookup failed");
                None
            }
        };

        let known = stored.is_some();
        let hash = stored.unwrap_or_else(|| self.dummy_hash.clone());
        let verified = self.verify_blocking(hash, password.to_string()).await;
        if !known || verified.is_err() {
            info!("login rejected");
            return Err(AuthError::CredentialMismatch);
        }

        let identity = self
            .store
            .identity_by_username(username)
            .await?
            .ok_or(AuthError::CredentialMismatch)?;

        let access_token = self.sign_access(&identity)?;
        let refresh_token = self
            .codec
            .sign_refresh_token(identity.id)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        info!(user_id = %identity.id, "login succeeded");
        Ok(IssuedSession {
            identity,
            access_token,
            refresh_token,
        })
    }

    /// Mint a fresh access token from a refresh token.
    ///
    /// Roles, school and locale are re-read from the store, so changes made
    /// since login take effect here. The refresh token itself is not rotated.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.codec.verify::<RefreshClaims>(refresh_token).map_err(|e| {
            info!(reason = %e, "refresh token rejected");
            AuthError::TokenInvalid(e)
        })?;

        let identity = self
            .store
            .identity_by_id(claims.user_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.user_id, "refresh for unknown or inactive user");
                AuthError::TokenInvalid(TokenError::Malformed)
            })?;

        self.sign_access(&identity)
    }

    /// Create an account with the default role. Username uniqueness is the store's job.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::invalid_input("username must not be empty"));
        }
        if password.is_empty() {
            return Err(AuthError::invalid_input("password must not be empty"));
        }

        let hash = self.hash_blocking(password.to_string()).await?;
        let record = StoredIdentity::with_default_role(username, hash);
        let identity = record.identity.clone();
        self.store.insert(record).await?;

        info!(user_id = %identity.id, "user registered");
        Ok(identity)
    }

    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.is_empty() {
            return Err(AuthError::invalid_input("password must not be empty"));
        }

        let hash = self
            .store
            .password_hash_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        self.verify_blocking(hash, old_password.to_string()).await?;

        let new_hash = self.hash_blocking(new_password.to_string()).await?;
        self.store.update_password_hash(user_id, &new_hash).await?;

        info!("password changed");
        Ok(())
    }

    fn sign_access(&self, identity: &Identity) -> Result<String, AuthError> {
        self.codec
            .sign_access_token(identity)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    async fn hash_blocking(&self, plaintext: String) -> Result<String, AuthError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
    }

    async fn verify_blocking(&self, hash: String, plaintext: String) -> Result<(), AuthError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &plaintext))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
    }
}
