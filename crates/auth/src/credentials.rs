//! Credential store contract.
//!
//! The store owns identity records and password hashes; the auth core only
//! reads them, except for registration and password changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use schoolbooks_core::{SchoolId, UserId};

use crate::{Locale, Role};

/// Public view of a user account (no password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: UserId,
    pub school_id: Option<SchoolId>,
    pub username: String,
    pub roles: Vec<Role>,
    pub locale: Locale,
}

/// Full record as persisted by a credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentity {
    pub identity: Identity,
    pub password_hash: String,
    pub active: bool,
}

impl StoredIdentity {
    /// A freshly registered account: role `User`, no school, default locale.
    pub fn with_default_role(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            identity: Identity {
                id: UserId::new(),
                school_id: None,
                username: username.into(),
                roles: vec![Role::User],
                locale: Locale::default(),
            },
            password_hash: password_hash.into(),
            active: true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("a user with the name {0} already exists")]
    DuplicateUsername(String),

    #[error("user not found")]
    NotFound,

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Access to identities and password hashes.
///
/// Only active identities are visible through the lookup methods.
/// `insert` must enforce username uniqueness atomically and report a clash as
/// [`StoreError::DuplicateUsername`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn password_hash_by_username(&self, username: &str) -> Result<Option<String>, StoreError>;

    async fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError>;

    async fn identity_by_id(&self, id: UserId) -> Result<Option<Identity>, StoreError>;

    async fn password_hash_by_id(&self, id: UserId) -> Result<Option<String>, StoreError>;

    async fn insert(&self, record: StoredIdentity) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<Identity>, StoreError>;

    async fn list_by_school(&self, school_id: SchoolId) -> Result<Vec<Identity>, StoreError>;

    /// Replace school, username, roles and locale of an existing identity.
    async fn update_identity(&self, identity: &Identity) -> Result<(), StoreError>;

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), StoreError>;
}
