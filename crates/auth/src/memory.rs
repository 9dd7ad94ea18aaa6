use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use schoolbooks_core::{SchoolId, UserId};

use crate::credentials::{CredentialStore, Identity, StoreError, StoredIdentity};

/// In-memory credential store for tests/dev.
///
/// Uniqueness checks and writes happen under a single write lock, so
/// concurrent registrations of the same username cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<HashMap<UserId, StoredIdentity>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&HashMap<UserId, StoredIdentity>) -> T,
    ) -> Result<T, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(f(&map))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut HashMap<UserId, StoredIdentity>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        f(&mut map)
    }
}

fn active_by_name<'a>(
    map: &'a HashMap<UserId, StoredIdentity>,
    username: &str,
) -> Option<&'a StoredIdentity> {
    map.values()
        .find(|r| r.active && r.identity.username == username)
}

fn sorted(mut identities: Vec<Identity>) -> Vec<Identity> {
    identities.sort_by(|a, b| a.id.as_uuid().cmp(b.id.as_uuid()));
    identities
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn password_hash_by_username(&self, username: &str) -> Result<Option<String>, StoreError> {
        self.read(|map| active_by_name(map, username).map(|r| r.password_hash.clone()))
    }

    async fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        self.read(|map| active_by_name(map, username).map(|r| r.identity.clone()))
    }

    async fn identity_by_id(&self, id: UserId) -> Result<Option<Identity>, StoreError> {
        self.read(|map| {
            map.get(&id)
                .filter(|r| r.active)
                .map(|r| r.identity.clone())
        })
    }

    async fn password_hash_by_id(&self, id: UserId) -> Result<Option<String>, StoreError> {
        self.read(|map| {
            map.get(&id)
                .filter(|r| r.active)
                .map(|r| r.password_hash.clone())
        })
    }

    async fn insert(&self, record: StoredIdentity) -> Result<(), StoreError> {
        self.write(|map| {
            let username = &record.identity.username;
            if record.active && active_by_name(map, username).is_some() {
                return Err(StoreError::DuplicateUsername(username.clone()));
            }
            map.insert(record.identity.id, record);
            Ok(())
        })
    }

    async fn list(&self) -> Result<Vec<Identity>, StoreError> {
        self.read(|map| {
            sorted(
                map.values()
                    .filter(|r| r.active)
                    .map(|r| r.identity.clone())
                    .collect(),
            )
        })
    }

    async fn list_by_school(&self, school_id: SchoolId) -> Result<Vec<Identity>, StoreError> {
        self.read(|map| {
            sorted(
                map.values()
                    .filter(|r| r.active && r.identity.school_id == Some(school_id))
                    .map(|r| r.identity.clone())
                    .collect(),
            )
        })
    }

    async fn update_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.write(|map| {
            if let Some(other) = active_by_name(map, &identity.username) {
                if other.identity.id != identity.id {
                    return Err(StoreError::DuplicateUsername(identity.username.clone()));
                }
            }
            let record = map
                .get_mut(&identity.id)
                .filter(|r| r.active)
                .ok_or(StoreError::NotFound)?;
            record.identity = identity.clone();
            Ok(())
        })
    }

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), StoreError> {
        self.write(|map| {
            let record = map
                .get_mut(&id)
                .filter(|r| r.active)
                .ok_or(StoreError::NotFound)?;
            record.password_hash = password_hash.to_string();
            Ok(())
        })
    }
}
