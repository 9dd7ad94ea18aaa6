//! Postgres-backed credential store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `DuplicateUsername` |
//! | Database (other) | Any other | `Unavailable` |
//! | Anything else | N/A | `Unavailable` |
//!
//! Username uniqueness among active accounts is enforced by a partial unique
//! index, so concurrent registrations race inside Postgres rather than here.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use schoolbooks_auth::{CredentialStore, Identity, Locale, Role, StoreError, StoredIdentity};
use schoolbooks_core::{SchoolId, UserId};

const SCHEMA: &str = include_str!("../../migrations/0001_credentials.sql");

const IDENTITY_SELECT: &str = r#"
    SELECT u.id, u.school_id, u.username, u.locale, r.role
    FROM users u
    LEFT JOIN roles r ON r.user_id = u.id
    WHERE u.active = TRUE
"#;

/// Postgres credential store.
///
/// Roles live in their own table, one row per `(user_id, position)`, so the
/// order a user's roles were assigned in survives a round trip.
#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: Arc<PgPool>,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn fetch_identities(
        &self,
        operation: &str,
        filter: IdentityFilter<'_>,
    ) -> Result<Vec<Identity>, StoreError> {
        let clause = match filter {
            IdentityFilter::All => "",
            IdentityFilter::Id(_) => "AND u.id = $1",
            IdentityFilter::School(_) => "AND u.school_id = $1",
            IdentityFilter::Username(_) => "AND u.username = $1",
        };
        let sql = format!("{IDENTITY_SELECT} {clause} ORDER BY u.id, r.position");
        let query = match filter {
            IdentityFilter::All => sqlx::query(&sql),
            IdentityFilter::Id(id) | IdentityFilter::School(id) => sqlx::query(&sql).bind(id),
            IdentityFilter::Username(name) => sqlx::query(&sql).bind(name),
        };
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let rows = rows
            .iter()
            .map(IdentityRow::from_pg_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error(operation, e))?;
        fold_identities(rows)
    }
}

#[derive(Debug, Clone, Copy)]
enum IdentityFilter<'a> {
    All,
    Id(Uuid),
    School(Uuid),
    Username(&'a str),
}

fn password_hash_of(row: Option<PgRow>) -> Result<Option<String>, sqlx::Error> {
    row.map(|r| r.try_get::<String, _>("password_hash"))
        .transpose()
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    #[instrument(skip(self))]
    async fn password_hash_by_username(&self, username: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE active = TRUE AND username = $1")
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("password_hash_by_username", e))?;
        password_hash_of(row).map_err(|e| map_sqlx_error("password_hash_by_username", e))
    }

    #[instrument(skip(self))]
    async fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let found = self
            .fetch_identities("identity_by_username", IdentityFilter::Username(username))
            .await?;
        Ok(found.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn identity_by_id(&self, id: UserId) -> Result<Option<Identity>, StoreError> {
        let found = self
            .fetch_identities("identity_by_id", IdentityFilter::Id(id.into()))
            .await?;
        Ok(found.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn password_hash_by_id(&self, id: UserId) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE active = TRUE AND id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("password_hash_by_id", e))?;
        password_hash_of(row).map_err(|e| map_sqlx_error("password_hash_by_id", e))
    }

    #[instrument(skip(self, record), fields(user_id = %record.identity.id))]
    async fn insert(&self, record: StoredIdentity) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;

        let identity = &record.identity;
        sqlx::query(
            r#"
            INSERT INTO users (id, school_id, username, password_hash, active, locale)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::from(identity.id))
        .bind(identity.school_id.map(Uuid::from))
        .bind(&identity.username)
        .bind(&record.password_hash)
        .bind(record.active)
        .bind(identity.locale.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error("insert", &identity.username, e))?;

        insert_roles(&mut tx, identity.id, &identity.roles).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Identity>, StoreError> {
        self.fetch_identities("list", IdentityFilter::All).await
    }

    #[instrument(skip(self))]
    async fn list_by_school(&self, school_id: SchoolId) -> Result<Vec<Identity>, StoreError> {
        self.fetch_identities("list_by_school", IdentityFilter::School(school_id.into()))
            .await
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    async fn update_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_identity", e))?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET school_id = $1, username = $2, locale = $3, updated_at = NOW()
            WHERE id = $4 AND active = TRUE
            "#,
        )
        .bind(identity.school_id.map(Uuid::from))
        .bind(&identity.username)
        .bind(identity.locale.as_str())
        .bind(Uuid::from(identity.id))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error("update_identity", &identity.username, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM roles WHERE user_id = $1")
            .bind(Uuid::from(identity.id))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_identity", e))?;
        insert_roles(&mut tx, identity.id, &identity.roles).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_identity", e))?;
        Ok(())
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2 AND active = TRUE
            "#,
        )
        .bind(password_hash)
        .bind(Uuid::from(id))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_password_hash", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

async fn insert_roles(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    roles: &[Role],
) -> Result<(), StoreError> {
    for (position, role) in roles.iter().enumerate() {
        sqlx::query("INSERT INTO roles (user_id, position, role) VALUES ($1, $2, $3)")
            .bind(Uuid::from(user_id))
            .bind(position as i32)
            .bind(role.as_str())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_roles", e))?;
    }
    Ok(())
}

/// One row of the users/roles join.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IdentityRow {
    id: Uuid,
    school_id: Option<Uuid>,
    username: String,
    locale: String,
    role: Option<String>,
}

impl IdentityRow {
    fn from_pg_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            school_id: row.try_get("school_id")?,
            username: row.try_get("username")?,
            locale: row.try_get("locale")?,
            role: row.try_get("role")?,
        })
    }
}

/// Collapse join rows (ordered by user id) into one identity per user.
fn fold_identities(rows: Vec<IdentityRow>) -> Result<Vec<Identity>, StoreError> {
    let mut out: Vec<Identity> = Vec::new();
    for row in rows {
        let user_id = UserId::from_uuid(row.id);
        let role = row
            .role
            .as_deref()
            .map(Role::from_str)
            .transpose()
            .map_err(StoreError::Unavailable)?;

        match out.last_mut() {
            Some(current) if current.id == user_id => {
                current.roles.extend(role);
            }
            _ => {
                let locale = Locale::from_str(&row.locale).map_err(StoreError::Unavailable)?;
                out.push(Identity {
                    id: user_id,
                    school_id: row.school_id.map(SchoolId::from_uuid),
                    username: row.username,
                    roles: role.into_iter().collect(),
                    locale,
                });
            }
        }
    }
    Ok(out)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn map_write_error(operation: &str, username: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        tracing::info!(username = %username, "username already taken");
        return StoreError::DuplicateUsername(username.to_string());
    }
    map_sqlx_error(operation, err)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    let msg = match &err {
        sqlx::Error::Database(db_err) => {
            format!("database error in {}: {}", operation, db_err.message())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            format!("connection pool unavailable in {}: {}", operation, err)
        }
        _ => format!("error in {}: {}", operation, err),
    };
    tracing::error!(operation, error = %err, "credential store failure");
    StoreError::Unavailable(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Uuid, name: &str, role: Option<&str>) -> IdentityRow {
        IdentityRow {
            id,
            school_id: None,
            username: name.to_string(),
            locale: "EN".to_string(),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn join_rows_fold_into_ordered_roles() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let identities = fold_identities(vec![
            row(a, "alice", Some("ADMIN")),
            row(a, "alice", Some("USER")),
            row(b, "bob", None),
        ])
        .unwrap();

        assert_eq!(identities.len(), 2);
        assert_eq!(identities[0].username, "alice");
        assert_eq!(identities[0].roles, vec![Role::Admin, Role::User]);
        assert_eq!(identities[0].locale, Locale::En);
        assert!(identities[1].roles.is_empty());
    }

    #[test]
    fn unknown_role_is_reported_not_dropped() {
        let err = fold_identities(vec![row(Uuid::now_v7(), "x", Some("ROOT"))]).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn non_database_errors_are_unavailable() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(matches!(
            map_write_error("insert", "alice", sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn schema_declares_partial_unique_index() {
        assert!(SCHEMA.contains("UNIQUE INDEX"));
        assert!(SCHEMA.contains("WHERE active"));
    }
}
