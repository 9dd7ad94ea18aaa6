//! Credential store adapters.

mod postgres;

pub use postgres::PostgresCredentialStore;
