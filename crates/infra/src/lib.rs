//! Infrastructure layer: credential persistence and environment configuration.

pub mod config;
pub mod credentials;

pub use config::{AppConfig, BootstrapAdmin, ConfigError};
pub use credentials::PostgresCredentialStore;
