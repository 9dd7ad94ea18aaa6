//! `schoolbooks-auth`: authentication and authorization core.
//!
//! Nothing here knows about HTTP or a concrete database; the API layer wires
//! it to transport, the infra layer to storage.

pub mod authorize;
pub mod claims;
pub mod config;
pub mod credentials;
pub mod error;
pub mod memory;
pub mod password;
pub mod roles;
pub mod session;
pub mod token;

pub use authorize::{AuthzError, authorize_roles, authorize_school, authorize_self_or_sys_admin};
pub use claims::{AccessClaims, ClaimShape, RefreshClaims, TokenClaims, TokenKind};
pub use config::AuthConfig;
pub use credentials::{CredentialStore, Identity, StoreError, StoredIdentity};
pub use error::AuthError;
pub use memory::InMemoryCredentialStore;
pub use password::PasswordHasher;
pub use roles::{Locale, Role};
pub use session::{IssuedSession, SessionIssuer};
pub use token::{TokenCodec, TokenError};
