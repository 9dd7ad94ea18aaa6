use chrono::Duration;

/// Default issuer stamped into access tokens.
pub const DEFAULT_ISSUER: &str = "school-book-storage";

/// Immutable auth configuration, built once at startup and shared by reference.
///
/// Nothing in this crate reads the environment; see `schoolbooks-infra::config`.
#[derive(Clone)]
pub struct AuthConfig {
    secret: Vec<u8>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub issuer: String,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::hours(24),
            issuer: DEFAULT_ISSUER.to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

// Keeps the signing secret out of logs.
impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("issuer", &self.issuer)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}
