//! Configuration loading from the process environment.

use chrono::Duration;
use thiserror::Error;

use schoolbooks_auth::AuthConfig;

const DEV_SECRET: &str = "dev-secret";

/// Upper bound for token TTLs: ten years.
const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Everything the server binary needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub port: u16,
    /// Absent means the in-memory credential store.
    pub database_url: Option<String>,
    pub cors_allow_origin: Option<String>,
    pub bootstrap_sys_admin: Option<BootstrapAdmin>,
}

/// Account promoted to `SysAdmin` at startup, so a fresh deployment is manageable.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret = get("JWT_SECRET_KEY").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET_KEY not set; using insecure dev default");
            DEV_SECRET.to_string()
        });

        let mut auth = AuthConfig::new(secret);
        if let Some(secs) = parse::<i64>("JWT_ACCESS_TOKEN_EXPIRY_SEC", get("JWT_ACCESS_TOKEN_EXPIRY_SEC"))? {
            auth = auth.with_access_token_ttl(positive_seconds("JWT_ACCESS_TOKEN_EXPIRY_SEC", secs)?);
        }
        if let Some(secs) = parse::<i64>("JWT_REFRESH_TOKEN_EXPIRY_SEC", get("JWT_REFRESH_TOKEN_EXPIRY_SEC"))? {
            auth = auth.with_refresh_token_ttl(positive_seconds("JWT_REFRESH_TOKEN_EXPIRY_SEC", secs)?);
        }
        if let Some(issuer) = get("JWT_ISSUER") {
            auth = auth.with_issuer(issuer);
        }
        if let Some(cost) = parse::<u32>("BCRYPT_COST", get("BCRYPT_COST"))? {
            // bcrypt accepts 4..=31
            if !(4..=31).contains(&cost) {
                return Err(ConfigError::Invalid {
                    key: "BCRYPT_COST",
                    value: cost.to_string(),
                });
            }
            auth = auth.with_bcrypt_cost(cost);
        }

        let port = parse::<u16>("CONTAINER_PORT", get("CONTAINER_PORT"))?.unwrap_or(8080);

        let bootstrap_sys_admin = match (
            get("BOOTSTRAP_SYSADMIN_USERNAME"),
            get("BOOTSTRAP_SYSADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Invalid {
                    key: "BOOTSTRAP_SYSADMIN_PASSWORD",
                    value: String::new(),
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid {
                    key: "BOOTSTRAP_SYSADMIN_USERNAME",
                    value: String::new(),
                });
            }
        };

        Ok(Self {
            auth,
            port,
            database_url: get("DATABASE_URL"),
            cors_allow_origin: get("CORS_ALLOW_ORIGIN"),
            bootstrap_sys_admin,
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value })
    })
    .transpose()
}

fn positive_seconds(key: &'static str, secs: i64) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key,
        value: secs.to_string(),
    };
    if !(1..=MAX_TTL_SECONDS).contains(&secs) {
        return Err(invalid());
    }
    Duration::try_seconds(secs).ok_or_else(invalid)
}
