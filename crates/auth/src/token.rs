//! Signing and verification of access/refresh tokens (HS256 JWT).

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use schoolbooks_core::UserId;

use crate::claims::{AccessClaims, ClaimShape, RefreshClaims, TokenClaims};
use crate::{AuthConfig, Identity};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed")]
    Malformed,

    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// Signs and verifies compact bearer tokens with the process-wide secret.
///
/// Verification is pure: no I/O, no shared mutable state.
pub struct TokenCodec {
    config: Arc<AuthConfig>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller-supplied clock in `verify_at`.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret()),
            decoding_key: DecodingKey::from_secret(config.secret()),
            validation,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn sign_access_token(&self, identity: &Identity) -> Result<String, TokenError> {
        self.sign_access_token_at(identity, Utc::now())
    }

    /// Mint an access token embedding the identity's current roles, school and locale.
    pub fn sign_access_token_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            user_id: identity.id,
            school_id: identity.school_id,
            username: identity.username.clone(),
            roles: identity.roles.clone(),
            locale: identity.locale,
            exp: expiry(now, self.config.access_token_ttl)?,
            iss: self.config.issuer.clone(),
        };
        self.sign(&TokenClaims::Access(claims))
    }

    pub fn sign_refresh_token(&self, user_id: UserId) -> Result<String, TokenError> {
        self.sign_refresh_token_at(user_id, Utc::now())
    }

    pub fn sign_refresh_token_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = RefreshClaims {
            user_id,
            exp: expiry(now, self.config.refresh_token_ttl)?,
        };
        self.sign(&TokenClaims::Refresh(claims))
    }

    pub fn verify<C: ClaimShape>(&self, token: &str) -> Result<C, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature, shape and expiry. A token is valid while `now < exp`.
    pub fn verify_at<C: ClaimShape>(&self, token: &str, now: DateTime<Utc>) -> Result<C, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }
        })?;
        let claims = data.claims;

        if claims.kind() != C::KIND {
            return Err(TokenError::Malformed);
        }
        if now.timestamp() >= claims.expires_at() {
            return Err(TokenError::Expired);
        }
        if let TokenClaims::Access(access) = &claims {
            if access.iss != self.config.issuer {
                return Err(TokenError::Malformed);
            }
        }

        C::from_claims(claims).ok_or(TokenError::Malformed)
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

fn expiry(now: DateTime<Utc>, ttl: chrono::Duration) -> Result<i64, TokenError> {
    now.checked_add_signed(ttl)
        .map(|exp| exp.timestamp())
        .ok_or_else(|| TokenError::Signing(format!("expiry out of range for ttl {ttl}")))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use schoolbooks_core::SchoolId;

    use super::*;
    use crate::{Locale, Role};

    fn codec_with(secret: &str) -> TokenCodec {
        TokenCodec::new(Arc::new(
            AuthConfig::new(secret)
                .with_access_token_ttl(Duration::seconds(60))
                .with_refresh_token_ttl(Duration::seconds(600)),
        ))
    }

    fn identity() -> Identity {
        Identity {
            id: UserId::new(),
            school_id: Some(SchoolId::new()),
            username: "librarian".to_string(),
            roles: vec![Role::Admin, Role::User, Role::User],
            locale: Locale::En,
        }
    }

    #[test]
    fn access_round_trip_preserves_identity_fields() {
        let codec = codec_with("k1");
        let who = identity();
        let token = codec.sign_access_token(&who).unwrap();

        let claims: AccessClaims = codec.verify(&token).unwrap();
        assert_eq!(claims.user_id, who.id);
        assert_eq!(claims.school_id, who.school_id);
        assert_eq!(claims.username, who.username);
        assert_eq!(claims.roles, who.roles);
        assert_eq!(claims.locale, who.locale);
        assert_eq!(claims.iss, crate::config::DEFAULT_ISSUER);
    }

    #[test]
    fn expiry_boundary() {
        let codec = codec_with("k1");
        let issued = Utc::now();
        let token = codec.sign_access_token_at(&identity(), issued).unwrap();

        let before = issued + Duration::seconds(59);
        let after = issued + Duration::seconds(61);
        assert!(codec.verify_at::<AccessClaims>(&token, before).is_ok());
        assert_eq!(
            codec.verify_at::<AccessClaims>(&token, after).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn refresh_expiry_uses_refresh_ttl() {
        let codec = codec_with("k1");
        let issued = Utc::now();
        let user_id = UserId::new();
        let token = codec.sign_refresh_token_at(user_id, issued).unwrap();

        let claims: RefreshClaims = codec
            .verify_at(&token, issued + Duration::seconds(599))
            .unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(
            codec
                .verify_at::<RefreshClaims>(&token, issued + Duration::seconds(601))
                .unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn foreign_key_is_rejected() {
        let token = codec_with("k1").sign_access_token(&identity()).unwrap();
        let err = codec_with("k2").verify::<AccessClaims>(&token).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn shapes_are_not_interchangeable() {
        let codec = codec_with("k1");
        let refresh = codec.sign_refresh_token(UserId::new()).unwrap();
        let access = codec.sign_access_token(&identity()).unwrap();

        assert_eq!(codec.verify::<AccessClaims>(&refresh).unwrap_err(), TokenError::Malformed);
        assert_eq!(codec.verify::<RefreshClaims>(&access).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec_with("k1");
        assert_eq!(codec.verify::<AccessClaims>("abc").unwrap_err(), TokenError::Malformed);
        assert_eq!(codec.verify::<AccessClaims>("").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let secret = "shared";
        let ours = codec_with(secret);
        let theirs = TokenCodec::new(Arc::new(AuthConfig::new(secret).with_issuer("someone-else")));
        let token = theirs.sign_access_token(&identity()).unwrap();
        assert_eq!(ours.verify::<AccessClaims>(&token).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn out_of_range_ttl_fails_to_sign() {
        let codec = TokenCodec::new(Arc::new(
            AuthConfig::new("k1")
                .with_access_token_ttl(Duration::seconds(100_000_000_000_000))
                .with_refresh_token_ttl(Duration::seconds(100_000_000_000_000)),
        ));
        assert!(matches!(
            codec.sign_access_token(&identity()),
            Err(TokenError::Signing(_))
        ));
        assert!(matches!(
            codec.sign_refresh_token(UserId::new()),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn signing_is_deterministic_for_fixed_clock() {
        let codec = codec_with("k1");
        let who = identity();
        let now = Utc::now();
        assert_eq!(
            codec.sign_access_token_at(&who, now).unwrap(),
            codec.sign_access_token_at(&who, now).unwrap()
        );
    }
}
