use serde::{Deserialize, Serialize};

use schoolbooks_core::{SchoolId, UserId};

use crate::{Locale, Role};

/// Claims carried by an access token.
///
/// Once verified, these are trusted for the remainder of the request; they are
/// never re-checked against the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: UserId,

    #[serde(default)]
    pub school_id: Option<SchoolId>,

    #[serde(rename = "userName")]
    pub username: String,

    /// Ordered as stored; duplicates are tolerated.
    pub roles: Vec<Role>,

    pub locale: Locale,

    /// Expiration (Unix seconds).
    pub exp: i64,

    /// Issuer.
    pub iss: String,
}

impl AccessClaims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_sys_admin(&self) -> bool {
        self.has_role(Role::SysAdmin)
    }
}

/// Claims carried by a refresh token. Deliberately role-free: roles are
/// re-read from the credential store whenever an access token is minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub user_id: UserId,

    /// Expiration (Unix seconds).
    pub exp: i64,
}

/// Which kind of token a claim set belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Every claim shape the codec can sign, tagged on the wire by `typ`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "lowercase")]
pub enum TokenClaims {
    Access(AccessClaims),
    Refresh(RefreshClaims),
}

impl TokenClaims {
    pub fn kind(&self) -> TokenKind {
        match self {
            TokenClaims::Access(_) => TokenKind::Access,
            TokenClaims::Refresh(_) => TokenKind::Refresh,
        }
    }

    pub fn expires_at(&self) -> i64 {
        match self {
            TokenClaims::Access(c) => c.exp,
            TokenClaims::Refresh(c) => c.exp,
        }
    }
}

/// A concrete claim shape that can be requested from
/// [`TokenCodec::verify`](crate::TokenCodec::verify).
pub trait ClaimShape: Sized {
    const KIND: TokenKind;

    /// Narrow a verified claim set to this shape, `None` on a shape mismatch.
    fn from_claims(claims: TokenClaims) -> Option<Self>;
}

impl ClaimShape for AccessClaims {
    const KIND: TokenKind = TokenKind::Access;

    fn from_claims(claims: TokenClaims) -> Option<Self> {
        match claims {
            TokenClaims::Access(c) => Some(c),
            TokenClaims::Refresh(_) => None,
        }
    }
}

impl ClaimShape for RefreshClaims {
    const KIND: TokenKind = TokenKind::Refresh;

    fn from_claims(claims: TokenClaims) -> Option<Self> {
        match claims {
            TokenClaims::Refresh(c) => Some(c),
            TokenClaims::Access(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access() -> AccessClaims {
        AccessClaims {
            user_id: UserId::new(),
            school_id: None,
            username: "alice".to_string(),
            roles: vec![Role::User, Role::SysAdmin],
            locale: Locale::En,
            exp: 1_700_000_000,
            iss: "school-book-storage".to_string(),
        }
    }

    #[test]
    fn access_claims_use_camel_case_wire_names() {
        let json = serde_json::to_value(TokenClaims::Access(access())).unwrap();
        assert_eq!(json["typ"], "access");
        assert_eq!(json["userName"], "alice");
        assert!(json["schoolId"].is_null());
        assert_eq!(json["roles"][1], "SYS_ADMIN");
        assert_eq!(json["locale"], "EN");
    }

    #[test]
    fn shape_narrowing_rejects_other_kind() {
        let refresh = TokenClaims::Refresh(RefreshClaims {
            user_id: UserId::new(),
            exp: 10,
        });
        assert_eq!(refresh.kind(), TokenKind::Refresh);
        assert_eq!(refresh.expires_at(), 10);
        assert!(AccessClaims::from_claims(refresh.clone()).is_none());
        assert!(RefreshClaims::from_claims(refresh).is_some());
    }

    #[test]
    fn sys_admin_detection() {
        let claims = access();
        assert!(claims.is_sys_admin());
        assert!(!claims.has_role(Role::Admin));
    }
}
