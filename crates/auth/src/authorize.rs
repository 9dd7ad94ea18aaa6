use thiserror::Error;

use schoolbooks_core::{SchoolId, UserId};

use crate::{AccessClaims, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user missing permissions")]
    MissingRole,

    #[error("user is not assigned to a school")]
    NoSchool,

    #[error("school mismatch")]
    SchoolMismatch,

    #[error("not the owner of this resource")]
    NotOwner,
}

/// Role gate policy: "any of".
///
/// - `SysAdmin` passes every gate, whether or not the allow-list names it.
/// - A caller with no roles never passes.
///
/// - No IO
/// - No panics
pub fn authorize_roles(held: &[Role], allowed: &[Role]) -> Result<(), AuthzError> {
    if held.contains(&Role::SysAdmin) || held.iter().any(|r| allowed.contains(r)) {
        Ok(())
    } else {
        Err(AuthzError::MissingRole)
    }
}

/// School-scoped resource check, performed by endpoints with forwarded claims.
///
/// `SysAdmin` may act on any school; everybody else only on their own.
pub fn authorize_school(claims: &AccessClaims, school_id: SchoolId) -> Result<(), AuthzError> {
    if claims.is_sys_admin() {
        return Ok(());
    }
    match claims.school_id {
        None => Err(AuthzError::NoSchool),
        Some(own) if own == school_id => Ok(()),
        Some(_) => Err(AuthzError::SchoolMismatch),
    }
}

/// Per-user resource check: the caller themselves, or a `SysAdmin`.
pub fn authorize_self_or_sys_admin(claims: &AccessClaims, user_id: UserId) -> Result<(), AuthzError> {
    if claims.user_id == user_id || claims.is_sys_admin() {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Locale;

    fn claims(roles: Vec<Role>, school_id: Option<SchoolId>) -> AccessClaims {
        AccessClaims {
            user_id: UserId::new(),
            school_id,
            username: "u".to_string(),
            roles,
            locale: Locale::De,
            exp: 0,
            iss: "test".to_string(),
        }
    }

    #[test]
    fn any_of_semantics() {
        assert!(authorize_roles(&[Role::Admin, Role::User], &[Role::Admin]).is_ok());
        assert!(authorize_roles(&[Role::User], &[Role::Admin, Role::User]).is_ok());
        assert_eq!(
            authorize_roles(&[Role::User], &[Role::Admin]),
            Err(AuthzError::MissingRole)
        );
    }

    #[test]
    fn no_roles_never_pass() {
        assert!(authorize_roles(&[], &[Role::User]).is_err());
        assert!(authorize_roles(&[], &Role::ALL).is_err());
        assert!(authorize_roles(&[], &[]).is_err());
    }

    #[test]
    fn sys_admin_passes_every_gate() {
        assert!(authorize_roles(&[Role::SysAdmin], &[Role::Admin]).is_ok());
        assert!(authorize_roles(&[Role::SysAdmin], &[]).is_ok());
    }

    #[test]
    fn duplicates_in_held_roles_are_harmless() {
        assert!(authorize_roles(&[Role::User, Role::User], &[Role::User]).is_ok());
    }

    #[test]
    fn school_scope() {
        let school = SchoolId::new();
        let other = SchoolId::new();

        assert!(authorize_school(&claims(vec![Role::Admin], Some(school)), school).is_ok());
        assert_eq!(
            authorize_school(&claims(vec![Role::Admin], Some(other)), school),
            Err(AuthzError::SchoolMismatch)
        );
        assert_eq!(
            authorize_school(&claims(vec![Role::Admin], None), school),
            Err(AuthzError::NoSchool)
        );
        assert!(authorize_school(&claims(vec![Role::SysAdmin], None), school).is_ok());
    }

    #[test]
    fn self_or_sys_admin() {
        let me = claims(vec![Role::User], None);
        assert!(authorize_self_or_sys_admin(&me, me.user_id).is_ok());
        assert_eq!(
            authorize_self_or_sys_admin(&me, UserId::new()),
            Err(AuthzError::NotOwner)
        );
        let root = claims(vec![Role::SysAdmin], None);
        assert!(authorize_self_or_sys_admin(&root, UserId::new()).is_ok());
    }
}
