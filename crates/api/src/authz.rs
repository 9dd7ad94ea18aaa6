//! API-side authorization for user management.
//!
//! Role gates only say *who may call* an endpoint; these checks decide what a
//! caller may do to a particular user once inside.

use schoolbooks_auth::{AccessClaims, AuthzError, Identity, Role, authorize_school};

/// May `claims` replace `current` with `requested`?
///
/// `SysAdmin` may change anything. An `Admin`:
/// - may only touch users in their own school, or users not yet assigned to one;
/// - may only place users into their own school;
/// - may not grant or revoke `SysAdmin`, nor touch an existing `SysAdmin` account.
pub fn authorize_user_update(
    claims: &AccessClaims,
    current: &Identity,
    requested: &Identity,
) -> Result<(), AuthzError> {
    if claims.is_sys_admin() {
        return Ok(());
    }
    if current.roles.contains(&Role::SysAdmin) {
        return Err(AuthzError::MissingRole);
    }

    if let Some(school) = current.school_id {
        authorize_school(claims, school)?;
    }
    match requested.school_id {
        Some(school) => authorize_school(claims, school)?,
        None if current.school_id.is_some() => return Err(AuthzError::SchoolMismatch),
        None => {}
    }

    if requested.roles.contains(&Role::SysAdmin) {
        return Err(AuthzError::MissingRole);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use schoolbooks_auth::Locale;
    use schoolbooks_core::{SchoolId, UserId};

    use super::*;

    fn admin_of(school: Option<SchoolId>, roles: Vec<Role>) -> AccessClaims {
        AccessClaims {
            user_id: UserId::new(),
            school_id: school,
            username: "admin".to_string(),
            roles,
            locale: Locale::De,
            exp: 0,
            iss: "test".to_string(),
        }
    }

    fn user(school: Option<SchoolId>, roles: Vec<Role>) -> Identity {
        Identity {
            id: UserId::new(),
            school_id: school,
            username: "target".to_string(),
            roles,
            locale: Locale::De,
        }
    }

    #[test]
    fn admin_manages_own_school() {
        let school = SchoolId::new();
        let claims = admin_of(Some(school), vec![Role::Admin]);
        let current = user(Some(school), vec![Role::User]);
        let mut requested = current.clone();
        requested.roles = vec![Role::Superuser, Role::User];
        assert!(authorize_user_update(&claims, &current, &requested).is_ok());
    }

    #[test]
    fn admin_may_adopt_unassigned_users() {
        let school = SchoolId::new();
        let claims = admin_of(Some(school), vec![Role::Admin]);
        let current = user(None, vec![Role::User]);
        let mut requested = current.clone();
        requested.school_id = Some(school);
        assert!(authorize_user_update(&claims, &current, &requested).is_ok());

        requested.school_id = Some(SchoolId::new());
        assert_eq!(
            authorize_user_update(&claims, &current, &requested),
            Err(AuthzError::SchoolMismatch)
        );
    }

    #[test]
    fn admin_cannot_reach_other_schools() {
        let claims = admin_of(Some(SchoolId::new()), vec![Role::Admin]);
        let current = user(Some(SchoolId::new()), vec![Role::User]);
        assert_eq!(
            authorize_user_update(&claims, &current, &current.clone()),
            Err(AuthzError::SchoolMismatch)
        );
    }

    #[test]
    fn admin_cannot_grant_sys_admin() {
        let school = SchoolId::new();
        let claims = admin_of(Some(school), vec![Role::Admin]);
        let current = user(Some(school), vec![Role::User]);
        let mut requested = current.clone();
        requested.roles = vec![Role::SysAdmin];
        assert_eq!(
            authorize_user_update(&claims, &current, &requested),
            Err(AuthzError::MissingRole)
        );
    }

    #[test]
    fn admin_cannot_edit_a_sys_admin_account() {
        let school = SchoolId::new();
        let claims = admin_of(Some(school), vec![Role::Admin]);
        let current = user(Some(school), vec![Role::SysAdmin]);
        let mut requested = current.clone();
        requested.username = "hijacked".to_string();
        assert_eq!(
            authorize_user_update(&claims, &current, &requested),
            Err(AuthzError::MissingRole)
        );
        assert_eq!(
            authorize_user_update(&claims, &current, &current.clone()),
            Err(AuthzError::MissingRole)
        );
    }

    #[test]
    fn sys_admin_may_do_anything() {
        let claims = admin_of(None, vec![Role::SysAdmin]);
        let current = user(Some(SchoolId::new()), vec![Role::User]);
        let mut requested = current.clone();
        requested.school_id = None;
        requested.roles = vec![Role::SysAdmin];
        assert!(authorize_user_update(&claims, &current, &requested).is_ok());
    }
}
