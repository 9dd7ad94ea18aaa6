use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// The set is closed; there is no ordering or inheritance between roles.
/// `SysAdmin` is the only role with special meaning to the policy layer
/// (see [`crate::authorize`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SysAdmin,
    Admin,
    Superuser,
    User,
}

impl Role {
    /// Every role, most privileged first.
    pub const ALL: [Role; 4] = [Role::SysAdmin, Role::Admin, Role::Superuser, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SysAdmin => "SYS_ADMIN",
            Role::Admin => "ADMIN",
            Role::Superuser => "SUPERUSER",
            Role::User => "USER",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// User interface language.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Locale {
    #[default]
    De,
    En,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::De => "DE",
            Locale::En => "EN",
        }
    }
}

impl core::fmt::Display for Locale {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DE" => Ok(Locale::De),
            "EN" => Ok(Locale::En),
            _ => Err(format!("unknown locale: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::SysAdmin).unwrap(), "\"SYS_ADMIN\"");
        assert_eq!(serde_json::to_string(&Role::Superuser).unwrap(), "\"SUPERUSER\"");
        let parsed: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(parsed, Role::Admin);
    }

    #[test]
    fn role_from_str_matches_display() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn locale_defaults_to_german() {
        assert_eq!(Locale::default(), Locale::De);
        assert_eq!(serde_json::to_string(&Locale::En).unwrap(), "\"EN\"");
        assert_eq!("DE".parse::<Locale>().unwrap(), Locale::De);
    }
}
