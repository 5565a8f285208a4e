use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Authentication scheme of an account.
///
/// Only `Database` accounts carry a password the engine can verify; the other
/// schemes delegate to an external identity provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    Database,
    Cas,
    OpenId,
    Ldap,
}

impl AuthType {
    /// Returns the canonical string stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Cas => "cas",
            Self::OpenId => "open_id",
            Self::Ldap => "ldap",
        }
    }

    pub fn uses_password(self) -> bool {
        matches!(self, Self::Database)
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AuthType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "database" => Ok(Self::Database),
            "cas" => Ok(Self::Cas),
            "open_id" => Ok(Self::OpenId),
            "ldap" => Ok(Self::Ldap),
            other => Err(EngineError::InvalidAuthType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_names_parse_back() {
        for auth in [
            AuthType::Database,
            AuthType::Cas,
            AuthType::OpenId,
            AuthType::Ldap,
        ] {
            assert_eq!(AuthType::try_from(auth.as_str()), Ok(auth));
        }
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert_eq!(
            AuthType::try_from("kerberos"),
            Err(EngineError::InvalidAuthType("kerberos".to_string()))
        );
    }
}
