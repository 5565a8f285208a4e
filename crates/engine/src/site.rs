use serde::Deserialize;

use crate::AuthType;

/// Site-wide settings consulted by the account operations.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    /// Contact address shown when signups are closed.
    pub admin_email: String,
    pub open_signups: bool,
    pub tos_link: Option<String>,
    /// Schemes offered on the signup form, in display order.
    pub auth_schemes: Vec<AuthType>,
    /// Accounts per page on the interactive list.
    pub per_page: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Tracks".to_string(),
            admin_email: "admin@example.com".to_string(),
            open_signups: false,
            tos_link: None,
            auth_schemes: vec![AuthType::Database],
            per_page: 20,
        }
    }
}

impl SiteConfig {
    /// The terms of service link, if a non-blank one is configured.
    pub fn tos_link(&self) -> Option<&str> {
        self.tos_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }

    pub fn tos_published(&self) -> bool {
        self.tos_link().is_some()
    }

    pub fn scheme_enabled(&self, auth_type: AuthType) -> bool {
        self.auth_schemes.contains(&auth_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tos_link_is_not_published() {
        let site = SiteConfig {
            tos_link: Some("   ".to_string()),
            ..SiteConfig::default()
        };
        assert!(!site.tos_published());

        let site = SiteConfig {
            tos_link: Some("https://example.com/tos".to_string()),
            ..SiteConfig::default()
        };
        assert_eq!(site.tos_link(), Some("https://example.com/tos"));
    }
}
