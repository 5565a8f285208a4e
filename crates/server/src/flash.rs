//! One-shot notices carried across a redirect in a cookie.
//!
//! A rejected signup also stashes the submitted fields and their errors so the
//! next signup form can be filled back in.

use api_types::user::UserNew;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

const FLASH_COOKIE: &str = "tracks_flash";
const RETURN_TO_COOKIE: &str = "tracks_return_to";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Level {
    Notice,
    Warning,
    Error,
}

impl Level {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Signup fields (passwords stripped) with the errors they raised.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct PendingSignup {
    pub user: UserNew,
    pub errors: Vec<(String, String)>,
}

impl PendingSignup {
    pub(crate) fn new(mut user: UserNew, errors: Vec<(String, String)>) -> Self {
        user.password = None;
        user.password_confirmation = None;
        Self { user, errors }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Flash {
    pub level: Level,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingSignup>,
}

impl Flash {
    pub(crate) fn notice(message: impl Into<String>) -> Self {
        Self {
            level: Level::Notice,
            message: message.into(),
            pending: None,
        }
    }

    pub(crate) fn warning(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
            pending: None,
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            pending: None,
        }
    }

    pub(crate) fn with_pending(mut self, pending: PendingSignup) -> Self {
        self.pending = Some(pending);
        self
    }

    fn encode(&self) -> Option<String> {
        serde_json::to_vec(self)
            .ok()
            .map(|json| URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(value: &str) -> Option<Self> {
        let json = URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

fn cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Queue a flash for the next page.
pub(crate) fn set(jar: CookieJar, flash: Flash) -> CookieJar {
    match flash.encode() {
        Some(value) => jar.add(cookie(FLASH_COOKIE, value)),
        None => {
            tracing::error!("failed to encode flash message");
            jar
        }
    }
}

/// Read the pending flash and clear it.
pub(crate) fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(value) = jar.get(FLASH_COOKIE).map(|c| c.value().to_string()) else {
        return (jar, None);
    };
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, Flash::decode(&value))
}

/// Remember where to come back after an admin-initiated signup.
pub(crate) fn store_location(jar: CookieJar, location: String) -> CookieJar {
    jar.add(cookie(RETURN_TO_COOKIE, location))
}

/// The stored location (cleared) or `/`.
pub(crate) fn take_location(jar: CookieJar) -> (CookieJar, String) {
    let Some(location) = jar
        .get(RETURN_TO_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|location| location.starts_with('/') && !location.starts_with("//"))
    else {
        return (jar, "/".to_string());
    };
    let jar = jar.remove(Cookie::build(RETURN_TO_COOKIE).path("/"));
    (jar, location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_survives_the_cookie_and_is_cleared() {
        let pending = PendingSignup::new(
            UserNew {
                login: Some("ja".to_string()),
                password: Some("secret".to_string()),
                ..UserNew::default()
            },
            vec![(
                "login".to_string(),
                "Login must be between 3 and 80 characters long".to_string(),
            )],
        );
        let jar = set(
            CookieJar::new(),
            Flash::error("Login must be between 3 and 80 characters long").with_pending(pending),
        );

        let (jar, flash) = take(jar);
        let flash = flash.unwrap();
        assert_eq!(flash.level, Level::Error);
        let pending = flash.pending.unwrap();
        assert_eq!(pending.user.login.as_deref(), Some("ja"));
        assert_eq!(pending.user.password, None);
        assert_eq!(pending.errors.len(), 1);

        let (_, again) = take(jar);
        assert!(again.is_none());
    }

    #[test]
    fn tampered_flash_is_ignored() {
        let jar = CookieJar::new().add(cookie(FLASH_COOKIE, "not base64!".to_string()));
        let (_, flash) = take(jar);
        assert!(flash.is_none());
    }

    #[test]
    fn only_local_locations_are_followed() {
        let jar = store_location(CookieJar::new(), "//evil.example.com".to_string());
        assert_eq!(take_location(jar).1, "/");

        let jar = store_location(CookieJar::new(), "/users?page=2".to_string());
        assert_eq!(take_location(jar).1, "/users?page=2");
    }
}
