//! Request-scoped identity.
//!
//! Browsers are identified by the session cookie, API clients by HTTP Basic
//! credentials. Nothing here fails the request: an unknown cookie or wrong
//! credentials just leave the requester anonymous, and each operation decides
//! what an anonymous caller may do.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{Authorization, HeaderMapExt, authorization::Basic},
};
use engine::{EngineError, User};

use crate::{ServerError, server::ServerState};

pub const SESSION_COOKIE: &str = "tracks_session";

/// Who is calling.
#[derive(Clone, Debug, Default)]
pub struct Requester {
    pub user: Option<User>,
    /// Set when the caller presented a live session cookie.
    pub session_id: Option<String>,
    /// External CAS identity carried by the session.
    pub cas_user: Option<String>,
}

impl Requester {
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|user| user.is_admin)
    }

    pub fn is(&self, user_id: i32) -> bool {
        self.user.as_ref().is_some_and(|user| user.id == user_id)
    }
}

impl FromRequestParts<ServerState> for Requester {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(cookie) = jar.get(SESSION_COOKIE)
            && let Some(session) = state.engine.session(cookie.value()).await?
        {
            let user = match session.user_id {
                Some(user_id) => match state.engine.user(user_id).await {
                    Ok(user) => Some(user),
                    Err(EngineError::KeyNotFound(_)) => None,
                    Err(err) => return Err(err.into()),
                },
                None => None,
            };
            return Ok(Self {
                user,
                session_id: Some(session.id),
                cas_user: session.cas_user,
            });
        }

        if let Some(Authorization(basic)) = parts.headers.typed_get::<Authorization<Basic>>() {
            let user = state
                .engine
                .authenticate(basic.username(), basic.password())
                .await?;
            if user.is_none() {
                tracing::warn!(login = basic.username(), "basic authentication failed");
            }
            return Ok(Self {
                user,
                ..Self::default()
            });
        }

        Ok(Self::default())
    }
}

pub(crate) fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub(crate) fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
