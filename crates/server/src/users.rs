//! `/users` endpoints.
//!
//! Handlers extract the request context, run the shared account operation and
//! hand the outcome to the presenter of the negotiated representation.

use api_types::user::{
    self as wire, AuthTypeUpdate, PasswordUpdate, UserNew, UserView, UsersList, UsersQuery,
};
use axum::{
    Form,
    body::Bytes,
    extract::{FromRequest, Path, Query, Request, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use engine::{AuthType, EngineError, User, UserOrder};
use serde::Deserialize;

use crate::{
    Format, MALFORMED_USER_MESSAGE, Requester, ServerError, TOS_MESSAGE,
    accounts::{self, AccessError, CreateError},
    format::split_extension,
    html, machine,
    server::ServerState,
    session,
};

const CREATED_MESSAGE: &str = "User created.";

pub(crate) fn user_view(user: &User) -> UserView {
    UserView {
        id: user.id,
        login: user.login.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        auth_type: match user.auth_type {
            AuthType::Database => wire::AuthType::Database,
            AuthType::Cas => wire::AuthType::Cas,
            AuthType::OpenId => wire::AuthType::OpenId,
            AuthType::Ldap => wire::AuthType::Ldap,
        },
        open_id_url: user.open_id_url.clone(),
        is_admin: user.is_admin,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

/// Parse `12` or `12.xml` into an account id.
fn user_id(segment: &str) -> Result<i32, ServerError> {
    let (stem, _) = split_extension(segment);
    stem.parse()
        .map_err(|_| EngineError::KeyNotFound(format!("user {stem}")).into())
}

/// Primary language subtag of `Accept-Language`.
fn request_locale(headers: &HeaderMap) -> Option<String> {
    let accept = headers.get(header::ACCEPT_LANGUAGE)?.to_str().ok()?;
    let first = accept.split(',').next()?.split(';').next()?.trim();
    let primary = first.split(['-', '_']).next()?.to_ascii_lowercase();
    (!primary.is_empty() && primary.chars().all(|c| c.is_ascii_alphabetic())).then_some(primary)
}

fn require_admin(requester: &Requester) -> Result<&User, ServerError> {
    accounts::authorize(requester, accounts::Access::Admin).map_err(|_| ServerError::Unauthorized)
}

pub async fn index(
    State(state): State<ServerState>,
    format: Format,
    requester: Requester,
    jar: CookieJar,
    Query(query): Query<UsersQuery>,
    uri: Uri,
) -> Response {
    if !format.is_machine() {
        let location = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
        return html::index(&state, &requester, jar, query, location)
            .await
            .unwrap_or_else(IntoResponse::into_response);
    }

    machine_index(&state, format, &requester, query)
        .await
        .unwrap_or_else(|err| err.into_response_for(format))
}

async fn machine_index(
    state: &ServerState,
    format: Format,
    requester: &Requester,
    query: UsersQuery,
) -> Result<Response, ServerError> {
    require_admin(requester)?;
    let order = UserOrder::parse(query.order.as_deref());
    let users: Vec<UserView> = state
        .engine
        .list_users(order)
        .await?
        .iter()
        .map(user_view)
        .collect();

    Ok(match format {
        Format::Json => machine::document(format, StatusCode::OK, &users),
        _ => machine::document(format, StatusCode::OK, &UsersList { users }),
    })
}

/// Show is machine-only; HTML callers get XML.
pub async fn show(
    State(state): State<ServerState>,
    format: Format,
    requester: Requester,
    Path(segment): Path<String>,
) -> Response {
    let format = if format == Format::Json {
        Format::Json
    } else {
        Format::Xml
    };
    let shown = async {
        require_admin(&requester)?;
        let user = state.engine.user(user_id(&segment)?).await?;
        Ok::<_, ServerError>(machine::document(
            format,
            StatusCode::OK,
            &user_view(&user),
        ))
    };
    shown
        .await
        .unwrap_or_else(|err| err.into_response_for(format))
}

pub async fn new(
    State(state): State<ServerState>,
    requester: Requester,
    jar: CookieJar,
) -> Result<Response, ServerError> {
    html::new(&state, &requester, jar).await
}

/// Accepts a urlencoded form, an XML `<user>` document or JSON.
pub async fn create(
    State(state): State<ServerState>,
    format: Format,
    requester: Requester,
    jar: CookieJar,
    request: Request,
) -> Response {
    let locale = request_locale(request.headers());
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let payload = if content_type.starts_with("application/x-www-form-urlencoded") {
        Form::<UserNew>::from_request(request, &state)
            .await
            .ok()
            .map(|Form(payload)| payload)
    } else {
        Bytes::from_request(request, &state)
            .await
            .ok()
            .and_then(|body| machine::decode(&content_type, &body))
    };

    if !format.is_machine() {
        return html::create(
            &state,
            &requester,
            jar,
            payload.unwrap_or_default(),
            locale.as_deref(),
        )
        .await
        .unwrap_or_else(IntoResponse::into_response);
    }

    let Some(payload) = payload else {
        tracing::warn!("malformed signup payload");
        return ServerError::Malformed(MALFORMED_USER_MESSAGE.to_string())
            .into_response_for(format);
    };
    match accounts::create_account(&state, &requester, payload, locale.as_deref(), true).await {
        Ok(_) => machine::text(StatusCode::OK, CREATED_MESSAGE),
        Err(err) => {
            let err = match err {
                CreateError::Denied(engine::Denial::SignupsClosed) => ServerError::Unauthorized,
                CreateError::Denied(engine::Denial::TermsNotAccepted) => {
                    ServerError::Forbidden(TOS_MESSAGE.to_string())
                }
                CreateError::Malformed => {
                    ServerError::Malformed(MALFORMED_USER_MESSAGE.to_string())
                }
                CreateError::Engine(err) => err.into(),
            };
            err.into_response_for(format)
        }
    }
}

pub async fn destroy(
    State(state): State<ServerState>,
    format: Format,
    requester: Requester,
    jar: CookieJar,
    Path(segment): Path<String>,
) -> Response {
    let user_id = match user_id(&segment) {
        Ok(id) => id,
        Err(err) => return err.into_response_for(format),
    };

    match format {
        Format::Html => html::destroy(&state, &requester, jar, user_id, false).await,
        Format::Js => html::destroy(&state, &requester, jar, user_id, true).await,
        Format::Xml | Format::Json => {
            match accounts::destroy_account(&state, &requester, user_id).await {
                Ok(deleted) if deleted.own_account => {
                    (jar.remove(session::expired_session_cookie()), StatusCode::OK).into_response()
                }
                Ok(_) => StatusCode::OK.into_response(),
                Err(AccessError::Refused(_)) => {
                    ServerError::Unauthorized.into_response_for(format)
                }
                Err(AccessError::Engine(err)) => ServerError::from(err).into_response_for(format),
            }
        }
    }
}

/// Browsers without `DELETE` post a `_method=delete` field.
#[derive(Debug, Deserialize)]
pub struct MethodOverride {
    #[serde(rename = "_method", default)]
    method: String,
}

pub async fn destroy_via_form(
    state: State<ServerState>,
    format: Format,
    requester: Requester,
    jar: CookieJar,
    segment: Path<String>,
    Form(form): Form<MethodOverride>,
) -> Response {
    if !form.method.eq_ignore_ascii_case("delete") {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    destroy(state, format, requester, jar, segment).await
}

pub async fn change_password(
    State(state): State<ServerState>,
    requester: Requester,
    jar: CookieJar,
    Path(segment): Path<String>,
) -> Result<Response, ServerError> {
    Ok(html::change_password(
        &state,
        &requester,
        jar,
        user_id(&segment)?,
    ))
}

pub async fn update_password(
    State(state): State<ServerState>,
    requester: Requester,
    jar: CookieJar,
    Path(segment): Path<String>,
    Form(update): Form<PasswordUpdate>,
) -> Result<Response, ServerError> {
    Ok(html::update_password(&state, &requester, jar, user_id(&segment)?, update).await)
}

pub async fn change_auth_type(
    State(state): State<ServerState>,
    requester: Requester,
    jar: CookieJar,
    Path(segment): Path<String>,
) -> Result<Response, ServerError> {
    Ok(html::change_auth_type(
        &state,
        &requester,
        jar,
        user_id(&segment)?,
    ))
}

pub async fn update_auth_type(
    State(state): State<ServerState>,
    requester: Requester,
    jar: CookieJar,
    Path(segment): Path<String>,
    Form(update): Form<AuthTypeUpdate>,
) -> Result<Response, ServerError> {
    Ok(html::update_auth_type(&state, &requester, jar, user_id(&segment)?, update).await)
}

pub async fn refresh_token(
    State(state): State<ServerState>,
    requester: Requester,
    jar: CookieJar,
    Path(segment): Path<String>,
) -> Result<Response, ServerError> {
    html::refresh_token(&state, &requester, jar, user_id(&segment)?).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn ids_accept_a_format_suffix() {
        assert_eq!(user_id("12").unwrap(), 12);
        assert_eq!(user_id("12.xml").unwrap(), 12);
        assert_eq!(
            user_id("abc").unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn locale_is_the_primary_language_subtag() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_locale(&headers), None);

        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("de-CH,de;q=0.9,en;q=0.8"),
        );
        assert_eq!(request_locale(&headers).as_deref(), Some("de"));

        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("*"));
        assert_eq!(request_locale(&headers), None);
    }
}
