//! Interactive presenter: pages, redirects and flash notices.

use api_types::user::{AuthTypeUpdate, PasswordUpdate, UserNew, UsersQuery};
use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use engine::{
    AuthTypeChange, Denial, EngineError, PasswordChange, SignupView, UserOrder, field_messages,
    full_messages,
};

use crate::{
    Requester, ServerError, UNAUTHORIZED_MESSAGE,
    accounts::{self, AccessError, CreateError, Refusal},
    flash::{self, Flash, PendingSignup},
    server::ServerState,
    session, views,
};

/// Login screen of the surrounding application.
pub(crate) const LOGIN_PATH: &str = "/login";
/// Preferences screen of the surrounding application.
pub(crate) const PREFERENCES_PATH: &str = "/preferences";
const SIGNUP_PATH: &str = "/users/new";
const USERS_PATH: &str = "/users";

fn redirect(jar: CookieJar, to: &str) -> Response {
    (jar, Redirect::to(to)).into_response()
}

fn notify(jar: CookieJar, flash: Flash, to: &str) -> Response {
    redirect(flash::set(jar, flash), to)
}

fn page(state: &ServerState, jar: CookieJar, title: &str, body: &str) -> Response {
    let (jar, flash) = flash::take(jar);
    let html = views::layout(state.engine.site(), title, flash.as_ref(), body);
    (jar, Html(html)).into_response()
}

fn refused(jar: CookieJar, refusal: Refusal) -> Response {
    match refusal {
        Refusal::NotLoggedIn => notify(jar, Flash::warning("Please log in first."), LOGIN_PATH),
        Refusal::NotPermitted => notify(jar, Flash::error(UNAUTHORIZED_MESSAGE), "/"),
    }
}

/// Human-readable text of an engine failure. Store failures are logged and
/// replaced by a generic message.
fn describe(err: EngineError) -> String {
    match err {
        EngineError::Validation(errors) => full_messages(&errors).join(", "),
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "Something went wrong, please try again.".to_string()
        }
        EngineError::Credential(details) => {
            tracing::error!("credential service error: {details}");
            "Something went wrong, please try again.".to_string()
        }
        other => other.to_string(),
    }
}

pub(crate) async fn index(
    state: &ServerState,
    requester: &Requester,
    jar: CookieJar,
    query: UsersQuery,
    location: String,
) -> Result<Response, ServerError> {
    let current = match accounts::authorize(requester, accounts::Access::Admin) {
        Ok(user) => user,
        Err(refusal) => return Ok(refused(jar, refusal)),
    };

    let order = UserOrder::parse(query.order.as_deref());
    let users = state
        .engine
        .users_page(order, query.page.unwrap_or(1))
        .await?;
    let jar = flash::store_location(jar, location);
    let body = views::users_index(&users, order, Some(current));
    Ok(page(state, jar, "Manage users", &body))
}

pub(crate) async fn new(
    state: &ServerState,
    requester: &Requester,
    jar: CookieJar,
) -> Result<Response, ServerError> {
    let form = accounts::signup_form(state, requester).await?;
    let site = state.engine.site();
    if form.view == SignupView::Closed {
        return Ok(page(
            state,
            jar,
            views::signup_title(form.view),
            &views::no_signup(site),
        ));
    }

    let (jar, flash) = flash::take(jar);
    let pending = flash.as_ref().and_then(|flash| flash.pending.as_ref());
    let body = views::signup(site, &form, pending);
    let html = views::layout(site, views::signup_title(form.view), flash.as_ref(), &body);
    Ok((jar, Html(html)).into_response())
}

pub(crate) async fn create(
    state: &ServerState,
    requester: &Requester,
    jar: CookieJar,
    payload: UserNew,
    locale: Option<&str>,
) -> Result<Response, ServerError> {
    let (user, admission) =
        match accounts::create_account(state, requester, payload.clone(), locale, false).await {
            Ok(created) => created,
            Err(CreateError::Denied(Denial::SignupsClosed)) => {
                let body = views::no_signup(state.engine.site());
                return Ok(page(
                    state,
                    jar,
                    views::signup_title(SignupView::Closed),
                    &body,
                ));
            }
            Err(CreateError::Denied(Denial::TermsNotAccepted)) => {
                let pending = PendingSignup::new(payload, Vec::new());
                let flash =
                    Flash::error("You must accept the Terms of Service").with_pending(pending);
                return Ok(notify(jar, flash, SIGNUP_PATH));
            }
            Err(CreateError::Engine(EngineError::Validation(errors))) => {
                let pending = PendingSignup::new(payload, field_messages(&errors));
                let flash = Flash::error(full_messages(&errors).join(", ")).with_pending(pending);
                return Ok(notify(jar, flash, SIGNUP_PATH));
            }
            Err(CreateError::Engine(err)) => {
                return Ok(notify(jar, Flash::error(describe(err)), SIGNUP_PATH));
            }
            Err(CreateError::Malformed) => {
                return Ok(notify(
                    jar,
                    Flash::error(crate::MALFORMED_USER_MESSAGE),
                    SIGNUP_PATH,
                ));
            }
        };

    let notice = Flash::notice(format!("Signup successful for user {}.", user.login));
    if admission.starts_session() {
        let session = state.engine.open_session(user.id).await?;
        let jar = jar.add(session::session_cookie(session.id));
        return Ok(notify(jar, notice, "/"));
    }
    let (jar, location) = flash::take_location(jar);
    Ok(notify(jar, notice, &location))
}

pub(crate) async fn destroy(
    state: &ServerState,
    requester: &Requester,
    jar: CookieJar,
    user_id: i32,
    script: bool,
) -> Response {
    match accounts::destroy_account(state, requester, user_id).await {
        Ok(deleted) => {
            let jar = if deleted.own_account {
                jar.remove(session::expired_session_cookie())
            } else {
                jar
            };
            if script {
                let js = views::destroy_js(deleted.user.id, deleted.remaining);
                return (
                    jar,
                    [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
                    js,
                )
                    .into_response();
            }
            let notice = Flash::notice(format!("Successfully deleted user {}", deleted.user.login));
            let to = if deleted.own_account {
                LOGIN_PATH
            } else {
                USERS_PATH
            };
            notify(jar, notice, to)
        }
        Err(AccessError::Refused(_)) if script => {
            (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE).into_response()
        }
        Err(AccessError::Refused(refusal)) => refused(jar, refusal),
        Err(AccessError::Engine(err)) => {
            tracing::warn!(user_id, "failed to delete user: {err}");
            if script {
                return ServerError::from(err).into_response();
            }
            notify(
                jar,
                Flash::error(format!("Failed to delete user {user_id}")),
                USERS_PATH,
            )
        }
    }
}

pub(crate) fn change_password(
    state: &ServerState,
    requester: &Requester,
    jar: CookieJar,
    user_id: i32,
) -> Response {
    match accounts::authorize(requester, accounts::Access::SelfOnly(user_id)) {
        Ok(user) => page(state, jar, "Change password", &views::change_password(user)),
        Err(refusal) => refused(jar, refusal),
    }
}

pub(crate) async fn update_password(
    state: &ServerState,
    requester: &Requester,
    jar: CookieJar,
    user_id: i32,
    update: PasswordUpdate,
) -> Response {
    let change = PasswordChange {
        password: update.password,
        password_confirmation: update.password_confirmation,
    };
    match accounts::update_password(state, requester, user_id, change).await {
        Ok(()) => notify(jar, Flash::notice("Password updated."), PREFERENCES_PATH),
        Err(AccessError::Refused(refusal)) => refused(jar, refusal),
        Err(AccessError::Engine(err)) => notify(
            jar,
            Flash::error(describe(err)),
            &format!("/users/{user_id}/change_password"),
        ),
    }
}

pub(crate) fn change_auth_type(
    state: &ServerState,
    requester: &Requester,
    jar: CookieJar,
    user_id: i32,
) -> Response {
    match accounts::authorize(requester, accounts::Access::SelfOnly(user_id)) {
        Ok(user) => {
            let body = views::change_auth_type(user, &state.engine.site().auth_schemes);
            page(state, jar, "Change authentication type", &body)
        }
        Err(refusal) => refused(jar, refusal),
    }
}

pub(crate) async fn update_auth_type(
    state: &ServerState,
    requester: &Requester,
    jar: CookieJar,
    user_id: i32,
    update: AuthTypeUpdate,
) -> Response {
    let change = AuthTypeChange {
        auth_type: update.auth_type,
        open_id_url: update.open_id_url,
    };
    match accounts::update_auth_type(state, requester, user_id, change).await {
        Ok(_) => notify(
            jar,
            Flash::notice("Authentication type updated."),
            PREFERENCES_PATH,
        ),
        Err(AccessError::Refused(refusal)) => refused(jar, refusal),
        Err(AccessError::Engine(err)) => notify(
            jar,
            Flash::warning(format!(
                "Could not update authentication type: {}",
                describe(err)
            )),
            &format!("/users/{user_id}/change_auth_type"),
        ),
    }
}

/// A store failure is not recovered here.
pub(crate) async fn refresh_token(
    state: &ServerState,
    requester: &Requester,
    jar: CookieJar,
    user_id: i32,
) -> Result<Response, ServerError> {
    match accounts::refresh_token(state, requester, user_id).await {
        Ok(_) => Ok(notify(
            jar,
            Flash::notice("New token successfully generated"),
            PREFERENCES_PATH,
        )),
        Err(AccessError::Refused(refusal)) => Ok(refused(jar, refusal)),
        Err(AccessError::Engine(err)) => Err(err.into()),
    }
}
