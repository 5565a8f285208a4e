//! Account operations shared by both representations.
//!
//! Each function authorizes the requester, runs the admission policy where it
//! applies and calls the engine. The HTML and machine presenters only decide
//! how the outcome is shown.

use api_types::user::UserNew;
use engine::{
    Admission, AdmissionContext, AuthType, AuthTypeChange, Denial, EngineError, NewUser,
    PasswordChange, SignupView, User, admission,
};

use crate::{Requester, server::ServerState};

/// Why an operation refused the requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Refusal {
    /// Nobody is logged in.
    NotLoggedIn,
    /// Logged in, but not allowed.
    NotPermitted,
}

/// Who may run an operation.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Access {
    Admin,
    AdminOrSelf(i32),
    SelfOnly(i32),
}

pub(crate) fn authorize(requester: &Requester, access: Access) -> Result<&User, Refusal> {
    let user = requester.user.as_ref().ok_or(Refusal::NotLoggedIn)?;
    let allowed = match access {
        Access::Admin => user.is_admin,
        Access::AdminOrSelf(id) => user.is_admin || user.id == id,
        Access::SelfOnly(id) => user.id == id,
    };
    if allowed {
        Ok(user)
    } else {
        Err(Refusal::NotPermitted)
    }
}

#[derive(Debug)]
pub(crate) enum CreateError {
    Denied(Denial),
    /// Required keys missing or empty in a machine payload.
    Malformed,
    Engine(EngineError),
}

impl From<EngineError> for CreateError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::Denied(denial) => denied(denial),
            other => Self::Engine(other),
        }
    }
}

async fn admission_context(
    state: &ServerState,
    requester: &Requester,
    tos_accepted: bool,
) -> Result<AdmissionContext, EngineError> {
    let site = state.engine.site();
    Ok(AdmissionContext {
        store_empty: state.engine.no_users_yet().await?,
        requester_is_admin: requester.is_admin(),
        open_signups: site.open_signups,
        tos_published: site.tos_published(),
        tos_accepted,
    })
}

fn denied(denial: Denial) -> CreateError {
    tracing::warn!(?denial, "signup denied");
    CreateError::Denied(denial)
}

fn has_required_keys(payload: &UserNew) -> bool {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
    present(&payload.login) && present(&payload.password)
}

/// Admit, validate and store a signup.
///
/// `strict` is the machine contract: `login` and `password` must be present
/// and a missing confirmation repeats the password.
pub(crate) async fn create_account(
    state: &ServerState,
    requester: &Requester,
    payload: UserNew,
    locale: Option<&str>,
    strict: bool,
) -> Result<(User, Admission), CreateError> {
    let context = admission_context(state, requester, payload.tos_accepted()).await?;
    let admission = admission::admit(&context).map_err(denied)?;
    if strict && !has_required_keys(&payload) {
        return Err(CreateError::Malformed);
    }
    admission::check_terms(&context).map_err(denied)?;

    let password = payload.password.unwrap_or_default();
    let password_confirmation = match payload.password_confirmation {
        Some(confirmation) => confirmation,
        None if strict => password.clone(),
        None => String::new(),
    };
    let new_user = NewUser {
        login: payload.login.unwrap_or_default(),
        password,
        password_confirmation,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        auth_type: payload.auth_type,
        open_id_url: payload.open_id_url,
    };

    let user = state
        .engine
        .create_user(new_user, admission, locale)
        .await?;
    tracing::info!(
        user_id = user.id,
        login = %user.login,
        is_admin = user.is_admin,
        ?admission,
        "account created"
    );
    Ok((user, admission))
}

/// What the signup page should show.
pub(crate) struct SignupForm {
    pub view: SignupView,
    pub auth_types: Vec<AuthType>,
}

pub(crate) async fn signup_form(
    state: &ServerState,
    requester: &Requester,
) -> Result<SignupForm, EngineError> {
    let context = admission_context(state, requester, false).await?;
    let auth_types = if requester.cas_user.is_some() {
        vec![AuthType::Cas]
    } else {
        state.engine.site().auth_schemes.clone()
    };
    Ok(SignupForm {
        view: admission::signup_view(&context),
        auth_types,
    })
}

pub(crate) struct Deleted {
    pub user: User,
    /// The requester deleted their own account.
    pub own_account: bool,
    pub remaining: u64,
}

#[derive(Debug)]
pub(crate) enum AccessError {
    Refused(Refusal),
    Engine(EngineError),
}

impl From<EngineError> for AccessError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<Refusal> for AccessError {
    fn from(value: Refusal) -> Self {
        Self::Refused(value)
    }
}

pub(crate) async fn destroy_account(
    state: &ServerState,
    requester: &Requester,
    user_id: i32,
) -> Result<Deleted, AccessError> {
    authorize(requester, Access::AdminOrSelf(user_id))?;
    let user = state.engine.delete_user(user_id).await?;
    let own_account = requester.is(user_id);
    tracing::info!(user_id, login = %user.login, own_account, "account deleted");

    Ok(Deleted {
        user,
        own_account,
        remaining: state.engine.count_users().await?,
    })
}

pub(crate) async fn update_password(
    state: &ServerState,
    requester: &Requester,
    user_id: i32,
    change: PasswordChange,
) -> Result<(), AccessError> {
    authorize(requester, Access::SelfOnly(user_id))?;
    state.engine.change_password(user_id, change).await?;
    tracing::info!(user_id, "password changed");
    Ok(())
}

pub(crate) async fn update_auth_type(
    state: &ServerState,
    requester: &Requester,
    user_id: i32,
    change: AuthTypeChange,
) -> Result<User, AccessError> {
    authorize(requester, Access::SelfOnly(user_id))?;
    let user = state.engine.change_auth_type(user_id, change).await?;
    tracing::info!(user_id, auth_type = %user.auth_type, "authentication type changed");
    Ok(user)
}

pub(crate) async fn refresh_token(
    state: &ServerState,
    requester: &Requester,
    user_id: i32,
) -> Result<String, AccessError> {
    authorize(requester, Access::SelfOnly(user_id))?;
    let token = state.engine.refresh_token(user_id).await?;
    tracing::info!(user_id, "api token refreshed");
    Ok(token)
}
