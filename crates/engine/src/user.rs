//! Account domain types.
//!
//! [`User`] is the read model handed out by the engine. It has no password
//! field at all, so no representation built from it can leak the hash.

use chrono::{DateTime, Utc};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{AuthType, EngineError, SiteConfig, preferences, sessions, users, util};

pub const LOGIN_MIN: usize = 3;
pub const LOGIN_MAX: usize = 80;
pub const PASSWORD_MIN: usize = 5;
pub const PASSWORD_MAX: usize = 72;

/// A stored account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub login: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub auth_type: AuthType,
    pub open_id_url: Option<String>,
    pub token: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", falling back to the login.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.login.clone()
        } else {
            name
        }
    }
}

impl TryFrom<users::Model> for User {
    type Error = EngineError;

    fn try_from(model: users::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            auth_type: AuthType::try_from(model.auth_type.as_str())?,
            login: model.login,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            open_id_url: model.open_id_url,
            token: model.token,
            is_admin: model.is_admin,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Signup submission.
///
/// `auth_type` stays a raw string until validation so an unknown scheme is
/// reported as a field error rather than a parse failure.
#[derive(Clone, Debug, Default, Validate)]
pub struct NewUser {
    pub login: String,
    pub password: String,
    pub password_confirmation: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
    pub auth_type: Option<String>,
    pub open_id_url: Option<String>,
}

impl NewUser {
    /// Trim every field and compose the login.
    pub(crate) fn normalized(self) -> Self {
        Self {
            login: util::normalize_login(&self.login),
            password: self.password,
            password_confirmation: self.password_confirmation,
            first_name: util::normalize_optional_text(self.first_name.as_deref()),
            last_name: util::normalize_optional_text(self.last_name.as_deref()),
            email: util::normalize_optional_text(self.email.as_deref()),
            auth_type: util::normalize_optional_text(self.auth_type.as_deref()),
            open_id_url: util::normalize_optional_text(self.open_id_url.as_deref()),
        }
    }

    /// Run every account rule and return the resolved scheme.
    pub(crate) fn check(&self, site: &SiteConfig) -> Result<AuthType, ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);

        let login_length = self.login.chars().count();
        if login_length == 0 {
            add(&mut errors, "login", "blank", "Login can't be blank");
        } else if !(LOGIN_MIN..=LOGIN_MAX).contains(&login_length) {
            add(
                &mut errors,
                "login",
                "length",
                &format!("Login must be between {LOGIN_MIN} and {LOGIN_MAX} characters long"),
            );
        }

        let auth_type = resolve_auth_type(self.auth_type.as_deref(), site, &mut errors);
        if let Some(auth_type) = auth_type {
            if auth_type.uses_password() {
                check_password(&self.password, &self.password_confirmation, &mut errors);
            }
            check_open_id(auth_type, self.open_id_url.as_deref(), &mut errors);
        }

        if errors.is_empty() {
            Ok(auth_type.unwrap_or_default())
        } else {
            Err(errors)
        }
    }
}

/// New password plus confirmation.
#[derive(Clone, Debug, Default)]
pub struct PasswordChange {
    pub password: String,
    pub password_confirmation: String,
}

impl PasswordChange {
    pub(crate) fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_password(&self.password, &self.password_confirmation, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Requested switch of authentication scheme.
#[derive(Clone, Debug, Default)]
pub struct AuthTypeChange {
    pub auth_type: String,
    pub open_id_url: Option<String>,
}

impl AuthTypeChange {
    pub(crate) fn check(&self, site: &SiteConfig) -> Result<AuthType, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let auth_type = resolve_auth_type(Some(self.auth_type.trim()), site, &mut errors);
        if let Some(auth_type) = auth_type {
            check_open_id(
                auth_type,
                util::normalize_optional_text(self.open_id_url.as_deref()).as_deref(),
                &mut errors,
            );
        }
        match auth_type {
            Some(auth_type) if errors.is_empty() => Ok(auth_type),
            _ => Err(errors),
        }
    }
}

fn add(errors: &mut ValidationErrors, field: &'static str, code: &'static str, message: &str) {
    errors.add(
        field,
        ValidationError::new(code).with_message(message.to_string().into()),
    );
}

/// A missing scheme means `database`.
fn resolve_auth_type(
    raw: Option<&str>,
    site: &SiteConfig,
    errors: &mut ValidationErrors,
) -> Option<AuthType> {
    let raw = raw.unwrap_or(AuthType::Database.as_str());
    match AuthType::try_from(raw) {
        Ok(auth_type) if site.scheme_enabled(auth_type) => Some(auth_type),
        _ => {
            add(
                errors,
                "auth_type",
                "inclusion",
                &format!("Auth type not a valid authentication type ({raw})"),
            );
            None
        }
    }
}

fn check_password(password: &str, confirmation: &str, errors: &mut ValidationErrors) {
    let length = password.chars().count();
    if password.is_empty() {
        add(errors, "password", "blank", "Password can't be blank");
    } else if length < PASSWORD_MIN {
        add(
            errors,
            "password",
            "length",
            &format!("Password is too short (minimum is {PASSWORD_MIN} characters)"),
        );
    } else if length > PASSWORD_MAX {
        add(
            errors,
            "password",
            "length",
            &format!("Password is too long (maximum is {PASSWORD_MAX} characters)"),
        );
    }
    if password != confirmation {
        add(
            errors,
            "password_confirmation",
            "confirmation",
            "Password confirmation doesn't match Password",
        );
    }
}

fn check_open_id(auth_type: AuthType, open_id_url: Option<&str>, errors: &mut ValidationErrors) {
    if auth_type == AuthType::OpenId && open_id_url.is_none() {
        add(errors, "open_id_url", "blank", "Open id url can't be blank");
    }
}

/// Per-user settings created together with the account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preference {
    pub user_id: i32,
    pub locale: String,
    pub time_zone: String,
}

impl From<preferences::Model> for Preference {
    fn from(model: preferences::Model) -> Self {
        Self {
            user_id: model.user_id,
            locale: model.locale,
            time_zone: model.time_zone,
        }
    }
}

/// A login session as seen by the request layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: Option<i32>,
    pub cas_user: Option<String>,
}

impl From<sessions::Model> for Session {
    fn from(model: sessions::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            cas_user: model.cas_user,
        }
    }
}

/// Column the account list is sorted by.
///
/// Only descriptive columns are accepted: the password hash and the API token
/// are never sortable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserOrder {
    Id,
    #[default]
    Login,
    FirstName,
    LastName,
    Email,
    AuthType,
    OpenIdUrl,
    IsAdmin,
    CreatedAt,
    UpdatedAt,
}

impl UserOrder {
    /// Unknown or missing columns fall back to `login`.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(Self::from_column).unwrap_or_default()
    }

    fn from_column(name: &str) -> Option<Self> {
        let order = match name {
            "id" => Self::Id,
            "login" => Self::Login,
            "first_name" => Self::FirstName,
            "last_name" => Self::LastName,
            "email" => Self::Email,
            "auth_type" => Self::AuthType,
            "open_id_url" => Self::OpenIdUrl,
            "is_admin" => Self::IsAdmin,
            "created_at" => Self::CreatedAt,
            "updated_at" => Self::UpdatedAt,
            _ => return None,
        };
        Some(order)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Login => "login",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::AuthType => "auth_type",
            Self::OpenIdUrl => "open_id_url",
            Self::IsAdmin => "is_admin",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    pub(crate) fn column(self) -> users::Column {
        match self {
            Self::Id => users::Column::Id,
            Self::Login => users::Column::Login,
            Self::FirstName => users::Column::FirstName,
            Self::LastName => users::Column::LastName,
            Self::Email => users::Column::Email,
            Self::AuthType => users::Column::AuthType,
            Self::OpenIdUrl => users::Column::OpenIdUrl,
            Self::IsAdmin => users::Column::IsAdmin,
            Self::CreatedAt => users::Column::CreatedAt,
            Self::UpdatedAt => users::Column::UpdatedAt,
        }
    }
}

/// One page of the account list.
#[derive(Clone, Debug)]
pub struct UsersPage {
    pub users: Vec<User>,
    /// 1-based.
    pub page: u64,
    pub pages: u64,
    pub total: u64,
}
