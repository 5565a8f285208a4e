use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod user {
    use super::*;

    /// Authentication schemes as they travel over the wire.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AuthType {
        Database,
        Cas,
        OpenId,
        Ldap,
    }

    /// Signup request body.
    ///
    /// Every field is optional so a missing key can be told apart from an
    /// empty value. The same shape is read from HTML forms, XML and JSON.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "user")]
    pub struct UserNew {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub login: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub password: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub password_confirmation: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub first_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub last_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub auth_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub open_id_url: Option<String>,
        /// `"on"` when the terms of service checkbox is ticked.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub approve_tos: Option<String>,
    }

    impl UserNew {
        pub fn tos_accepted(&self) -> bool {
            self.approve_tos.as_deref() == Some("on")
        }
    }

    /// An account as exposed to admins. There is no password field.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "user")]
    pub struct UserView {
        pub id: i32,
        pub login: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub first_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub last_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub email: Option<String>,
        pub auth_type: AuthType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub open_id_url: Option<String>,
        pub is_admin: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    /// `<users><user>…</user></users>`
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "users")]
    pub struct UsersList {
        #[serde(rename = "user", default)]
        pub users: Vec<UserView>,
    }

    /// Query string of the account list.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct UsersQuery {
        pub order: Option<String>,
        pub page: Option<u64>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct PasswordUpdate {
        #[serde(default)]
        pub password: String,
        #[serde(default)]
        pub password_confirmation: String,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct AuthTypeUpdate {
        #[serde(default)]
        pub auth_type: String,
        #[serde(default)]
        pub open_id_url: Option<String>,
    }
}

pub mod error {
    use super::*;

    /// `<errors><error>…</error></errors>`
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "errors")]
    pub struct Errors {
        #[serde(rename = "error", default)]
        pub errors: Vec<String>,
    }

    impl Errors {
        pub fn single(message: impl Into<String>) -> Self {
            Self {
                errors: vec![message.into()],
            }
        }
    }
}
