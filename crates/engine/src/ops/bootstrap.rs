//! First administrator seeding.
//!
//! Separate from [`Engine::create_user`]: no admission policy and no field
//! validation run here. The only guard is the unique index on `login`, so a
//! second run fails instead of creating a duplicate.

use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{AuthType, EngineError, ResultEngine, User, preferences, users};

use super::{Engine, is_unique_violation, with_tx};

/// Account written by [`Engine::bootstrap_admin`].
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub login: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Default for BootstrapAdmin {
    fn default() -> Self {
        Self {
            login: "admin".to_string(),
            password: "admin".to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
        }
    }
}

impl Engine {
    pub async fn bootstrap_admin(&self, admin: BootstrapAdmin) -> ResultEngine<User> {
        let password = self.credentials.hash(&admin.password)?;
        let token = self.credentials.generate_token();
        let now = Utc::now();

        with_tx!(self, |db_tx| {
            let model = users::ActiveModel {
                login: ActiveValue::Set(admin.login.clone()),
                password: ActiveValue::Set(password),
                first_name: ActiveValue::Set(Some(admin.first_name)),
                last_name: ActiveValue::Set(Some(admin.last_name)),
                email: ActiveValue::Set(None),
                auth_type: ActiveValue::Set(AuthType::Database.as_str().to_string()),
                open_id_url: ActiveValue::Set(None),
                token: ActiveValue::Set(Some(token)),
                is_admin: ActiveValue::Set(true),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            }
            .insert(&db_tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    EngineError::ExistingKey(admin.login.clone())
                } else {
                    err.into()
                }
            })?;

            preferences::ActiveModel {
                user_id: ActiveValue::Set(model.id),
                locale: ActiveValue::Set("en".to_string()),
                time_zone: ActiveValue::Set("UTC".to_string()),
                ..Default::default()
            }
            .insert(&db_tx)
            .await?;

            User::try_from(model)
        })
    }
}
