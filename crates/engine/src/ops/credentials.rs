use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    AuthType, AuthTypeChange, EngineError, PasswordChange, ResultEngine, User, users, util,
};

use super::{Engine, with_tx};

impl Engine {
    /// Check a login/password pair. Only `database` accounts can succeed.
    pub async fn authenticate(&self, login: &str, password: &str) -> ResultEngine<Option<User>> {
        let Some(model) = users::Entity::find()
            .filter(users::Column::Login.eq(util::normalize_login(login)))
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };

        if model.auth_type != AuthType::Database.as_str()
            || !self.credentials.verify(password, &model.password)
        {
            return Ok(None);
        }
        User::try_from(model).map(Some)
    }

    /// Re-hash and store a new password.
    pub async fn change_password(&self, user_id: i32, change: PasswordChange) -> ResultEngine<()> {
        change.check().map_err(EngineError::Validation)?;
        let hash = self.credentials.hash(&change.password)?;

        with_tx!(self, |db_tx| {
            let model = find_user(&db_tx, user_id).await?;
            let mut active: users::ActiveModel = model.into();
            active.password = ActiveValue::Set(hash);
            active.updated_at = ActiveValue::Set(Utc::now());
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Switch the authentication scheme of an account.
    pub async fn change_auth_type(
        &self,
        user_id: i32,
        change: AuthTypeChange,
    ) -> ResultEngine<User> {
        let auth_type = change.check(&self.site).map_err(EngineError::Validation)?;
        let open_id_url = util::normalize_optional_text(change.open_id_url.as_deref())
            .filter(|_| auth_type == AuthType::OpenId);

        with_tx!(self, |db_tx| {
            let model = find_user(&db_tx, user_id).await?;
            let mut active: users::ActiveModel = model.into();
            active.auth_type = ActiveValue::Set(auth_type.as_str().to_string());
            active.open_id_url = ActiveValue::Set(open_id_url);
            active.updated_at = ActiveValue::Set(Utc::now());
            User::try_from(active.update(&db_tx).await?)
        })
    }

    /// Issue and store a fresh API token.
    pub async fn refresh_token(&self, user_id: i32) -> ResultEngine<String> {
        let token = self.credentials.generate_token();

        with_tx!(self, |db_tx| {
            let model = find_user(&db_tx, user_id).await?;
            let mut active: users::ActiveModel = model.into();
            active.token = ActiveValue::Set(Some(token.clone()));
            active.updated_at = ActiveValue::Set(Utc::now());
            active.update(&db_tx).await?;
            Ok(token)
        })
    }
}

async fn find_user(db: &DatabaseTransaction, user_id: i32) -> ResultEngine<users::Model> {
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))
}
