use chrono::Utc;
use sea_orm::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{ResultEngine, Session, sessions};

use super::Engine;

impl Engine {
    /// Start a session for a local account.
    pub async fn open_session(&self, user_id: i32) -> ResultEngine<Session> {
        self.insert_session(Some(user_id), None).await
    }

    /// Start a session for a visitor authenticated by CAS but without a local
    /// account yet.
    pub async fn open_cas_session(&self, cas_user: &str) -> ResultEngine<Session> {
        self.insert_session(None, Some(cas_user.to_string())).await
    }

    async fn insert_session(
        &self,
        user_id: Option<i32>,
        cas_user: Option<String>,
    ) -> ResultEngine<Session> {
        let model = sessions::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().simple().to_string()),
            user_id: ActiveValue::Set(user_id),
            cas_user: ActiveValue::Set(cas_user),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await?;

        Ok(Session::from(model))
    }

    pub async fn session(&self, id: &str) -> ResultEngine<Option<Session>> {
        Ok(sessions::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .map(Session::from))
    }

    /// Forget a session. Closing an unknown session is not an error.
    pub async fn close_session(&self, id: &str) -> ResultEngine<()> {
        sessions::Entity::delete_by_id(id.to_string())
            .exec(&self.database)
            .await?;
        Ok(())
    }
}
