use chrono::Utc;
use sea_orm::{
    ActiveValue, PaginatorTrait, QueryFilter, QueryOrder, Select, TransactionTrait, prelude::*,
};
use validator::{ValidationError, ValidationErrors};

use crate::{
    Admission, AuthType, Denial, EngineError, NewUser, Preference, ResultEngine, User, UserOrder,
    UsersPage, preferences, sessions, users, util,
};

use super::{Engine, is_unique_violation, with_tx};

const DEFAULT_LOCALE: &str = "en";
const DEFAULT_TIME_ZONE: &str = "UTC";

fn login_taken(errors: &mut ValidationErrors) {
    errors.add(
        "login",
        ValidationError::new("taken").with_message("Login has already been taken".into()),
    );
}

fn ordered(order: UserOrder) -> Select<users::Entity> {
    users::Entity::find()
        .order_by_asc(order.column())
        .order_by_asc(users::Column::Id)
}

fn user_not_found(id: i32) -> EngineError {
    EngineError::KeyNotFound(format!("user {id}"))
}

impl Engine {
    /// `true` while the store holds no account at all.
    pub async fn no_users_yet(&self) -> ResultEngine<bool> {
        Ok(self.count_users().await? == 0)
    }

    pub async fn count_users(&self) -> ResultEngine<u64> {
        Ok(users::Entity::find().count(&self.database).await?)
    }

    /// Every account, sorted by `order` with ties broken by id.
    pub async fn list_users(&self, order: UserOrder) -> ResultEngine<Vec<User>> {
        ordered(order)
            .all(&self.database)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    /// One page of [`list_users`](Self::list_users). `page` is 1-based; zero is
    /// treated as the first page and anything past the end as the last one.
    pub async fn users_page(&self, order: UserOrder, page: u64) -> ResultEngine<UsersPage> {
        let paginator = ordered(order).paginate(&self.database, self.site.per_page.max(1));
        let counts = paginator.num_items_and_pages().await?;
        let page = page.clamp(1, counts.number_of_pages.max(1));
        let users = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(UsersPage {
            users,
            page,
            pages: counts.number_of_pages,
            total: counts.number_of_items,
        })
    }

    pub async fn user(&self, id: i32) -> ResultEngine<User> {
        users::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| user_not_found(id))
            .and_then(User::try_from)
    }

    pub async fn user_by_login(&self, login: &str) -> ResultEngine<Option<User>> {
        users::Entity::find()
            .filter(users::Column::Login.eq(util::normalize_login(login)))
            .one(&self.database)
            .await?
            .map(User::try_from)
            .transpose()
    }

    pub async fn preference(&self, user_id: i32) -> ResultEngine<Option<Preference>> {
        Ok(preferences::Entity::find()
            .filter(preferences::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .map(Preference::from))
    }

    /// Validate and persist a signup together with its preferences.
    ///
    /// `admission` comes from the admission policy. A first-user grant is
    /// confirmed again inside the write transaction. If another account slipped
    /// in meanwhile the signup falls back to the open-signup rule: it goes
    /// through as a plain account on an open site and is denied otherwise.
    pub async fn create_user(
        &self,
        new_user: NewUser,
        admission: Admission,
        locale: Option<&str>,
    ) -> ResultEngine<User> {
        let new_user = new_user.normalized();
        let checked = new_user.check(&self.site);
        let taken = !new_user.login.is_empty()
            && users::Entity::find()
                .filter(users::Column::Login.eq(new_user.login.as_str()))
                .count(&self.database)
                .await?
                > 0;

        let auth_type = match checked {
            Ok(auth_type) if !taken => auth_type,
            result => {
                let mut errors = result.err().unwrap_or_else(ValidationErrors::new);
                if taken {
                    login_taken(&mut errors);
                }
                return Err(EngineError::Validation(errors));
            }
        };

        // External schemes never check this hash; store an unguessable one.
        let password = if auth_type.uses_password() {
            self.credentials.hash(&new_user.password)?
        } else {
            self.credentials.hash(&self.credentials.generate_token())?
        };
        let token = self.credentials.generate_token();
        let locale = util::normalize_optional_text(locale)
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        let now = Utc::now();

        with_tx!(self, |db_tx| {
            let is_admin = if admission.grants_admin() {
                let store_empty = users::Entity::find().count(&db_tx).await? == 0;
                if !store_empty && !self.site.open_signups {
                    return Err(EngineError::Denied(Denial::SignupsClosed));
                }
                store_empty
            } else {
                false
            };

            let model = users::ActiveModel {
                login: ActiveValue::Set(new_user.login.clone()),
                password: ActiveValue::Set(password),
                first_name: ActiveValue::Set(new_user.first_name),
                last_name: ActiveValue::Set(new_user.last_name),
                email: ActiveValue::Set(new_user.email),
                auth_type: ActiveValue::Set(auth_type.as_str().to_string()),
                open_id_url: ActiveValue::Set(
                    new_user
                        .open_id_url
                        .filter(|_| auth_type == AuthType::OpenId),
                ),
                token: ActiveValue::Set(Some(token)),
                is_admin: ActiveValue::Set(is_admin),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            }
            .insert(&db_tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    let mut errors = ValidationErrors::new();
                    login_taken(&mut errors);
                    EngineError::Validation(errors)
                } else {
                    err.into()
                }
            })?;

            preferences::ActiveModel {
                user_id: ActiveValue::Set(model.id),
                locale: ActiveValue::Set(locale),
                time_zone: ActiveValue::Set(DEFAULT_TIME_ZONE.to_string()),
                ..Default::default()
            }
            .insert(&db_tx)
            .await?;

            User::try_from(model)
        })
    }

    /// Remove an account with its preferences and every session it owns.
    pub async fn delete_user(&self, id: i32) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = users::Entity::find_by_id(id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| user_not_found(id))?;

            sessions::Entity::delete_many()
                .filter(sessions::Column::UserId.eq(id))
                .exec(&db_tx)
                .await?;
            preferences::Entity::delete_many()
                .filter(preferences::Column::UserId.eq(id))
                .exec(&db_tx)
                .await?;
            users::Entity::delete_by_id(id).exec(&db_tx).await?;

            User::try_from(model)
        })
    }
}
