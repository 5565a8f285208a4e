use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Admission, Argon2Credentials, AuthType, AuthTypeChange, BootstrapAdmin, CredentialsConfig,
    Denial, Engine, EngineError, NewUser, PasswordChange, SiteConfig, UserOrder, full_messages,
};
use migration::MigratorTrait;

fn fast_credentials() -> Arc<Argon2Credentials> {
    Arc::new(
        Argon2Credentials::new(&CredentialsConfig {
            memory_cost: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap(),
    )
}

async fn engine_with_site(site: SiteConfig) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .credentials(fast_credentials())
        .site(site)
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    engine_with_site(SiteConfig {
        per_page: 2,
        ..SiteConfig::default()
    })
    .await
}

fn signup(login: &str, password: &str) -> NewUser {
    NewUser {
        login: login.to_string(),
        password: password.to_string(),
        password_confirmation: password.to_string(),
        ..NewUser::default()
    }
}

async fn count(db: &DatabaseConnection, sql: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(db.get_database_backend(), sql))
        .await
        .unwrap()
        .unwrap();
    row.try_get_by_index::<i64>(0).unwrap()
}

#[tokio::test]
async fn first_signup_becomes_admin_with_preference() {
    let (engine, db) = engine_with_db().await;
    assert!(engine.no_users_yet().await.unwrap());

    let user = engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, Some("it"))
        .await
        .unwrap();

    assert!(user.is_admin);
    assert_eq!(user.auth_type, AuthType::Database);
    assert_eq!(user.token.as_deref().map(str::len), Some(40));
    assert!(!engine.no_users_yet().await.unwrap());

    let preference = engine.preference(user.id).await.unwrap().unwrap();
    assert_eq!(preference.locale, "it");
    assert_eq!(preference.time_zone, "UTC");
    assert_eq!(count(&db, "SELECT COUNT(*) FROM preferences").await, 1);
}

#[tokio::test]
async fn stale_first_user_grant_is_denied_on_a_closed_site() {
    let (engine, db) = engine_with_db().await;
    engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, None)
        .await
        .unwrap();

    let err = engine
        .create_user(signup("late", "late1"), Admission::FirstUser, None)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Denied(Denial::SignupsClosed));
    assert!(engine.user_by_login("late").await.unwrap().is_none());
    assert_eq!(count(&db, "SELECT COUNT(*) FROM users").await, 1);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM preferences").await, 1);
}

#[tokio::test]
async fn stale_first_user_grant_is_a_plain_account_on_an_open_site() {
    let (engine, _db) = engine_with_site(SiteConfig {
        open_signups: true,
        ..SiteConfig::default()
    })
    .await;
    engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, None)
        .await
        .unwrap();

    let late = engine
        .create_user(signup("late", "late1"), Admission::FirstUser, None)
        .await
        .unwrap();
    assert!(!late.is_admin);
}

#[tokio::test]
async fn open_signup_is_not_admin() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, None)
        .await
        .unwrap();

    let user = engine
        .create_user(signup("jane", "secret"), Admission::OpenSignup, None)
        .await
        .unwrap();
    assert!(!user.is_admin);
}

#[tokio::test]
async fn password_is_stored_hashed() {
    let (engine, db) = engine_with_db().await;
    engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, None)
        .await
        .unwrap();

    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM users WHERE password = 'admin'").await,
        0
    );
    assert!(engine.authenticate("admin", "admin").await.unwrap().is_some());
    assert!(engine.authenticate("admin", "wrong").await.unwrap().is_none());
    assert!(engine.authenticate("nobody", "admin").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_login_is_a_field_error_and_persists_nothing() {
    let (engine, db) = engine_with_db().await;
    engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, None)
        .await
        .unwrap();

    let err = engine
        .create_user(signup(" admin ", "other"), Admission::ByAdmin, None)
        .await
        .unwrap_err();
    let EngineError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(full_messages(&errors), vec!["Login has already been taken"]);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM users").await, 1);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM preferences").await, 1);
}

#[tokio::test]
async fn invalid_signup_persists_nothing() {
    let (engine, db) = engine_with_db().await;

    let err = engine
        .create_user(signup("", "x"), Admission::FirstUser, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(err.to_string().contains("Login can't be blank"));
    assert!(!err.to_string().contains("between 3 and 80"));
    assert_eq!(count(&db, "SELECT COUNT(*) FROM users").await, 0);
}

#[tokio::test]
async fn unknown_order_matches_default_order() {
    let (engine, _db) = engine_with_db().await;
    for login in ["mallory", "alice", "bob"] {
        engine
            .create_user(signup(login, "secret"), Admission::OpenSignup, None)
            .await
            .unwrap();
    }

    let default: Vec<_> = engine
        .list_users(UserOrder::parse(None))
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.login)
        .collect();
    let unknown: Vec<_> = engine
        .list_users(UserOrder::parse(Some("password")))
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.login)
        .collect();

    assert_eq!(default, vec!["alice", "bob", "mallory"]);
    assert_eq!(default, unknown);

    let by_id: Vec<_> = engine
        .list_users(UserOrder::parse(Some("id")))
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.login)
        .collect();
    assert_eq!(by_id, vec!["mallory", "alice", "bob"]);
}

#[tokio::test]
async fn users_page_splits_by_site_page_size() {
    let (engine, _db) = engine_with_db().await;
    for login in ["carol", "alice", "bob"] {
        engine
            .create_user(signup(login, "secret"), Admission::OpenSignup, None)
            .await
            .unwrap();
    }

    let first = engine.users_page(UserOrder::Login, 0).await.unwrap();
    assert_eq!(first.page, 1);
    assert_eq!(first.pages, 2);
    assert_eq!(first.total, 3);
    assert_eq!(first.users.len(), 2);

    let second = engine.users_page(UserOrder::Login, 2).await.unwrap();
    assert_eq!(second.users.len(), 1);
    assert_eq!(second.users[0].login, "carol");

    let past_the_end = engine.users_page(UserOrder::Login, u64::MAX).await.unwrap();
    assert_eq!(past_the_end.page, 2);
    assert_eq!(past_the_end.users[0].login, "carol");
}

#[tokio::test]
async fn delete_removes_preference_and_sessions() {
    let (engine, db) = engine_with_db().await;
    let user = engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, None)
        .await
        .unwrap();
    let session = engine.open_session(user.id).await.unwrap();

    let deleted = engine.delete_user(user.id).await.unwrap();
    assert_eq!(deleted.login, "admin");

    assert!(engine.session(&session.id).await.unwrap().is_none());
    assert!(engine.preference(user.id).await.unwrap().is_none());
    assert_eq!(count(&db, "SELECT COUNT(*) FROM users").await, 0);
    assert_eq!(
        engine.user(user.id).await.unwrap_err(),
        EngineError::KeyNotFound(format!("user {}", user.id))
    );
}

#[tokio::test]
async fn delete_unknown_user_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    assert!(matches!(
        engine.delete_user(42).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn change_password_requires_matching_confirmation() {
    let (engine, _db) = engine_with_db().await;
    let user = engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, None)
        .await
        .unwrap();

    let err = engine
        .change_password(
            user.id,
            PasswordChange {
                password: "newpass".to_string(),
                password_confirmation: "other".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Password confirmation doesn't match Password");
    assert!(engine.authenticate("admin", "admin").await.unwrap().is_some());

    engine
        .change_password(
            user.id,
            PasswordChange {
                password: "newpass".to_string(),
                password_confirmation: "newpass".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(engine.authenticate("admin", "admin").await.unwrap().is_none());
    assert!(engine.authenticate("admin", "newpass").await.unwrap().is_some());
}

#[tokio::test]
async fn change_auth_type_checks_configured_schemes() {
    let (engine, _db) = engine_with_site(SiteConfig {
        auth_schemes: vec![AuthType::Database, AuthType::OpenId],
        ..SiteConfig::default()
    })
    .await;
    let user = engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, None)
        .await
        .unwrap();

    let err = engine
        .change_auth_type(
            user.id,
            AuthTypeChange {
                auth_type: "cas".to_string(),
                open_id_url: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Auth type not a valid authentication type (cas)"
    );

    let updated = engine
        .change_auth_type(
            user.id,
            AuthTypeChange {
                auth_type: "open_id".to_string(),
                open_id_url: Some("https://id.example.com/admin".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.auth_type, AuthType::OpenId);
    assert_eq!(
        updated.open_id_url.as_deref(),
        Some("https://id.example.com/admin")
    );
    // Password login is off for OpenID accounts.
    assert!(engine.authenticate("admin", "admin").await.unwrap().is_none());
}

#[tokio::test]
async fn refresh_token_replaces_token() {
    let (engine, _db) = engine_with_db().await;
    let user = engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, None)
        .await
        .unwrap();

    let token = engine.refresh_token(user.id).await.unwrap();
    assert_ne!(Some(token.clone()), user.token);
    assert_eq!(engine.user(user.id).await.unwrap().token, Some(token));

    assert!(matches!(
        engine.refresh_token(999).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn sessions_open_and_close() {
    let (engine, _db) = engine_with_db().await;
    let user = engine
        .create_user(signup("admin", "admin"), Admission::FirstUser, None)
        .await
        .unwrap();

    let session = engine.open_session(user.id).await.unwrap();
    assert_eq!(
        engine.session(&session.id).await.unwrap(),
        Some(session.clone())
    );

    let cas = engine.open_cas_session("jdoe").await.unwrap();
    assert_eq!(cas.user_id, None);
    assert_eq!(cas.cas_user.as_deref(), Some("jdoe"));

    engine.close_session(&session.id).await.unwrap();
    assert!(engine.session(&session.id).await.unwrap().is_none());
    engine.close_session(&session.id).await.unwrap();
}

#[tokio::test]
async fn bootstrap_admin_runs_once() {
    let (engine, db) = engine_with_db().await;

    let admin = engine
        .bootstrap_admin(BootstrapAdmin::default())
        .await
        .unwrap();
    assert!(admin.is_admin);
    assert_eq!(admin.display_name(), "Admin User");
    assert!(admin.token.is_some());
    assert!(engine.preference(admin.id).await.unwrap().is_some());
    assert!(engine.authenticate("admin", "admin").await.unwrap().is_some());

    let err = engine
        .bootstrap_admin(BootstrapAdmin::default())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("admin".to_string()));
    assert_eq!(count(&db, "SELECT COUNT(*) FROM users").await, 1);
}

#[tokio::test]
async fn builder_rejects_empty_scheme_list() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let err = Engine::builder()
        .database(db)
        .credentials(fast_credentials())
        .site(SiteConfig {
            auth_schemes: Vec::new(),
            ..SiteConfig::default()
        })
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAuthType(_)));
}
