use api_types::error::Errors;
use axum::{http::StatusCode, response::IntoResponse};
use engine::{Denial, EngineError};

pub use format::Format;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};
pub use session::{Requester, SESSION_COOKIE};

mod accounts;
mod flash;
mod format;
mod html;
mod machine;
mod server;
mod session;
mod users;
mod views;

pub mod types {
    pub mod user {
        pub use api_types::user::{
            AuthType, AuthTypeUpdate, PasswordUpdate, UserNew, UserView, UsersList, UsersQuery,
        };
        pub use engine::User;
    }

    pub mod error {
        pub use api_types::error::Errors;
    }
}

pub const UNAUTHORIZED_MESSAGE: &str =
    "401 Unauthorized: Only administrative users are allowed access to this function.";
pub const MALFORMED_USER_MESSAGE: &str = "Expected post format is valid xml like so: <user><login>username</login><password>abc123</password></user>.";
pub const TOS_MESSAGE: &str = "You have to accept the terms of service to sign up!";

/// Failures of the machine representation.
///
/// Every variant renders as an `<errors>` document (or its JSON twin) with a
/// status code matching the failure.
#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Unauthorized,
    Forbidden(String),
    Malformed(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Denied(Denial::SignupsClosed) => StatusCode::UNAUTHORIZED,
        EngineError::Denied(Denial::TermsNotAccepted) => StatusCode::FORBIDDEN,
        EngineError::Validation(_)
        | EngineError::ExistingKey(_)
        | EngineError::InvalidAuthType(_) => StatusCode::CONFLICT,
        EngineError::Credential(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn messages_for_engine_error(err: EngineError) -> Vec<String> {
    match err {
        EngineError::Validation(errors) => engine::full_messages(&errors),
        EngineError::Denied(Denial::SignupsClosed) => vec![UNAUTHORIZED_MESSAGE.to_string()],
        EngineError::Denied(Denial::TermsNotAccepted) => vec![TOS_MESSAGE.to_string()],
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            vec!["internal server error".to_string()]
        }
        EngineError::Credential(details) => {
            tracing::error!("credential service error: {details}");
            vec!["internal server error".to_string()]
        }
        other => vec![other.to_string()],
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Engine(err) => status_for_engine_error(err),
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::Malformed(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Render for the requested representation. HTML and JS callers get XML.
    pub fn into_response_for(self, format: Format) -> axum::response::Response {
        let status = self.status();
        let errors = match self {
            ServerError::Engine(err) => Errors {
                errors: messages_for_engine_error(err),
            },
            ServerError::Unauthorized => Errors::single(UNAUTHORIZED_MESSAGE),
            ServerError::Forbidden(message) | ServerError::Malformed(message) => {
                Errors::single(message)
            }
        };

        machine::document(format, status, &errors)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        self.into_response_for(Format::Xml)
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(res: axum::response::Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        assert_eq!(
            ServerError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn forbidden_maps_to_403() {
        let res = ServerError::Forbidden(TOS_MESSAGE.to_string()).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn late_signup_denial_maps_like_the_policy() {
        let res = ServerError::from(EngineError::Denied(Denial::SignupsClosed)).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(body_of(res).await.contains("Only administrative users"));

        let res = ServerError::from(EngineError::Denied(Denial::TermsNotAccepted)).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_maps_to_400_with_errors_document() {
        let res = ServerError::Malformed(MALFORMED_USER_MESSAGE.to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_of(res).await;
        assert!(body.starts_with("<errors><error>Expected post format is valid xml"));
    }

    #[tokio::test]
    async fn database_errors_are_not_leaked() {
        let err = EngineError::Database(sea_orm::DbErr::Custom("disk on fire".to_string()));
        let res = ServerError::from(err).into_response_for(Format::Json);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(res).await, r#"{"error":["internal server error"]}"#);
    }
}
