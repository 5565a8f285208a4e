//! Account engine for Tracks.
//!
//! The engine owns the account store (users, their preferences and login
//! sessions), the signup admission policy and the credential service. Both the
//! HTTP server and the admin CLI drive it through [`Engine`].

pub use admission::{Admission, AdmissionContext, Denial, SignupView};
pub use auth_type::AuthType;
pub use credentials::{Argon2Credentials, CredentialService, CredentialsConfig};
pub use error::{EngineError, field_messages, full_messages};
pub use ops::{BootstrapAdmin, Engine, EngineBuilder};
pub use site::SiteConfig;
pub use user::{
    AuthTypeChange, NewUser, PasswordChange, Preference, Session, User, UserOrder, UsersPage,
};

pub mod admission;
mod auth_type;
mod credentials;
mod error;
mod ops;
mod preferences;
mod sessions;
mod site;
mod user;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
