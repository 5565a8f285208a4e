use std::{fmt, sync::Arc};

use sea_orm::{DatabaseConnection, DbErr, SqlErr};

use crate::{
    Argon2Credentials, CredentialService, CredentialsConfig, EngineError, ResultEngine, SiteConfig,
};

mod accounts;
mod bootstrap;
mod credentials;
mod sessions;

pub use bootstrap::BootstrapAdmin;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    credentials: Arc<dyn CredentialService>,
    site: SiteConfig,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("site", &self.site)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn credentials(&self) -> &dyn CredentialService {
        self.credentials.as_ref()
    }
}

/// `true` when the store rejected a write on a unique index.
fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    credentials: Option<Arc<dyn CredentialService>>,
    site: SiteConfig,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Replace the default Argon2 credential service.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialService>) -> EngineBuilder {
        self.credentials = Some(credentials);
        self
    }

    pub fn site(mut self, site: SiteConfig) -> EngineBuilder {
        self.site = site;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let credentials = match self.credentials {
            Some(credentials) => credentials,
            None => Arc::new(Argon2Credentials::new(&CredentialsConfig::default())?),
        };
        if self.site.auth_schemes.is_empty() {
            return Err(EngineError::InvalidAuthType(
                "at least one authentication scheme must be configured".to_string(),
            ));
        }

        Ok(Engine {
            database: self.database,
            credentials,
            site: self.site,
        })
    }
}
