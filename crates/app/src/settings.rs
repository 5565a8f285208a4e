//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and overridden by `TRACKS__*` environment
//! variables (`TRACKS__SERVER__PORT=8080`, `TRACKS__SITE__OPEN_SIGNUPS=true`).
use config::{Config, ConfigError, Environment, File};
use engine::{CredentialsConfig, SiteConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    /// Path of the database file.
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: Database,
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("TRACKS")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("site.auth_schemes"),
            )
            .build()?;

        settings.try_deserialize()
    }
}
