use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Grant lifetimes, in seconds.
#[derive(Clone, Debug, Deserialize)]
pub struct OAuth2Config {
    /// How long an issued authorization code stays redeemable.
    #[serde(default = "default_authorization_ttl")]
    pub authorization_ttl: i64,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            authorization_ttl: default_authorization_ttl(),
        }
    }
}

fn default_authorization_ttl() -> i64 {
    300
}

/// Ticket expiration policy, in seconds.
///
/// `remember_me_ttl` wins over `browser_ttl`, which wins over `default_ttl`.
#[derive(Clone, Debug, Deserialize)]
pub struct TicketConfig {
    #[serde(default = "default_ticket_ttl")]
    pub default_ttl: i64,
    #[serde(default = "default_browser_ttl")]
    pub browser_ttl: i64,
    #[serde(default = "default_remember_me_ttl")]
    pub remember_me_ttl: i64,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ticket_ttl(),
            browser_ttl: default_browser_ttl(),
            remember_me_ttl: default_remember_me_ttl(),
        }
    }
}

fn default_ticket_ttl() -> i64 {
    8 * 3600
}

fn default_browser_ttl() -> i64 {
    3600
}

fn default_remember_me_ttl() -> i64 {
    90 * 24 * 3600
}

/// An application registered at startup when it does not exist yet.
#[derive(Clone, Debug, Deserialize)]
pub struct SeedApplication {
    pub id: String,
    pub secret: String,
    #[serde(default)]
    pub redirect_uri: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub oauth2: OAuth2Config,
    #[serde(default)]
    pub tickets: TicketConfig,
    #[serde(default)]
    pub seed_applications: Vec<SeedApplication>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be > 0".into()));
        }
        if self.oauth2.authorization_ttl <= 0 {
            return Err(ConfigError::Validation(
                "oauth2.authorization_ttl must be > 0".into(),
            ));
        }
        let tickets = [
            ("tickets.default_ttl", self.tickets.default_ttl),
            ("tickets.browser_ttl", self.tickets.browser_ttl),
            ("tickets.remember_me_ttl", self.tickets.remember_me_ttl),
        ];
        for (key, ttl) in tickets {
            if ttl <= 0 {
                return Err(ConfigError::Validation(format!("{key} must be > 0")));
            }
        }
        for app in &self.seed_applications {
            if app.id.is_empty() {
                return Err(ConfigError::Validation(
                    "seed_applications entries need an id".into(),
                ));
            }
            if app.secret.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "seed application {} needs a secret",
                    app.id
                )));
            }
        }
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any environment variable matching the key path separated by double
/// underscores (e.g. `TICKETS__DEFAULT_TTL`) overrides the file value.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml"))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;

    Ok(app)
}
