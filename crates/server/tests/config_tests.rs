use config::{Config, Environment, File, FileFormat, Map};
use oauth_ticket_server::config::{AppConfig, ConfigError};

const FULL_CONFIG: &str = r#"
database_url: "postgres://localhost/idp"
server:
  address: "127.0.0.1"
  port: 9000
oauth2:
  authorization_ttl: 120
tickets:
  default_ttl: 3600
  browser_ttl: 1800
  remember_me_ttl: 86400
seed_applications:
  - id: "portal"
    secret: "portal-secret"
    redirect_uri: "https://portal.example/oauth"
    description: "Intranet portal"
  - id: "cli"
    secret: "cli-secret"
"#;

fn build(yaml: &str, env: &[(&str, &str)]) -> AppConfig {
    let overrides: Map<String, String> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::builder()
        .add_source(File::from_str(yaml, FileFormat::Yaml))
        .add_source(
            Environment::default()
                .separator("__")
                .source(Some(overrides)),
        )
        .build()
        .expect("Failed to build config")
        .try_deserialize()
        .expect("Failed to deserialize config")
}

#[test]
fn test_full_config_deserialization() {
    let config = build(FULL_CONFIG, &[]);

    assert_eq!(config.database_url, "postgres://localhost/idp");
    assert_eq!(config.server.address, "127.0.0.1");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.oauth2.authorization_ttl, 120);
    assert_eq!(config.tickets.default_ttl, 3600);
    assert_eq!(config.tickets.browser_ttl, 1800);
    assert_eq!(config.tickets.remember_me_ttl, 86400);

    assert_eq!(config.seed_applications.len(), 2);
    let portal = &config.seed_applications[0];
    assert_eq!(portal.id, "portal");
    assert_eq!(portal.redirect_uri, "https://portal.example/oauth");
    assert_eq!(portal.description.as_deref(), Some("Intranet portal"));
    let cli = &config.seed_applications[1];
    assert!(cli.redirect_uri.is_empty());
    assert!(cli.description.is_none());

    assert!(config.validate().is_ok());
}

#[test]
fn test_environment_overrides_file() {
    let config = build(
        FULL_CONFIG,
        &[
            ("DATABASE_URL", "sqlite::memory:"),
            ("TICKETS__DEFAULT_TTL", "60"),
            ("SERVER__PORT", "8443"),
        ],
    );

    assert_eq!(config.database_url, "sqlite::memory:");
    assert_eq!(config.tickets.default_ttl, 60);
    assert_eq!(config.tickets.browser_ttl, 1800);
    assert_eq!(config.server.port, 8443);
}

#[test]
fn test_minimal_config_uses_defaults() {
    let config = build("database_url: \"sqlite::memory:\"\n", &[]);

    assert_eq!(config.server.address, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.oauth2.authorization_ttl, 300);
    assert_eq!(config.tickets.browser_ttl, 3600);
    assert_eq!(config.tickets.remember_me_ttl, 7_776_000);
    assert!(config.validate().is_ok());
}

#[test]
fn test_seed_without_secret_is_rejected() {
    let yaml = r#"
database_url: "sqlite::memory:"
seed_applications:
  - id: "portal"
    secret: ""
"#;
    let config = build(yaml, &[]);

    match config.validate() {
        Err(ConfigError::Validation(message)) => assert!(message.contains("portal")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_missing_database_url_fails() {
    let result = Config::builder()
        .add_source(File::from_str("server:\n  port: 8080\n", FileFormat::Yaml))
        .build()
        .expect("Failed to build config")
        .try_deserialize::<AppConfig>();

    assert!(result.is_err());
}
