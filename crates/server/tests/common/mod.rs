//! Shared fixtures: an in-memory SQLite schema and a small directory.
#![allow(dead_code)]

use axum::Router;
use axum_test::TestServer;
use base64::Engine;
use oauth_ticket_server::AppResources;
use oauth_ticket_server::api::build_router;
use oauth_ticket_server::config::{AppConfig, OAuth2Config, ServerConfig, TicketConfig};
use oauth_ticket_server::entity::{application, group, user};
use oauth_ticket_server::oauth2::hash_password;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    Statement,
};
use std::sync::Arc;
use time::OffsetDateTime;

pub const APP_ID: &str = "A1";
pub const APP_SECRET: &str = "s3cret";
pub const APP_REDIRECT: &str = "https://app.example/cb";
/// Registered without a redirect URI.
pub const BARE_APP_ID: &str = "A2";
pub const BARE_APP_SECRET: &str = "other-secret";
pub const PASSWORD: &str = "correct horse";

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE oauth_application (
        id TEXT PRIMARY KEY NOT NULL,
        secret TEXT NOT NULL,
        redirect_uri TEXT NOT NULL DEFAULT '',
        description TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE directory_user (
        username TEXT PRIMARY KEY NOT NULL,
        email TEXT NOT NULL UNIQUE,
        active INTEGER NOT NULL DEFAULT 0,
        password_hash TEXT,
        realm TEXT NOT NULL DEFAULT 'local',
        groups TEXT NOT NULL DEFAULT '',
        applications TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE directory_group (
        name TEXT PRIMARY KEY NOT NULL,
        description TEXT,
        applications TEXT NOT NULL DEFAULT ''
    )"#,
    r#"CREATE TABLE oauth_authorization (
        id TEXT PRIMARY KEY NOT NULL,
        username TEXT NOT NULL,
        application TEXT NOT NULL,
        code TEXT UNIQUE,
        scopes TEXT NOT NULL DEFAULT '',
        redirect_uri TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        issued_at TEXT NOT NULL
    )"#,
    r#"CREATE UNIQUE INDEX idx_oauth_authorization_username_application
        ON oauth_authorization (username, application)"#,
    r#"CREATE TABLE ticket (
        id TEXT PRIMARY KEY NOT NULL,
        username TEXT NOT NULL,
        application TEXT NOT NULL,
        from_browser INTEGER NOT NULL DEFAULT 0,
        remember_me INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE configuration (
        id INTEGER PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        public_url TEXT,
        secret_key TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
];

pub async fn create_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.expect("connect");
    for sql in SCHEMA {
        db.execute(Statement::from_string(DbBackend::Sqlite, *sql))
            .await
            .expect("create schema");
    }
    db
}

pub fn create_test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        server: ServerConfig {
            address: "127.0.0.1".into(),
            port: 8080,
        },
        oauth2: OAuth2Config {
            authorization_ttl: 300,
        },
        tickets: TicketConfig::default(),
        seed_applications: Vec::new(),
    }
}

pub async fn insert_application(
    db: &DatabaseConnection,
    id: &str,
    secret: &str,
    redirect_uri: &str,
) {
    let now = OffsetDateTime::now_utc();
    application::ActiveModel {
        id: Set(id.into()),
        secret: Set(secret.into()),
        redirect_uri: Set(redirect_uri.into()),
        description: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert application");
}

pub async fn insert_user(
    db: &DatabaseConnection,
    username: &str,
    active: bool,
    groups: &str,
    applications: &str,
) {
    user::ActiveModel {
        username: Set(username.into()),
        email: Set(format!("{username}@example.org")),
        active: Set(active),
        password_hash: Set(Some(hash_password(PASSWORD).expect("hash password"))),
        realm: Set("local".into()),
        groups: Set(groups.into()),
        applications: Set(applications.into()),
        created_at: Set(OffsetDateTime::now_utc()),
    }
    .insert(db)
    .await
    .expect("insert user");
}

pub async fn insert_group(db: &DatabaseConnection, name: &str, applications: &str) {
    group::ActiveModel {
        name: Set(name.into()),
        description: Set(None),
        applications: Set(applications.into()),
    }
    .insert(db)
    .await
    .expect("insert group");
}

/// Two applications and four users:
/// - `alice` is granted A1 directly
/// - `bob` reaches A1 through the `staff` group
/// - `carol` is inactive
/// - `dave` has no application
pub async fn seed_directory(db: &DatabaseConnection) {
    insert_application(db, APP_ID, APP_SECRET, APP_REDIRECT).await;
    insert_application(db, BARE_APP_ID, BARE_APP_SECRET, "").await;
    insert_group(db, "staff", APP_ID).await;
    insert_user(db, "alice", true, "", APP_ID).await;
    insert_user(db, "bob", true, "staff", "").await;
    insert_user(db, "carol", false, "", APP_ID).await;
    insert_user(db, "dave", true, "", "").await;
}

pub async fn create_test_resources() -> AppResources {
    let db = create_test_db().await;
    seed_directory(&db).await;
    AppResources::new(Arc::new(db), Arc::new(create_test_config()))
}

pub async fn create_test_server() -> (TestServer, AppResources) {
    let resources = create_test_resources().await;
    let app: Router = build_router(&resources);
    let server = TestServer::new(app).expect("create test server");
    (server, resources)
}

pub fn basic_auth(user: &str, password: &str) -> axum::http::HeaderValue {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
    axum::http::HeaderValue::from_str(&format!("Basic {encoded}")).expect("header value")
}

pub fn bearer(token: &str) -> axum::http::HeaderValue {
    axum::http::HeaderValue::from_str(&format!("Bearer {token}")).expect("header value")
}

/// Extracts a query parameter from a redirect location.
pub fn query_param(location: &str, name: &str) -> Option<String> {
    let url = url::Url::parse(location).expect("absolute location");
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
