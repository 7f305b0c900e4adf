//! Deployment configuration record and the secret vault built on its key.

mod common;

use common::*;
use oauth_ticket_server::AppResources;
use oauth_ticket_server::configuration::{ConfigurationUpdate, DEFAULT_NAME};
use oauth_ticket_server::entity::configuration;
use oauth_ticket_server::events::DomainEvent;
use sea_orm::{EntityTrait, PaginatorTrait};
use std::sync::Arc;

async fn empty_resources() -> AppResources {
    let db = create_test_db().await;
    AppResources::new(Arc::new(db), Arc::new(create_test_config()))
}

#[tokio::test]
async fn test_configuration_is_created_once() {
    let resources = empty_resources().await;

    let first = resources.configuration.get().await.expect("create");
    assert_eq!(first.name, DEFAULT_NAME);
    assert_eq!(first.secret_key.len(), 64);

    let second = resources.configuration.get().await.expect("get");
    assert_eq!(first.secret_key, second.secret_key);

    let rows = configuration::Entity::find()
        .count(resources.db.as_ref())
        .await
        .expect("count");
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_public_url_falls_back_to_listen_address() {
    let resources = empty_resources().await;

    let url = resources.configuration.public_url().await.expect("url");
    assert_eq!(url, "https://127.0.0.1:8080");
}

#[tokio::test]
async fn test_save_publishes_update_and_keeps_key() {
    let resources = empty_resources().await;
    let original = resources.configuration.get().await.expect("create");
    let mut rx = resources.events.subscribe();

    let saved = resources
        .configuration
        .save(ConfigurationUpdate {
            name: "Example IdP".into(),
            public_url: Some("https://idp.example.org".into()),
        })
        .await
        .expect("save");
    assert_eq!(saved.secret_key, original.secret_key);

    match rx.recv().await.expect("event") {
        DomainEvent::ConfigurationUpdated(model) => {
            assert_eq!(model.name, "Example IdP");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(rx.try_recv().is_err());

    // Served from the refreshed cache
    let current = resources.configuration.get().await.expect("get");
    assert_eq!(current.name, "Example IdP");
    assert_eq!(
        resources.configuration.public_url().await.expect("url"),
        "https://idp.example.org"
    );
}

#[tokio::test]
async fn test_blank_public_url_is_cleared() {
    let resources = empty_resources().await;

    let saved = resources
        .configuration
        .save(ConfigurationUpdate {
            name: DEFAULT_NAME.into(),
            public_url: Some("  ".into()),
        })
        .await
        .expect("save");
    assert!(saved.public_url.is_none());
}

#[tokio::test]
async fn test_encrypt_decrypt_with_deployment_key() {
    let resources = empty_resources().await;

    let sealed = resources
        .configuration
        .encrypt("ldap bind password")
        .await
        .expect("encrypt");
    assert_ne!(sealed, "ldap bind password");
    assert!(sealed.chars().all(|c| c.is_ascii_hexdigit()));

    let opened = resources.configuration.decrypt(&sealed).await.expect("decrypt");
    assert_eq!(opened, "ldap bind password");

    let mut tampered = sealed.clone();
    let last = if tampered.ends_with('0') { "1" } else { "0" };
    tampered.replace_range(tampered.len() - 1.., last);
    assert!(resources.configuration.decrypt(&tampered).await.is_err());
}
