//! In-process domain events.
//!
//! Publishing never blocks and never fails the caller: an event with no
//! subscriber is simply dropped.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::entity::configuration;
use crate::oauth2::{AuthorizationStore, TicketStore};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    /// The configuration record was saved. Carries the new state.
    ConfigurationUpdated(configuration::Model),
    /// An application was removed from the registry.
    ApplicationDeleted(String),
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: DomainEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(?event, "No subscribers for event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

/// Removes the grants of deleted applications.
pub fn spawn_application_cleanup(
    db: Arc<DatabaseConnection>,
    config: Arc<AppConfig>,
    events: &EventBus,
) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    let authorizations = AuthorizationStore::new(db.clone(), config.oauth2.clone());
    let tickets = TicketStore::new(db, config.tickets.clone());

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(DomainEvent::ApplicationDeleted(application)) => {
                    purge_application(&authorizations, &tickets, &application).await;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Application cleanup listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[tracing::instrument(skip(authorizations, tickets))]
async fn purge_application(
    authorizations: &AuthorizationStore,
    tickets: &TicketStore,
    application: &str,
) {
    match authorizations.delete_for_application(application).await {
        Ok(removed) => tracing::info!(removed, "Removed authorizations"),
        Err(e) => tracing::error!(error = %e, "Failed to remove authorizations"),
    }
    match tickets.delete_for_application(application).await {
        Ok(removed) => tracing::info!(removed, "Removed tickets"),
        Err(e) => tracing::error!(error = %e, "Failed to remove tickets"),
    }
}
