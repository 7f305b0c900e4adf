//! OAuth2 grant and bearer ticket authority.
//!
//! Registered applications obtain tickets for directory users through the
//! authorization-code or password grant. Tickets double as access tokens and
//! can be introspected or deleted by id.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::configuration::ConfigurationService;
use crate::events::EventBus;

pub mod api;
pub mod cache;
pub mod config;
pub mod configuration;
pub mod entity;
pub mod error;
pub mod events;
pub mod oauth2;
pub mod seed;
pub mod vault;

#[derive(Clone)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub configuration: ConfigurationService,
    pub events: EventBus,
}

impl AppResources {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Self {
        let events = EventBus::new();
        let configuration =
            ConfigurationService::new(db.clone(), events.clone(), config.server.clone());
        Self {
            db,
            config,
            configuration,
            events,
        }
    }
}
