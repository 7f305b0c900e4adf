//! Deployment configuration record and the secrets it protects.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, DbErr, EntityTrait, SqlErr};
use thiserror::Error;
use time::OffsetDateTime;

use crate::cache::{CONFIGURATION_CACHE_KEY, ConfigurationCache};
use crate::config::ServerConfig;
use crate::entity::configuration::{self, CONFIGURATION_ID};
use crate::error::StoreError;
use crate::events::{DomainEvent, EventBus};
use crate::vault::{CryptoError, KeyMaterial, SecretVault};

pub const DEFAULT_NAME: &str = "Identity Provider";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<DbErr> for ConfigurationError {
    fn from(err: DbErr) -> Self {
        Self::Store(StoreError::Database(err))
    }
}

/// Editable part of the configuration. The secret key is never updated.
#[derive(Clone, Debug, Default)]
pub struct ConfigurationUpdate {
    pub name: String,
    pub public_url: Option<String>,
}

#[derive(Clone)]
pub struct ConfigurationService {
    db: Arc<DatabaseConnection>,
    cache: ConfigurationCache,
    events: EventBus,
    server: ServerConfig,
}

impl ConfigurationService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventBus, server: ServerConfig) -> Self {
        Self {
            db,
            cache: ConfigurationCache::default(),
            events,
            server,
        }
    }

    /// Returns the configuration, creating it with a fresh key on first use.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self) -> Result<configuration::Model, ConfigurationError> {
        if let Some(cached) = self.cache.get(&CONFIGURATION_CACHE_KEY) {
            return Ok(cached);
        }

        let model = match configuration::Entity::find_by_id(CONFIGURATION_ID)
            .one(self.db.as_ref())
            .await?
        {
            Some(model) => model,
            None => self.create().await?,
        };

        self.cache.insert(CONFIGURATION_CACHE_KEY, model.clone());
        Ok(model)
    }

    async fn create(&self) -> Result<configuration::Model, ConfigurationError> {
        let key = SecretVault::generate_key()?;
        let now = OffsetDateTime::now_utc();
        let record = configuration::ActiveModel {
            id: Set(CONFIGURATION_ID),
            name: Set(DEFAULT_NAME.to_string()),
            public_url: Set(None),
            secret_key: Set(key.as_hex().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match record.insert(self.db.as_ref()).await {
            Ok(model) => {
                tracing::info!("Created configuration with a new secret key");
                Ok(model)
            }
            // Another request created it first; use theirs.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                configuration::Entity::find_by_id(CONFIGURATION_ID)
                    .one(self.db.as_ref())
                    .await?
                    .ok_or_else(|| {
                        StoreError::not_found("configuration", CONFIGURATION_ID.to_string()).into()
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persists name and public URL, then announces the new configuration.
    #[tracing::instrument(skip(self, update))]
    pub async fn save(
        &self,
        update: ConfigurationUpdate,
    ) -> Result<configuration::Model, ConfigurationError> {
        let current = self.get().await?;

        let mut active: configuration::ActiveModel = current.into();
        active.name = Set(update.name);
        active.public_url = Set(update.public_url.filter(|url| !url.trim().is_empty()));
        active.updated_at = Set(OffsetDateTime::now_utc());
        let saved = active.update(self.db.as_ref()).await?;

        self.cache.invalidate(&CONFIGURATION_CACHE_KEY);
        self.events
            .publish(DomainEvent::ConfigurationUpdated(saved.clone()));
        Ok(saved)
    }

    /// Public URL, falling back to the listening address.
    pub async fn public_url(&self) -> Result<String, ConfigurationError> {
        let config = self.get().await?;
        Ok(match config.public_url {
            Some(url) if !url.is_empty() => url,
            _ => format!("https://{}:{}", self.server.address, self.server.port),
        })
    }

    pub async fn key_material(&self) -> Result<KeyMaterial, ConfigurationError> {
        let config = self.get().await?;
        Ok(KeyMaterial::from_hex(config.secret_key)?)
    }

    pub async fn encrypt(&self, plaintext: &str) -> Result<String, ConfigurationError> {
        let key = self.key_material().await?;
        Ok(SecretVault::encrypt(plaintext, &key)?)
    }

    pub async fn decrypt(&self, hex_ciphertext: &str) -> Result<String, ConfigurationError> {
        let key = self.key_material().await?;
        Ok(SecretVault::decrypt(hex_ciphertext, &key)?)
    }
}
