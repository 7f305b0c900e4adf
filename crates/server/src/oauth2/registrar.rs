//! Database-backed application registry.

use crate::config::SeedApplication;
use crate::entity::application;
use crate::error::{GrantError, StoreError};
use crate::events::{DomainEvent, EventBus};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait};
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

/// Read contract over registered client applications, plus the seeding and
/// deletion hooks used at startup and by administrators.
#[derive(Clone)]
pub struct ApplicationRegistry {
    db: Arc<DatabaseConnection>,
    events: EventBus,
}

impl ApplicationRegistry {
    pub fn new(db: Arc<DatabaseConnection>, events: EventBus) -> Self {
        Self { db, events }
    }

    pub async fn find(&self, client_id: &str) -> Result<Option<application::Model>, StoreError> {
        Ok(application::Entity::find_by_id(client_id)
            .one(self.db.as_ref())
            .await?)
    }

    /// Resolves an application and checks its shared secret.
    ///
    /// Unknown applications and wrong secrets are indistinguishable to the caller.
    pub async fn authenticate_client(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<application::Model, GrantError> {
        let app = self.find(client_id).await?.ok_or(GrantError::InvalidClient)?;
        if constant_time_eq(app.secret.as_bytes(), client_secret.as_bytes()) {
            Ok(app)
        } else {
            Err(GrantError::InvalidClient)
        }
    }

    /// Resolves the application for the authorize step along with the
    /// effective redirect URI.
    pub async fn resolve_redirect(
        &self,
        client_id: &str,
        redirect_uri: Option<&str>,
    ) -> Result<(application::Model, String), GrantError> {
        let app = self
            .find(client_id)
            .await?
            .ok_or_else(|| GrantError::UnknownClient(client_id.to_string()))?;
        let effective = effective_redirect_uri(&app, redirect_uri)?;
        Ok((app, effective))
    }

    /// Registers a seeded application unless one with that id already exists.
    ///
    /// Returns whether a record was created.
    #[tracing::instrument(skip(self, seed), fields(client_id = %seed.id))]
    pub async fn ensure(&self, seed: &SeedApplication) -> Result<bool, StoreError> {
        if self.find(&seed.id).await?.is_some() {
            return Ok(false);
        }
        let now = OffsetDateTime::now_utc();
        application::ActiveModel {
            id: Set(seed.id.clone()),
            secret: Set(seed.secret.clone()),
            redirect_uri: Set(seed.redirect_uri.clone()),
            description: Set(seed.description.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await?;
        tracing::info!("Registered application");
        Ok(true)
    }

    /// Deletes an application and announces it so its grants get purged.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, client_id: &str) -> Result<(), StoreError> {
        let result = application::Entity::delete_by_id(client_id)
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::not_found("application", client_id));
        }
        self.events
            .publish(DomainEvent::ApplicationDeleted(client_id.to_string()));
        Ok(())
    }
}

/// Applies the prefix policy: an empty parameter selects the registered URI,
/// anything else must stay on the registered origin and extend the registered
/// path at a segment boundary.
pub fn effective_redirect_uri(
    app: &application::Model,
    requested: Option<&str>,
) -> Result<String, GrantError> {
    if !app.has_redirect_uri() {
        return Err(GrantError::MissingRedirectUri(app.id.clone()));
    }
    let Some(uri) = normalize_redirect_uri(requested) else {
        return Ok(app.redirect_uri.trim().to_string());
    };

    let registered =
        Url::parse(app.redirect_uri.trim()).map_err(|_| GrantError::InvalidRedirectUri)?;
    let candidate = Url::parse(uri).map_err(|_| GrantError::InvalidRedirectUri)?;

    if extends_registered(&registered, &candidate) {
        Ok(uri.to_string())
    } else {
        Err(GrantError::InvalidRedirectUri)
    }
}

/// Trimmed redirect URI parameter, `None` when absent or blank.
pub fn normalize_redirect_uri(requested: Option<&str>) -> Option<&str> {
    requested.map(str::trim).filter(|uri| !uri.is_empty())
}

fn extends_registered(registered: &Url, candidate: &Url) -> bool {
    if !candidate.username().is_empty() || candidate.password().is_some() {
        return false;
    }
    if candidate.scheme() != registered.scheme()
        || candidate.host() != registered.host()
        || candidate.port_or_known_default() != registered.port_or_known_default()
    {
        return false;
    }

    let base = registered.path();
    let path = candidate.path();
    path == base
        || (path.starts_with(base)
            && (base.ends_with('/') || path[base.len()..].starts_with('/')))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
