//! Bearer session tickets.

use crate::config::TicketConfig;
use crate::entity::ticket;
use crate::error::StoreError;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

#[derive(Clone)]
pub struct TicketStore {
    db: Arc<DatabaseConnection>,
    policy: TicketConfig,
}

impl TicketStore {
    pub fn new(db: Arc<DatabaseConnection>, policy: TicketConfig) -> Self {
        Self { db, policy }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        username: &str,
        application: &str,
        from_browser: bool,
        remember_me: bool,
    ) -> Result<ticket::Model, StoreError> {
        let record = ticket::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            username: Set(username.to_string()),
            application: Set(application.to_string()),
            from_browser: Set(from_browser),
            remember_me: Set(remember_me),
            created_at: Set(OffsetDateTime::now_utc()),
        };
        let created = record.insert(self.db.as_ref()).await?;
        tracing::info!(ticket = %created.id, "Issued ticket");
        Ok(created)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<ticket::Model, StoreError> {
        ticket::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| StoreError::not_found("ticket", id))
    }

    /// Like [`Self::find_by_id`], but expired tickets are not found.
    pub async fn find_active(&self, id: &str) -> Result<ticket::Model, StoreError> {
        let found = self.find_by_id(id).await?;
        if self.expiration_of(&found) <= OffsetDateTime::now_utc() {
            return Err(StoreError::not_found("ticket", id));
        }
        Ok(found)
    }

    /// Removes the ticket if it exists.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = ticket::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected > 0 {
            tracing::info!("Ticket removed");
        }
        Ok(())
    }

    pub fn ttl_of(&self, ticket: &ticket::Model) -> i64 {
        if ticket.remember_me {
            self.policy.remember_me_ttl
        } else if ticket.from_browser {
            self.policy.browser_ttl
        } else {
            self.policy.default_ttl
        }
    }

    pub fn expiration_of(&self, ticket: &ticket::Model) -> OffsetDateTime {
        ticket.created_at + Duration::seconds(self.ttl_of(ticket))
    }

    pub fn expires_in(&self, ticket: &ticket::Model) -> i64 {
        (self.expiration_of(ticket) - OffsetDateTime::now_utc())
            .whole_seconds()
            .max(0)
    }

    pub async fn delete_for_application(&self, application: &str) -> Result<u64, StoreError> {
        let result = ticket::Entity::delete_many()
            .filter(ticket::Column::Application.eq(application))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
