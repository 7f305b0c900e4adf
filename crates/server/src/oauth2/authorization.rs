//! Authorization-code grant store.
//!
//! There is at most one authorization per (username, application). Each
//! authorize request re-issues its code, scopes and redirect URI; the code is
//! cleared when redeemed.

use crate::config::OAuth2Config;
use crate::entity::{authorization, join_set};
use crate::error::{GrantError, StoreError};
use crate::vault::CryptoError;
use base64::Engine;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    SqlErr, sea_query::Expr,
};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

/// Generate a 256-bit URL-safe authorization code.
pub fn generate_code() -> Result<String, CryptoError> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes).map_err(|e| CryptoError::Random(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[derive(Clone)]
pub struct AuthorizationStore {
    db: Arc<DatabaseConnection>,
    config: OAuth2Config,
}

impl AuthorizationStore {
    pub fn new(db: Arc<DatabaseConnection>, config: OAuth2Config) -> Self {
        Self { db, config }
    }

    async fn find_by_pair(
        &self,
        username: &str,
        application: &str,
    ) -> Result<Option<authorization::Model>, StoreError> {
        Ok(authorization::Entity::find()
            .filter(authorization::Column::Username.eq(username))
            .filter(authorization::Column::Application.eq(application))
            .one(self.db.as_ref())
            .await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_or_create(
        &self,
        username: &str,
        application: &str,
    ) -> Result<authorization::Model, StoreError> {
        if let Some(existing) = self.find_by_pair(username, application).await? {
            return Ok(existing);
        }

        let now = OffsetDateTime::now_utc();
        let record = authorization::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            username: Set(username.to_string()),
            application: Set(application.to_string()),
            code: Set(None),
            scopes: Set(String::new()),
            redirect_uri: Set(String::new()),
            created_at: Set(now),
            issued_at: Set(now),
        };

        match record.insert(self.db.as_ref()).await {
            Ok(created) => Ok(created),
            // Lost the race against a concurrent authorize for the same pair
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => self
                .find_by_pair(username, application)
                .await?
                .ok_or_else(|| {
                    StoreError::not_found("authorization", format!("{username}/{application}"))
                }),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the code, scopes and redirect URI in a single update.
    #[tracing::instrument(skip(self, authorization, scopes), fields(id = %authorization.id))]
    pub async fn issue_code(
        &self,
        authorization: authorization::Model,
        scopes: &[String],
        redirect_uri: &str,
    ) -> Result<authorization::Model, GrantError> {
        let code = generate_code()?;
        let mut active: authorization::ActiveModel = authorization.into();
        active.code = Set(Some(code));
        active.scopes = Set(join_set(scopes));
        active.redirect_uri = Set(redirect_uri.to_string());
        active.issued_at = Set(OffsetDateTime::now_utc());
        Ok(active.update(self.db.as_ref()).await?)
    }

    /// Finds the authorization currently holding `code`. Expired codes are not found.
    pub async fn find_by_code(&self, code: &str) -> Result<authorization::Model, StoreError> {
        let found = authorization::Entity::find()
            .filter(authorization::Column::Code.eq(code))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| StoreError::not_found("authorization", "code"))?;

        if self.expiration_of(&found) <= OffsetDateTime::now_utc() {
            tracing::debug!(id = %found.id, "Authorization code expired");
            return Err(StoreError::not_found("authorization", "code"));
        }
        Ok(found)
    }

    pub fn expiration_of(&self, authorization: &authorization::Model) -> OffsetDateTime {
        authorization.issued_at + Duration::seconds(self.config.authorization_ttl)
    }

    /// Seconds until the current code expires, never negative.
    pub fn expires_in(&self, authorization: &authorization::Model) -> i64 {
        (self.expiration_of(authorization) - OffsetDateTime::now_utc())
            .whole_seconds()
            .max(0)
    }

    /// Clears the code. Fails when another request redeemed it first.
    #[tracing::instrument(skip(self, authorization), fields(id = %authorization.id))]
    pub async fn consume_code(
        &self,
        authorization: &authorization::Model,
    ) -> Result<(), GrantError> {
        let Some(code) = authorization.code.as_deref() else {
            return Err(GrantError::invalid_grant("Authorization code already used"));
        };
        let result = authorization::Entity::update_many()
            .col_expr(authorization::Column::Code, Expr::value(Option::<String>::None))
            .filter(authorization::Column::Id.eq(authorization.id.as_str()))
            .filter(authorization::Column::Code.eq(code))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 1 {
            Ok(())
        } else {
            Err(GrantError::invalid_grant("Authorization code already used"))
        }
    }

    pub async fn delete_for_application(&self, application: &str) -> Result<u64, StoreError> {
        let result = authorization::Entity::delete_many()
            .filter(authorization::Column::Application.eq(application))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
