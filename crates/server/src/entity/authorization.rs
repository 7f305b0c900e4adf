//! Authorization-code grant, one per (username, application).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::split_set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_authorization")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub username: String,
    pub application: String,
    /// Current one-time code. `None` until issued and after redemption.
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub code: Option<String>,
    /// Space-separated scopes
    pub scopes: String,
    /// Redirect URI captured when the current code was issued
    pub redirect_uri: String,
    pub created_at: OffsetDateTime,
    /// When the current code was issued
    pub issued_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn scopes_list(&self) -> Vec<String> {
        split_set(&self.scopes)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.split_whitespace().any(|s| s == scope)
    }
}
