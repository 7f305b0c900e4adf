//! Directory user account.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::split_set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "directory_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub active: bool,
    /// Argon2id hash in PHC format
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub realm: String,
    /// Space-separated group names
    pub groups: String,
    /// Space-separated application ids the user may use directly
    pub applications: String,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn groups_list(&self) -> Vec<String> {
        split_set(&self.groups)
    }

    pub fn applications_list(&self) -> Vec<String> {
        split_set(&self.applications)
    }
}
