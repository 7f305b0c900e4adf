//! Directory group. Membership grants access to the listed applications.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::split_set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "directory_group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub description: Option<String>,
    pub applications: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn applications_list(&self) -> Vec<String> {
        split_set(&self.applications)
    }
}
