//! Read contract over directory users and groups.

use crate::entity::{group, user};
use crate::error::StoreError;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;

#[derive(Clone)]
pub struct UserDirectory {
    db: Arc<DatabaseConnection>,
}

impl UserDirectory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, StoreError> {
        Ok(user::Entity::find_by_id(username)
            .one(self.db.as_ref())
            .await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, StoreError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await?)
    }

    /// Looks the login up as a username first, then as an email address.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_login(&self, login: &str) -> Result<Option<user::Model>, StoreError> {
        if let Some(found) = self.find_by_username(login).await? {
            return Ok(Some(found));
        }
        self.find_by_email(login).await
    }

    /// Group names of a user, empty when the user no longer exists.
    pub async fn groups_of(&self, username: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .find_by_username(username)
            .await?
            .map(|u| u.groups_list())
            .unwrap_or_default())
    }

    /// Whether the user may use the application, directly or through a group.
    #[tracing::instrument(skip(self, user), fields(username = %user.username))]
    pub async fn has_application(
        &self,
        user: &user::Model,
        application: &str,
    ) -> Result<bool, StoreError> {
        if user.applications_list().iter().any(|a| a == application) {
            return Ok(true);
        }
        let groups = user.groups_list();
        if groups.is_empty() {
            return Ok(false);
        }
        let granted = group::Entity::find()
            .filter(group::Column::Name.is_in(groups))
            .all(self.db.as_ref())
            .await?
            .iter()
            .any(|g| g.applications_list().iter().any(|a| a == application));
        Ok(granted)
    }
}
