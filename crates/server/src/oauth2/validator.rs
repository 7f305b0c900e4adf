//! Password-grant validators. They run in order and stop at the first failure.

use crate::entity::{application, user};
use crate::error::GrantError;
use crate::oauth2::directory::UserDirectory;
use crate::oauth2::realm::{AuthenticatedSubject, Realm};

#[derive(Clone)]
pub struct AuthorizationValidator {
    directory: UserDirectory,
    realm: Realm,
}

impl AuthorizationValidator {
    pub fn new(directory: UserDirectory, realm: Realm) -> Self {
        Self { directory, realm }
    }

    pub fn validate_user(&self, user: &user::Model) -> Result<(), GrantError> {
        if user.active {
            Ok(())
        } else {
            Err(GrantError::InactiveUser)
        }
    }

    pub async fn validate_application(
        &self,
        user: &user::Model,
        application: &application::Model,
    ) -> Result<(), GrantError> {
        if self.directory.has_application(user, &application.id).await? {
            Ok(())
        } else {
            Err(GrantError::AccessDenied)
        }
    }

    pub fn validate_credentials(
        &self,
        user: &user::Model,
        password: &str,
    ) -> Result<AuthenticatedSubject, GrantError> {
        let subject = self.realm.authenticate(user, password)?;
        self.realm.validate(&subject, user)?;
        Ok(subject)
    }

    #[tracing::instrument(skip_all, fields(username = %user.username, client_id = %application.id))]
    pub async fn validate(
        &self,
        user: &user::Model,
        application: &application::Model,
        password: &str,
    ) -> Result<AuthenticatedSubject, GrantError> {
        self.validate_user(user)?;
        self.validate_application(user, application).await?;
        self.validate_credentials(user, password)
    }
}
