use axum::http::StatusCode;
use sea_orm::DbErr;
use thiserror::Error;

use crate::configuration::ConfigurationError;
use crate::oauth2::codec::EncodingError;
use crate::vault::CryptoError;

/// Persistence failures shared by every store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised by the authorize and token flows.
///
/// Each variant maps to one OAuth2 error code. The description never carries
/// internal detail; wrapped store, crypto and encoding errors are logged and
/// reported as `server_error`.
#[derive(Debug, Error)]
pub enum GrantError {
    #[error("Unknown application {0}")]
    UnknownClient(String),
    #[error("Application {0} has no redirect URI")]
    MissingRedirectUri(String),
    #[error("Redirect URI is not allowed for this application")]
    InvalidRedirectUri,
    #[error("Client authentication failed")]
    InvalidClient,
    #[error("{0}")]
    InvalidGrant(String),
    #[error("User is not active")]
    InactiveUser,
    #[error("Unknown user")]
    UnknownUser,
    #[error("User has no access to this application")]
    AccessDenied,
    #[error("Unsupported grant type {0}")]
    UnsupportedGrantType(String),
    #[error("Unsupported response type {0}")]
    UnsupportedResponseType(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl From<DbErr> for GrantError {
    fn from(err: DbErr) -> Self {
        Self::Store(StoreError::Database(err))
    }
}

impl From<ConfigurationError> for GrantError {
    fn from(err: ConfigurationError) -> Self {
        match err {
            ConfigurationError::Store(e) => Self::Store(e),
            ConfigurationError::Crypto(e) => Self::Crypto(e),
        }
    }
}

impl GrantError {
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::InvalidGrant(description.into())
    }

    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::InvalidRequest(description.into())
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            // Unknown applications are reported like bad secrets
            Self::UnknownClient(_) | Self::InvalidClient => "invalid_client",
            Self::MissingRedirectUri(_) => "missing_application_redirect_uri",
            Self::InvalidRedirectUri => "invalid_redirect_uri",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::InactiveUser => "inactive_user",
            Self::UnknownUser => "unknown_user",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::UnsupportedResponseType(_) => "unsupported_response_type",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Store(_) | Self::Crypto(_) | Self::Encoding(_) => "server_error",
        }
    }

    pub fn description(&self) -> String {
        if self.is_internal() {
            "The server encountered an internal error".to_string()
        } else {
            self.to_string()
        }
    }

    /// Every grant failure, client authentication and internal errors
    /// included, is reported as 400. Internal detail only goes to the log.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Crypto(_) | Self::Encoding(_))
    }

    /// Access denial is a refinement of `invalid_grant`.
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::InvalidGrant(_) | Self::AccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_client_reports_invalid_client() {
        let err = GrantError::UnknownClient("A9".into());
        assert_eq!(err.error_code(), "invalid_client");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(GrantError::InvalidClient.error_code(), "invalid_client");
        assert_eq!(GrantError::InvalidClient.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_hide_detail() {
        let err = GrantError::from(DbErr::Custom("connection reset by peer".into()));
        assert_eq!(err.error_code(), "server_error");
        assert!(!err.description().contains("connection reset"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn access_denied_is_an_invalid_grant() {
        assert!(GrantError::AccessDenied.is_invalid_grant());
        assert!(GrantError::invalid_grant("expired").is_invalid_grant());
        assert!(!GrantError::InactiveUser.is_invalid_grant());
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = StoreError::not_found("ticket", "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "ticket not found: abc");
    }
}
