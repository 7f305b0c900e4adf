//! Caller authentication for endpoints acting on behalf of a user.
//!
//! Accepts either `Authorization: Bearer <access token>` (an unexpired ticket
//! of an active user) or `Authorization: Basic` with the user's password.

use crate::oauth2::OAuth2State;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    Ticket,
    Password,
}

/// The authenticated user, passed explicitly to the grant flows.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub username: String,
    pub method: AuthMethod,
}

/// Error body for authentication and lookup failures.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthError {
    /// Error code (e.g., "invalid_token", "unauthorized")
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl AuthError {
    pub fn invalid_token(description: impl Into<String>) -> Self {
        Self {
            error: "invalid_token".to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn unauthorized(description: impl Into<String>) -> Self {
        Self {
            error: "unauthorized".to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn not_found(description: impl Into<String>) -> Self {
        Self {
            error: "not_found".to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn server_error() -> Self {
        Self {
            error: "server_error".to_string(),
            error_description: None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self.error.as_str() {
            "invalid_token" | "unauthorized" => StatusCode::UNAUTHORIZED,
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::UNAUTHORIZED {
            (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer, Basic")],
                Json(self),
            )
                .into_response()
        } else {
            (status, Json(self)).into_response()
        }
    }
}

/// Decodes `Authorization: Basic` into `(user, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

impl FromRequestParts<OAuth2State> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &OAuth2State,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(&parts.headers) {
            return authenticate_ticket(state, token).await;
        }
        if let Some((login, password)) = basic_credentials(&parts.headers) {
            return authenticate_password(state, &login, &password).await;
        }
        Err(AuthError::unauthorized("Missing Authorization header"))
    }
}

async fn authenticate_ticket(state: &OAuth2State, token: &str) -> Result<CurrentUser, AuthError> {
    let ticket = state.tickets.find_active(token).await.map_err(|e| {
        if e.is_not_found() {
            AuthError::invalid_token("Unknown or expired access token")
        } else {
            tracing::error!(error = %e, "Failed to look up ticket");
            AuthError::server_error()
        }
    })?;

    let user = state
        .directory
        .find_by_username(&ticket.username)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to look up user");
            AuthError::server_error()
        })?;
    match user {
        Some(user) if user.active => Ok(CurrentUser {
            username: user.username,
            method: AuthMethod::Ticket,
        }),
        _ => Err(AuthError::invalid_token("User is not active")),
    }
}

async fn authenticate_password(
    state: &OAuth2State,
    login: &str,
    password: &str,
) -> Result<CurrentUser, AuthError> {
    let user = state
        .directory
        .find_by_login(login)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to look up user");
            AuthError::server_error()
        })?
        .filter(|u| u.active)
        .ok_or_else(|| AuthError::unauthorized("Bad user credentials"))?;

    let subject = state
        .realm
        .authenticate(&user, password)
        .and_then(|subject| state.realm.validate(&subject, &user).map(|_| subject))
        .map_err(|_| AuthError::unauthorized("Bad user credentials"))?;

    Ok(CurrentUser {
        username: subject.username,
        method: AuthMethod::Password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn auth_error_status_codes() {
        let response = AuthError::invalid_token("test").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

        let response = AuthError::unauthorized("test").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::not_found("test").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AuthError::server_error().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn parses_basic_credentials() {
        let mut headers = HeaderMap::new();
        // "A1:s3:cret" keeps everything after the first colon
        let encoded = base64::engine::general_purpose::STANDARD.encode("A1:s3:cret");
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
        );
        assert_eq!(
            basic_credentials(&headers),
            Some(("A1".to_string(), "s3:cret".to_string()))
        );
    }

    #[test]
    fn ignores_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(basic_credentials(&headers).is_none());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
