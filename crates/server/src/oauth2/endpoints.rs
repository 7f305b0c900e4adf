//! OAuth2 HTTP endpoints.
//!
//! - `GET /oauth/authz` issues an authorization code to an authenticated user
//! - `POST /oauth/token` exchanges a code or user credentials for a ticket

use crate::api::auth::{CurrentUser, basic_credentials};
use crate::error::GrantError;
use crate::oauth2::grant::{
    AuthorizeRequest, ClientCredentials, GrantType, TokenGrant, TokenResponse,
};
use crate::oauth2::{OAUTH2_TAG, state::OAuth2State};
use axum::{
    Form, Json,
    extract::{RawQuery, State, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Creates the OAuth2 router.
pub fn router(state: OAuth2State) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(authorize))
        .routes(routes!(token))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AuthorizeParams {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
}

impl AuthorizeParams {
    /// Lenient parsing: unknown keys are ignored and the first occurrence wins,
    /// so `state` survives otherwise malformed requests.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "response_type" => &mut params.response_type,
                "client_id" => &mut params.client_id,
                "redirect_uri" => &mut params.redirect_uri,
                "scope" => &mut params.scope,
                "state" => &mut params.state,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    fn into_request(self) -> Result<AuthorizeRequest, GrantError> {
        if let Some(response_type) = self.response_type.as_deref()
            && response_type != "code"
        {
            return Err(GrantError::UnsupportedResponseType(response_type.to_string()));
        }
        let client_id = self
            .client_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GrantError::invalid_request("client_id is required"))?;
        Ok(AuthorizeRequest {
            client_id,
            redirect_uri: self.redirect_uri,
            scopes: self
                .scope
                .as_deref()
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            state: self.state,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl TokenRequest {
    fn grant(&self) -> Result<TokenGrant, GrantError> {
        let grant_type: GrantType = self
            .grant_type
            .as_deref()
            .ok_or_else(|| GrantError::invalid_request("grant_type is required"))?
            .parse()?;
        match grant_type {
            GrantType::AuthorizationCode => Ok(TokenGrant::AuthorizationCode {
                code: required(&self.code, "code")?,
                redirect_uri: self.redirect_uri.clone(),
            }),
            GrantType::Password => Ok(TokenGrant::Password {
                username: required(&self.username, "username")?,
                password: required(&self.password, "password")?,
            }),
        }
    }

    /// Basic authentication wins over form fields.
    fn credentials(&self, headers: &HeaderMap) -> Result<ClientCredentials, GrantError> {
        if let Some((client_id, client_secret)) = basic_credentials(headers) {
            return Ok(ClientCredentials {
                client_id,
                client_secret,
            });
        }
        Ok(ClientCredentials {
            client_id: required(&self.client_id, "client_id")?,
            client_secret: self.client_secret.clone().unwrap_or_default(),
        })
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String, GrantError> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GrantError::invalid_request(format!("{name} is required")))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl ErrorResponse {
    pub fn from_grant_error(err: &GrantError, state: Option<String>) -> Self {
        if err.is_internal() {
            tracing::error!(error = %err, "Grant failed");
        }
        Self {
            error: err.error_code().to_string(),
            error_description: Some(err.description()),
            state,
        }
    }
}

fn grant_error_response(err: &GrantError, state: Option<String>) -> Response {
    (
        err.status_code(),
        Json(ErrorResponse::from_grant_error(err, state)),
    )
        .into_response()
}

const NO_STORE: [(header::HeaderName, &str); 2] = [
    (header::CACHE_CONTROL, "no-store"),
    (header::PRAGMA, "no-cache"),
];

/// OAuth2 Authorization endpoint.
#[tracing::instrument(skip(state, user, query), fields(username = %user.username))]
#[utoipa::path(
    get,
    path = "/authz",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Authorize",
    summary = "Issue an authorization code",
    description = "Issues a one-time authorization code for the authenticated user and redirects \
                   to the application's redirect URI with `code`, `expires_in` and `state`.\n\n\
                   The redirect URI must start with the application's registered redirect URI; \
                   when omitted, the registered one is used.\n\n\
                   **Authentication:** a Bearer access token or Basic user credentials.",
    params(
        ("client_id" = String, Query, description = "Identifier of the registered application."),
        ("redirect_uri" = Option<String>, Query, description = "Redirect URI; must extend the registered one."),
        ("scope" = Option<String>, Query, description = "Space-separated scopes (e.g. `openid`)."),
        ("state" = Option<String>, Query, description = "Opaque value returned unchanged."),
        ("response_type" = Option<String>, Query, description = "Must be `code` when present."),
    ),
    security(("bearer_auth" = []), ("basic_auth" = [])),
    responses(
        (status = 302, description = "Redirect back to the application with the authorization code"),
        (status = 400, description = "Unknown application or invalid redirect URI", body = ErrorResponse),
        (status = 401, description = "Missing or invalid caller credentials", body = crate::api::auth::AuthError),
    )
)]
pub async fn authorize(
    State(state): State<OAuth2State>,
    user: CurrentUser,
    RawQuery(query): RawQuery,
) -> Response {
    let params = AuthorizeParams::from_query(query.as_deref());
    let echo_state = params.state.clone();

    let request = match params.into_request() {
        Ok(request) => request,
        Err(e) => return grant_error_response(&e, echo_state),
    };

    match state.orchestrator().authorize(&request, &user.username).await {
        Ok(grant) => (StatusCode::FOUND, [(header::LOCATION, grant.location)]).into_response(),
        Err(e) => {
            if !e.is_internal() {
                tracing::warn!(error = e.error_code(), "Authorization rejected");
            }
            grant_error_response(&e, echo_state)
        }
    }
}

/// OAuth2 Token endpoint.
#[tracing::instrument(skip(state, headers, form))]
#[utoipa::path(
    post,
    path = "/token",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Token",
    summary = "Exchange an authorization code or user credentials for an access token",
    description = "**Supported grant types:**\n\
                   - `authorization_code`: `code` and the `redirect_uri` used at authorization\n\
                   - `password`: `username` (or email) and `password`\n\n\
                   **Client authentication:** HTTP Basic, or `client_id` and `client_secret` in the body.\n\n\
                   An `id_token` is returned for authorization codes issued with the `openid` scope.",
    request_body(
        content = TokenRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Token request parameters"
    ),
    responses(
        (status = 200, description = "Ticket issued", body = TokenResponse),
        (status = 400, description = "Invalid request, grant or client credentials", body = ErrorResponse),
    )
)]
pub async fn token(
    State(state): State<OAuth2State>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let result = match form {
        Ok(Form(params)) => exchange(&state, &headers, &params).await,
        Err(rejection) => Err(GrantError::invalid_request(rejection.body_text())),
    };

    match result {
        Ok(response) => (StatusCode::OK, NO_STORE, Json(response)).into_response(),
        Err(e) => (
            e.status_code(),
            NO_STORE,
            Json(ErrorResponse::from_grant_error(&e, None)),
        )
            .into_response(),
    }
}

async fn exchange(
    state: &OAuth2State,
    headers: &HeaderMap,
    params: &TokenRequest,
) -> Result<TokenResponse, GrantError> {
    let grant = params.grant()?;
    let credentials = params.credentials(headers)?;
    state.orchestrator().token(&credentials, &grant).await
}
