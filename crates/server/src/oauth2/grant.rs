//! OAuth2 grant state machine.
//!
//! ```text
//! authorize: client + redirect check -> find-or-create authorization -> issue code -> redirect
//! token:     client credentials -> code or password check -> ticket -> access (+ id) token
//! ```
//!
//! The orchestrator holds no state of its own; it is assembled per request
//! from the shared stores (see [`crate::oauth2::OAuth2State::orchestrator`]).

use std::str::FromStr;

use serde::Serialize;
use url::Url;
use utoipa::ToSchema;

use crate::configuration::ConfigurationService;
use crate::entity::{application, authorization, ticket};
use crate::error::GrantError;
use crate::oauth2::authorization::AuthorizationStore;
use crate::oauth2::codec::TokenCodec;
use crate::oauth2::directory::UserDirectory;
use crate::oauth2::registrar::{ApplicationRegistry, normalize_redirect_uri};
use crate::oauth2::ticket::TicketStore;
use crate::oauth2::validator::AuthorizationValidator;

/// Scope that turns on identity tokens.
pub const OPENID_SCOPE: &str = "openid";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    Password,
}

impl FromStr for GrantType {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "password" => Ok(Self::Password),
            other => Err(GrantError::UnsupportedGrantType(other.to_string())),
        }
    }
}

/// Client credentials presented at the token endpoint.
#[derive(Clone, Debug)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Grant-specific part of a token request.
#[derive(Clone, Debug)]
pub enum TokenGrant {
    AuthorizationCode {
        code: String,
        redirect_uri: Option<String>,
    },
    Password {
        username: String,
        password: String,
    },
}

impl TokenGrant {
    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::AuthorizationCode { .. } => GrantType::AuthorizationCode,
            Self::Password { .. } => GrantType::Password,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthorizeRequest {
    pub client_id: String,
    pub redirect_uri: Option<String>,
    pub scopes: Vec<String>,
    pub state: Option<String>,
}

/// Outcome of a successful authorize step.
#[derive(Clone, Debug)]
pub struct AuthorizationGrant {
    /// Redirect URI carrying `code`, `expires_in` and `state`.
    pub location: String,
    pub code: String,
    pub expires_in: i64,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

pub struct GrantOrchestrator<'a> {
    pub registry: &'a ApplicationRegistry,
    pub directory: &'a UserDirectory,
    pub authorizations: &'a AuthorizationStore,
    pub tickets: &'a TicketStore,
    pub validator: &'a AuthorizationValidator,
    pub configuration: &'a ConfigurationService,
}

impl GrantOrchestrator<'_> {
    /// Issues a fresh code for `username` and builds the client redirect.
    #[tracing::instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn authorize(
        &self,
        request: &AuthorizeRequest,
        username: &str,
    ) -> Result<AuthorizationGrant, GrantError> {
        let (app, redirect_uri) = self
            .registry
            .resolve_redirect(&request.client_id, request.redirect_uri.as_deref())
            .await?;

        let pending = self.authorizations.find_or_create(username, &app.id).await?;
        let issued = self
            .authorizations
            .issue_code(pending, &request.scopes, &redirect_uri)
            .await?;
        let code = issued
            .code
            .clone()
            .ok_or_else(|| GrantError::invalid_grant("Authorization code was not issued"))?;
        let expires_in = self.authorizations.expires_in(&issued);

        let mut location = Url::parse(&redirect_uri)
            .map_err(|_| GrantError::InvalidRedirectUri)?;
        {
            let mut query = location.query_pairs_mut();
            query.append_pair("code", &code);
            query.append_pair("expires_in", &expires_in.to_string());
            if let Some(state) = request.state.as_deref() {
                query.append_pair("state", state);
            }
        }

        tracing::info!(expires_in, "Issued authorization code");
        Ok(AuthorizationGrant {
            location: location.into(),
            code,
            expires_in,
        })
    }

    #[tracing::instrument(skip_all, fields(client_id = %credentials.client_id, grant_type = ?grant.grant_type()))]
    pub async fn token(
        &self,
        credentials: &ClientCredentials,
        grant: &TokenGrant,
    ) -> Result<TokenResponse, GrantError> {
        let app = self
            .registry
            .authenticate_client(&credentials.client_id, &credentials.client_secret)
            .await?;

        let result = match grant {
            TokenGrant::AuthorizationCode { code, redirect_uri } => {
                self.exchange_code(&app.id, code, redirect_uri.as_deref())
                    .await
            }
            TokenGrant::Password { username, password } => {
                self.exchange_password(&app, username, password).await
            }
        };

        if let Err(e) = &result
            && !e.is_internal()
        {
            tracing::warn!(error = e.error_code(), "Token request rejected");
        }
        result
    }

    async fn exchange_code(
        &self,
        client_id: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<TokenResponse, GrantError> {
        let authorization = self
            .authorizations
            .find_by_code(code)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    GrantError::invalid_grant("Unknown or expired authorization code")
                } else {
                    e.into()
                }
            })?;

        if authorization.application != client_id {
            return Err(GrantError::invalid_grant(
                "Authorization was issued to another application",
            ));
        }
        if normalize_redirect_uri(redirect_uri) != Some(authorization.redirect_uri.as_str()) {
            return Err(GrantError::invalid_grant(
                "Redirect URI does not match the one of the authorization",
            ));
        }

        let user = self
            .directory
            .find_by_username(&authorization.username)
            .await?
            .filter(|u| u.active)
            .ok_or(GrantError::InactiveUser)?;

        self.authorizations.consume_code(&authorization).await?;

        let ticket = self
            .tickets
            .create(&authorization.username, &authorization.application, false, false)
            .await?;
        self.access_response(&ticket, Some((&authorization, user.email.as_str())))
            .await
    }

    async fn exchange_password(
        &self,
        app: &application::Model,
        login: &str,
        password: &str,
    ) -> Result<TokenResponse, GrantError> {
        let user = self
            .directory
            .find_by_login(login)
            .await?
            .ok_or(GrantError::UnknownUser)?;

        let subject = self.validator.validate(&user, app, password).await?;

        let ticket = self
            .tickets
            .create(&subject.username, &app.id, false, false)
            .await?;
        self.access_response(&ticket, None).await
    }

    async fn access_response(
        &self,
        ticket: &ticket::Model,
        authorization: Option<(&authorization::Model, &str)>,
    ) -> Result<TokenResponse, GrantError> {
        let expires_in = self.tickets.expires_in(ticket);

        let id_token = match authorization {
            Some((authorization, email)) if authorization.has_scope(OPENID_SCOPE) => {
                let codec = TokenCodec::new(
                    self.configuration.public_url().await?,
                    &self.configuration.key_material().await?,
                )?;
                Some(codec.make_id_token(
                    authorization,
                    Some(email),
                    self.tickets.expiration_of(ticket),
                )?)
            }
            _ => None,
        };

        Ok(TokenResponse {
            access_token: TokenCodec::make_access_token(ticket),
            token_type: "Bearer".to_string(),
            expires_in,
            id_token,
        })
    }
}
