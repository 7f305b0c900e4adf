//! Access and identity token encoding.
//!
//! The access token is the ticket id itself, so every use re-reads the ticket.
//! Identity tokens are compact HS256 JWS signed with a subkey derived from the
//! deployment key, never with the encryption key itself.

use crate::entity::{authorization, ticket};
use crate::vault::{CryptoError, KeyMaterial};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Identity token needs a subject")]
    MissingSubject,
    #[error("Identity token needs an audience")]
    MissingAudience,
    #[error("Signing key is unusable: {0}")]
    Key(#[from] CryptoError),
    #[error("Failed to sign identity token: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("Identity token rejected: {0}")]
    Verification(jsonwebtoken::errors::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// HKDF label of the identity token signing key.
const ID_TOKEN_KEY_LABEL: &[u8] = b"oauth-ticket-server id_token HS256";

pub struct TokenCodec {
    issuer: String,
    secret: Vec<u8>,
}

impl TokenCodec {
    pub fn new(issuer: impl Into<String>, key: &KeyMaterial) -> Result<Self, EncodingError> {
        Ok(Self {
            issuer: issuer.into(),
            secret: key.derive(ID_TOKEN_KEY_LABEL)?.to_vec(),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Opaque bearer handle for a ticket. Needs no key.
    pub fn make_access_token(ticket: &ticket::Model) -> String {
        ticket.id.clone()
    }

    /// Signs an identity token for the authorization's user and application.
    ///
    /// `expires_at` is the expiration of the ticket issued alongside.
    pub fn make_id_token(
        &self,
        authorization: &authorization::Model,
        email: Option<&str>,
        expires_at: OffsetDateTime,
    ) -> Result<String, EncodingError> {
        if authorization.username.is_empty() {
            return Err(EncodingError::MissingSubject);
        }
        if authorization.application.is_empty() {
            return Err(EncodingError::MissingAudience);
        }

        let claims = IdTokenClaims {
            iss: self.issuer.clone(),
            sub: authorization.username.clone(),
            aud: authorization.application.clone(),
            iat: OffsetDateTime::now_utc().unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            email: email.map(str::to_string),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(EncodingError::Signing)
    }

    /// Checks signature, issuer, audience and expiry.
    pub fn verify_id_token(
        &self,
        token: &str,
        audience: &str,
    ) -> Result<IdTokenClaims, EncodingError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        decode::<IdTokenClaims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(EncodingError::Verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::SecretVault;
    use time::Duration;

    fn authorization(username: &str, application: &str) -> authorization::Model {
        let now = OffsetDateTime::now_utc();
        authorization::Model {
            id: "auth-1".into(),
            username: username.into(),
            application: application.into(),
            code: None,
            scopes: "openid".into(),
            redirect_uri: "https://app.example/cb".into(),
            created_at: now,
            issued_at: now,
        }
    }

    fn codec() -> TokenCodec {
        let key = SecretVault::generate_key().unwrap();
        TokenCodec::new("https://idp.example", &key).unwrap()
    }

    #[test]
    fn access_token_is_ticket_id() {
        let ticket = ticket::Model {
            id: "0f0e1d2c".into(),
            username: "alice".into(),
            application: "A1".into(),
            from_browser: false,
            remember_me: false,
            created_at: OffsetDateTime::now_utc(),
        };
        assert_eq!(TokenCodec::make_access_token(&ticket), "0f0e1d2c");
    }

    #[test]
    fn id_token_carries_identity_claims() {
        let codec = codec();
        let exp = OffsetDateTime::now_utc() + Duration::hours(1);
        let token = codec
            .make_id_token(&authorization("alice", "A1"), Some("alice@example.org"), exp)
            .unwrap();

        let claims = codec.verify_id_token(&token, "A1").unwrap();
        assert_eq!(claims.iss, "https://idp.example");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.aud, "A1");
        assert_eq!(claims.exp, exp.unix_timestamp());
        assert_eq!(claims.email.as_deref(), Some("alice@example.org"));
    }

    #[test]
    fn wrong_audience_or_key_is_rejected() {
        let codec = codec();
        let exp = OffsetDateTime::now_utc() + Duration::hours(1);
        let token = codec
            .make_id_token(&authorization("alice", "A1"), None, exp)
            .unwrap();

        assert!(codec.verify_id_token(&token, "A2").is_err());
        assert!(self::codec().verify_id_token(&token, "A1").is_err());
    }

    #[test]
    fn encryption_key_does_not_sign_id_tokens() {
        let key = SecretVault::generate_key().unwrap();
        let codec = TokenCodec::new("https://idp.example", &key).unwrap();
        let now = OffsetDateTime::now_utc();
        let claims = IdTokenClaims {
            iss: "https://idp.example".into(),
            sub: "alice".into(),
            aud: "A1".into(),
            iat: now.unix_timestamp(),
            exp: (now + Duration::hours(1)).unix_timestamp(),
            email: None,
        };
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&key.to_bytes().unwrap()),
        )
        .unwrap();

        assert!(matches!(
            codec.verify_id_token(&forged, "A1"),
            Err(EncodingError::Verification(_))
        ));
    }

    #[test]
    fn empty_identity_fails_encoding() {
        let codec = codec();
        let exp = OffsetDateTime::now_utc() + Duration::hours(1);
        assert!(matches!(
            codec.make_id_token(&authorization("", "A1"), None, exp),
            Err(EncodingError::MissingSubject)
        ));
        assert!(matches!(
            codec.make_id_token(&authorization("alice", ""), None, exp),
            Err(EncodingError::MissingAudience)
        ));
    }
}
