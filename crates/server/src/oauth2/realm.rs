//! Stateless credential verification.
//!
//! Passwords are stored as Argon2id PHC strings. Authentication returns the
//! subject explicitly; nothing is attached to a session.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::entity::user;
use crate::error::GrantError;

/// Realm that authenticates against the stored password hash.
pub const LOCAL_REALM: &str = "local";

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedSubject {
    pub username: String,
    pub realm: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Realm;

impl Realm {
    /// Checks the presented password against the user's stored hash.
    pub fn authenticate(
        &self,
        user: &user::Model,
        password: &str,
    ) -> Result<AuthenticatedSubject, GrantError> {
        let Some(hash) = user.password_hash.as_deref() else {
            return Err(GrantError::invalid_grant("Bad user credentials"));
        };
        if !verify_password(password, hash) {
            return Err(GrantError::invalid_grant("Bad user credentials"));
        }
        Ok(AuthenticatedSubject {
            username: user.username.clone(),
            realm: LOCAL_REALM.to_string(),
        })
    }

    /// Post-authentication hook: the subject must come from the user's own realm.
    pub fn validate(&self, subject: &AuthenticatedSubject, user: &user::Model) -> Result<(), GrantError> {
        if subject.username != user.username {
            return Err(GrantError::invalid_grant("Authenticated subject mismatch"));
        }
        if subject.realm != user.realm {
            return Err(GrantError::invalid_grant(format!(
                "User belongs to realm {}",
                user.realm
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn bob(hash: Option<String>, realm: &str) -> user::Model {
        user::Model {
            username: "bob".into(),
            email: "bob@example.org".into(),
            active: true,
            password_hash: hash,
            realm: realm.into(),
            groups: String::new(),
            applications: String::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-valid-hash"));
    }

    #[test]
    fn authenticate_returns_subject() {
        let user = bob(Some(hash_password("pw").unwrap()), LOCAL_REALM);
        let subject = Realm.authenticate(&user, "pw").unwrap();
        assert_eq!(subject.username, "bob");
        assert!(Realm.validate(&subject, &user).is_ok());
    }

    #[test]
    fn user_without_hash_cannot_authenticate() {
        let user = bob(None, LOCAL_REALM);
        assert!(matches!(
            Realm.authenticate(&user, "pw"),
            Err(GrantError::InvalidGrant(_))
        ));
    }

    #[test]
    fn foreign_realm_fails_validation() {
        let user = bob(Some(hash_password("pw").unwrap()), "ldap");
        let subject = Realm.authenticate(&user, "pw").unwrap();
        assert!(matches!(
            Realm.validate(&subject, &user),
            Err(GrantError::InvalidGrant(_))
        ));
    }
}
