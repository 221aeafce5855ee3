pub mod api_key;
pub mod basic;
pub mod jwt;

use chrono::Duration;
use serde::Serialize;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::error::AppError;
use api_key::{matches_static_key, ApiKeySigner};

const ADMIN_ROLE: &str = "admin";
const SERVICE_ROLE: &str = "service";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization scheme")]
    InvalidScheme,
    #[error("Malformed credentials")]
    MalformedCredentials,
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Invalid API key or token")]
    UnknownCredential,
    #[error("Token signing failed: {0}")]
    Signing(String),
    #[error("Password check failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(_) | AuthError::Hashing(_) => AppError::internal(err.to_string()),
            other => AppError::unauthorized(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    StaticKey,
    IssuedKey,
    AccessToken,
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub subject: String,
    pub role: String,
    pub kind: CredentialKind,
}

#[derive(Debug, Clone)]
pub struct UserAccount {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

pub struct Authenticator {
    secret: String,
    static_keys: Vec<String>,
    signer: ApiKeySigner,
    token_ttl: Duration,
    users: Vec<UserAccount>,
}

impl Authenticator {
    pub fn new(config: &AuthConfig) -> Self {
        let users = config
            .admin_password_hash
            .as_ref()
            .map(|hash| UserAccount {
                username: config.admin_username.clone(),
                password_hash: hash.clone(),
                role: ADMIN_ROLE.to_string(),
            })
            .into_iter()
            .collect();

        Self {
            secret: config.secret_key.clone(),
            static_keys: config.api_keys.clone(),
            signer: ApiKeySigner::new(&config.secret_key),
            token_ttl: Duration::minutes(config.token_ttl_minutes),
            users,
        }
    }

    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl.num_seconds()
    }

    /// Validates the credential from `Authorization: Bearer <token>`.
    ///
    /// Static keys are tried first, then issued API keys, then access tokens.
    pub fn authenticate_bearer(&self, token: &str) -> Result<Principal, AuthError> {
        if token.is_empty() {
            return Err(AuthError::UnknownCredential);
        }

        if matches_static_key(token, &self.static_keys) {
            return Ok(Principal {
                subject: "api-key".to_string(),
                role: SERVICE_ROLE.to_string(),
                kind: CredentialKind::StaticKey,
            });
        }

        if let Some(username) = self.signer.verify(token) {
            let role = self
                .find_user(&username)
                .map(|u| u.role.clone())
                .unwrap_or_else(|| SERVICE_ROLE.to_string());
            return Ok(Principal {
                subject: username,
                role,
                kind: CredentialKind::IssuedKey,
            });
        }

        // Only JWT-shaped values get a token-specific error.
        if token.split('.').count() != 3 {
            return Err(AuthError::UnknownCredential);
        }
        let claims = jwt::verify_token(token, &self.secret)?;
        Ok(Principal {
            subject: claims.sub,
            role: claims.role,
            kind: CredentialKind::AccessToken,
        })
    }

    /// Checks a username/password pair. bcrypt is slow; call from a blocking task.
    pub fn verify_password(&self, username: &str, password: &str) -> Result<&UserAccount, AuthError> {
        let user = self
            .find_user(username)
            .ok_or(AuthError::InvalidCredentials)?;
        if bcrypt::verify(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self.verify_password(username, password)?;
        jwt::sign_token(&user.username, &user.role, &self.secret, self.token_ttl)
    }

    pub fn issue_api_key(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self.verify_password(username, password)?;
        Ok(self.signer.issue(&user.username))
    }

    fn find_user(&self, username: &str) -> Option<&UserAccount> {
        self.users.iter().find(|u| u.username == username)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_SECRET: &str = "unit-test-secret";
    pub(crate) const TEST_API_KEY: &str = "static-key-1";
    pub(crate) const ADMIN_PASSWORD: &str = "admin123";

    pub(crate) fn test_authenticator() -> Authenticator {
        Authenticator::new(&AuthConfig {
            secret_key: TEST_SECRET.to_string(),
            api_keys: vec![TEST_API_KEY.to_string(), "static-key-2".to_string()],
            token_ttl_minutes: 30,
            admin_username: "admin".to_string(),
            admin_password_hash: Some(bcrypt::hash(ADMIN_PASSWORD, 4).unwrap()),
        })
    }

    #[test]
    fn configured_static_key_is_accepted() {
        let principal = test_authenticator()
            .authenticate_bearer(TEST_API_KEY)
            .unwrap();
        assert_eq!(principal.kind, CredentialKind::StaticKey);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = test_authenticator()
            .authenticate_bearer("not-configured")
            .unwrap_err();
        assert!(matches!(err, AuthError::UnknownCredential));
    }

    #[test]
    fn empty_bearer_is_rejected() {
        assert!(test_authenticator().authenticate_bearer("").is_err());
    }

    #[test]
    fn login_issues_a_token_the_gate_accepts() {
        let auth = test_authenticator();
        let token = auth.login("admin", ADMIN_PASSWORD).unwrap();

        let principal = auth.authenticate_bearer(&token).unwrap();
        assert_eq!(principal.subject, "admin");
        assert_eq!(principal.role, "admin");
        assert_eq!(principal.kind, CredentialKind::AccessToken);
        assert_eq!(auth.token_ttl_seconds(), 1800);
    }

    #[test]
    fn expired_token_is_rejected_by_the_gate() {
        let auth = test_authenticator();
        let token = jwt::sign_token("admin", "admin", TEST_SECRET, Duration::minutes(-1)).unwrap();
        assert!(matches!(
            auth.authenticate_bearer(&token),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn issued_api_key_is_accepted() {
        let auth = test_authenticator();
        let key = auth.issue_api_key("admin", ADMIN_PASSWORD).unwrap();

        let principal = auth.authenticate_bearer(&key).unwrap();
        assert_eq!(principal.subject, "admin");
        assert_eq!(principal.kind, CredentialKind::IssuedKey);
    }

    #[test]
    fn wrong_password_and_unknown_user_are_rejected() {
        let auth = test_authenticator();
        assert!(matches!(
            auth.login("admin", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.issue_api_key("nobody", ADMIN_PASSWORD),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn logins_are_disabled_without_a_password_hash() {
        let auth = Authenticator::new(&AuthConfig {
            secret_key: TEST_SECRET.to_string(),
            api_keys: Vec::new(),
            token_ttl_minutes: 30,
            admin_username: "admin".to_string(),
            admin_password_hash: None,
        });
        assert!(auth.login("admin", "").is_err());
    }
}
