//! Login sessions gating room creation.
//!
//! Only `create-room` is authenticated up front. Joining a room and the
//! in-room actions are authorized by possession of the encrypted
//! connection-id instead - an unforgeable capability tied to one room's
//! secret - so no bearer token travels with them.

use dashmap::DashMap;
use serde::Deserialize;

use crate::crypto;
use crate::error::{JamError, JamResult};
use crate::protocol_constants::AUTH_TOKEN_LEN;
use crate::utils::now_millis;

/// Credentials accepted by the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// An issued login session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_name: String,
    pub issued_at_ms: u64,
}

/// Issues and validates opaque bearer tokens for the login endpoint.
pub struct AuthService {
    credentials: Credentials,
    /// token -> session. In-memory only; sessions die with the process.
    sessions: DashMap<String, Session>,
}

impl AuthService {
    /// Creates a service accepting the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            sessions: DashMap::new(),
        }
    }

    /// Validates credentials and issues a fresh bearer token.
    pub fn login(&self, username: &str, password: &str) -> JamResult<String> {
        if username != self.credentials.username || password != self.credentials.password {
            log::warn!("[Auth] Invalid credentials for '{}'", username);
            return Err(JamError::Unauthorized("Invalid credentials".into()));
        }

        let token = crypto::random_string(AUTH_TOKEN_LEN);
        self.sessions.insert(
            token.clone(),
            Session {
                user_name: username.to_string(),
                issued_at_ms: now_millis(),
            },
        );
        log::info!("[Auth] Login successful for '{}'", username);
        Ok(token)
    }

    /// Looks up the session for a bearer token.
    pub fn validate(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).map(|s| s.value().clone())
    }

    /// Extracts and validates the token from an `Authorization` header value.
    ///
    /// Missing or malformed headers are unauthorized (401); a well-formed
    /// bearer token that is not a live session is forbidden (403).
    pub fn authorize(&self, header: Option<&str>) -> JamResult<Session> {
        let header = header.ok_or_else(|| {
            JamError::Unauthorized("Login required: Missing Authorization header".into())
        })?;

        let token = match header.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
                token
            }
            _ => {
                return Err(JamError::Unauthorized(
                    "Login required: Invalid Authorization header format".into(),
                ))
            }
        };

        self.validate(token)
            .ok_or_else(|| JamError::Forbidden("Access denied: Invalid token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(Credentials {
            username: "testuser".into(),
            password: "password".into(),
        })
    }

    #[test]
    fn login_with_valid_credentials_issues_token() {
        let auth = service();
        let token = auth.login("testuser", "password").unwrap();
        assert_eq!(token.len(), AUTH_TOKEN_LEN);

        let session = auth.validate(&token).unwrap();
        assert_eq!(session.user_name, "testuser");
    }

    #[test]
    fn login_with_wrong_credentials_rejected() {
        let auth = service();
        assert!(matches!(
            auth.login("testuser", "wrong"),
            Err(JamError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.login("stranger", "password"),
            Err(JamError::Unauthorized(_))
        ));
    }

    #[test]
    fn each_login_issues_a_distinct_token() {
        let auth = service();
        let a = auth.login("testuser", "password").unwrap();
        let b = auth.login("testuser", "password").unwrap();
        assert_ne!(a, b);
        // Both remain valid; there is no single-session constraint.
        assert!(auth.validate(&a).is_some());
        assert!(auth.validate(&b).is_some());
    }

    #[test]
    fn authorize_header_parsing() {
        let auth = service();
        let token = auth.login("testuser", "password").unwrap();

        assert!(auth.authorize(Some(&format!("Bearer {}", token))).is_ok());
        // Scheme is case-insensitive.
        assert!(auth.authorize(Some(&format!("bearer {}", token))).is_ok());

        assert!(matches!(
            auth.authorize(None),
            Err(JamError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.authorize(Some("Bearer")),
            Err(JamError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.authorize(Some(&format!("Basic {}", token))),
            Err(JamError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.authorize(Some("Bearer not-a-live-session")),
            Err(JamError::Forbidden(_))
        ));
    }
}
