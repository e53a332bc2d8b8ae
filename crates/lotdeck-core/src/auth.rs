//! Operator authentication.
//!
//! Provides password hashing for operator accounts and the in-memory
//! session table the API checks on every mutating request.
//!
//! ## Features
//!
//! - Password validation (minimum 8 characters)
//! - Argon2 password hashing
//! - Sessions bound to an operator id with a 30-minute sliding timeout
//!
//! ## Usage
//!
//! ```
//! use lotdeck_core::auth::AuthManager;
//!
//! let auth = AuthManager::new();
//!
//! let hash = auth.hash_password("lot-owner-1").unwrap();
//! assert!(auth.verify_password("lot-owner-1", &hash).unwrap());
//!
//! let session = auth.create_session(42);
//! assert_eq!(auth.validate_session(&session), Some(42));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum password length requirement.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Idle time after which a session expires.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password is too short.
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    /// Password is empty.
    #[error("password cannot be empty")]
    PasswordEmpty,

    /// Password hashing failed.
    #[error("failed to hash password: {0}")]
    HashingFailed(String),

    /// Stored hash could not be parsed.
    #[error("failed to verify password: {0}")]
    VerificationFailed(String),
}

/// Result type for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Opaque token handed to the dashboard after login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Create a new random session token.
    pub fn new() -> Self {
        let salt = SaltString::generate(&mut OsRng);
        Self(salt.to_string())
    }

    /// Reconstructs a token received from a client.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
struct SessionData {
    operator_id: i64,
    last_used: Instant,
}

impl SessionData {
    fn new(operator_id: i64) -> Self {
        Self {
            operator_id,
            last_used: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.last_used.elapsed() > SESSION_TIMEOUT
    }
}

/// Active sessions with sliding expiry. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionToken, SessionData>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `operator_id`.
    pub fn create_session(&self, operator_id: i64) -> SessionToken {
        let token = SessionToken::new();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(token.clone(), SessionData::new(operator_id));

        // Clean up expired sessions while we have the lock
        sessions.retain(|_, data| !data.is_expired());

        token
    }

    /// Returns the session's operator and refreshes its expiry.
    pub fn validate_session(&self, token: &SessionToken) -> Option<i64> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());

        let data = sessions.get_mut(token)?;
        if data.is_expired() {
            sessions.remove(token);
            return None;
        }
        data.last_used = Instant::now();
        Some(data.operator_id)
    }

    pub fn invalidate_session(&self, token: &SessionToken) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(token).is_some()
    }

    /// Ends every session belonging to `operator_id`.
    pub fn invalidate_operator(&self, operator_id: i64) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, data| data.operator_id != operator_id);
    }

    pub fn active_session_count(&self) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.values().filter(|d| !d.is_expired()).count()
    }

    pub fn cleanup_expired(&self) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, data| !data.is_expired());
    }
}

/// Password hashing plus session management.
#[derive(Debug, Clone, Default)]
pub struct AuthManager {
    sessions: SessionManager,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a password meets requirements.
    pub fn validate_password(password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(AuthError::PasswordEmpty);
        }

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort);
        }

        Ok(())
    }

    /// Hash a password using Argon2, returning a PHC string.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        Self::validate_password(password)?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashingFailed(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| AuthError::VerificationFailed(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::VerificationFailed(e.to_string())),
        }
    }

    /// Call this after successful password verification.
    pub fn create_session(&self, operator_id: i64) -> SessionToken {
        self.sessions.create_session(operator_id)
    }

    pub fn validate_session(&self, token: &SessionToken) -> Option<i64> {
        self.sessions.validate_session(token)
    }

    pub fn logout(&self, token: &SessionToken) -> bool {
        self.sessions.invalidate_session(token)
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.active_session_count()
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.sessions
    }
}
