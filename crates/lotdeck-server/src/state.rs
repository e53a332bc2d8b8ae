//! Application state for the API server.

use std::sync::Arc;

use lotdeck_core::auth::AuthManager;
use lotdeck_storage::{Database, StorageError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    /// Password hashing and the session table.
    pub auth: Arc<AuthManager>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self::with_auth(db, AuthManager::new())
    }

    /// Uses an existing auth manager, sharing its sessions.
    pub fn with_auth(db: Database, auth: AuthManager) -> Self {
        Self {
            db: Arc::new(db),
            auth: Arc::new(auth),
        }
    }

    /// Creates application state over an in-memory database.
    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self::new(Database::in_memory()?))
    }
}
