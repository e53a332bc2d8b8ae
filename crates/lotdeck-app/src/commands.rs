//! One-shot CLI commands: operator bootstrap and lot import.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use lotdeck_core::auth::{AuthError, AuthManager};
use lotdeck_storage::{Database, NewOperator, StorageError};
use thiserror::Error;
use tracing::info;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no operator with email {0}")]
    UnknownOperator(String),

    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// Creates an operator account, or resets the password of an existing one.
///
/// Returns the operator id.
pub fn create_operator(
    db: &Database,
    email: &str,
    password: &str,
    display_name: Option<String>,
) -> Result<i64> {
    let password_hash = AuthManager::new().hash_password(password)?;

    if let Some(existing) = db.get_operator_by_email(email)? {
        db.set_operator_password(existing.id, &password_hash)?;
        info!("Reset password for operator {}", existing.email);
        return Ok(existing.id);
    }

    let id = db.create_operator(NewOperator {
        email: email.to_string(),
        password_hash,
        display_name,
    })?;
    info!("Created operator {} (id {})", email, id);
    Ok(id)
}

/// Imports lots from a JSON file for the operator with `operator_email`.
///
/// The file holds an array of lot records. Nothing is imported if any
/// record fails.
pub fn import_lots(db: &Database, path: &Path, operator_email: &str) -> Result<Vec<i64>> {
    let operator = db
        .get_operator_by_email(operator_email)?
        .ok_or_else(|| CommandError::UnknownOperator(operator_email.to_string()))?;

    let file = File::open(path).map_err(|source| CommandError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;

    let ids = db.import_lots_json(BufReader::new(file), operator.id)?;
    Ok(ids)
}
