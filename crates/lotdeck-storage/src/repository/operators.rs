//! Operator account repository.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::parse_datetime;
use crate::error::{Result, StorageError};
use crate::models::{NewOperator, Operator};

const OPERATOR_COLUMNS: &str = "id, email, password_hash, display_name, created_at, last_login";

/// Repository for operator accounts.
pub struct OperatorRepo;

impl OperatorRepo {
    /// Insert an operator. Emails are stored lower-cased and must be unique.
    pub fn insert(conn: &Connection, operator: NewOperator) -> Result<i64> {
        let email = normalize_email(&operator.email);

        conn.execute(
            "INSERT INTO operators (email, password_hash, display_name) VALUES (?1, ?2, ?3)",
            params![email, operator.password_hash, operator.display_name],
        )
        .map_err(|e| StorageError::from_insert(e, format!("operator {email} already exists")))?;

        Ok(conn.last_insert_rowid())
    }

    /// Look up an operator by login email, ignoring case.
    pub fn get_by_email(conn: &Connection, email: &str) -> Result<Option<Operator>> {
        let sql = format!("SELECT {OPERATOR_COLUMNS} FROM operators WHERE email = ?1");
        let operator = conn
            .query_row(&sql, [normalize_email(email)], row_to_operator)
            .optional()?;
        Ok(operator)
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Operator>> {
        let sql = format!("SELECT {OPERATOR_COLUMNS} FROM operators WHERE id = ?1");
        let operator = conn.query_row(&sql, [id], row_to_operator).optional()?;
        Ok(operator)
    }

    /// Record a successful login.
    pub fn update_last_login(conn: &Connection, id: i64) -> Result<()> {
        let rows = conn.execute(
            "UPDATE operators SET last_login = datetime('now') WHERE id = ?1",
            [id],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(format!("operator {id}")));
        }
        Ok(())
    }

    /// Replace an operator's password hash.
    pub fn set_password(conn: &Connection, id: i64, password_hash: &str) -> Result<()> {
        let rows = conn.execute(
            "UPDATE operators SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, id],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(format!("operator {id}")));
        }
        Ok(())
    }

    pub fn count(conn: &Connection) -> Result<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM operators", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn row_to_operator(row: &Row<'_>) -> rusqlite::Result<Operator> {
    Ok(Operator {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        display_name: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        last_login: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_datetime(&s)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::run_migrations;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn new_operator(email: &str) -> NewOperator {
        NewOperator {
            email: email.to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
            display_name: Some("Lot Owner".to_string()),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup_db();
        let id = OperatorRepo::insert(&conn, new_operator("Owner@Example.com")).unwrap();

        let by_id = OperatorRepo::get_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(by_id.email, "owner@example.com");
        assert_eq!(by_id.display_name.as_deref(), Some("Lot Owner"));
        assert!(by_id.last_login.is_none());

        let by_email = OperatorRepo::get_by_email(&conn, " OWNER@example.com ")
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, id);
    }

    #[test]
    fn test_missing_operator() {
        let conn = setup_db();
        assert!(OperatorRepo::get_by_id(&conn, 99).unwrap().is_none());
        assert!(OperatorRepo::get_by_email(&conn, "nobody@example.com")
            .unwrap()
            .is_none());
        assert!(matches!(
            OperatorRepo::update_last_login(&conn, 99),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let conn = setup_db();
        OperatorRepo::insert(&conn, new_operator("owner@example.com")).unwrap();

        let err = OperatorRepo::insert(&conn, new_operator("OWNER@example.com")).unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert_eq!(OperatorRepo::count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_update_last_login_and_password() {
        let conn = setup_db();
        let id = OperatorRepo::insert(&conn, new_operator("owner@example.com")).unwrap();

        OperatorRepo::update_last_login(&conn, id).unwrap();
        OperatorRepo::set_password(&conn, id, "$argon2id$v=19$other").unwrap();

        let operator = OperatorRepo::get_by_id(&conn, id).unwrap().unwrap();
        assert!(operator.last_login.is_some());
        assert_eq!(operator.password_hash, "$argon2id$v=19$other");
    }
}
