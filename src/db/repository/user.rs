use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_datetime, get_datetime, get_enum, get_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str = "id, email, credential_hash, role, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: get_uuid(row, 0)?,
        email: row.get(1)?,
        credential_hash: row.get(2)?,
        role: get_enum(row, 3)?,
        created_at: get_datetime(row, 4)?,
    })
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, email, credential_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.id.to_string(),
            user.email,
            user.credential_hash,
            user.role.as_str(),
            format_datetime(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], user_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    conn.query_row(&sql, params![email], user_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn count_users(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}
