use anyhow::{Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use folio_types::models::User;

use crate::Database;

impl Database {
    /// Insert or refresh a user row. `created_at` survives updates.
    pub fn upsert_user(&self, id: &str, username: &str, is_admin: bool) -> Result<User> {
        self.with_conn(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO users (id, username, is_admin, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    username = excluded.username,
                    is_admin = excluded.is_admin,
                    updated_at = excluded.updated_at",
                params![id, username, is_admin, now],
            )?;

            query_user(conn, id)?.ok_or_else(|| anyhow!("User vanished after upsert: {}", id))
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }
}

fn query_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, username, is_admin, created_at, updated_at FROM users WHERE id = ?1",
            [id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    is_admin: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()?;

    Ok(user)
}
