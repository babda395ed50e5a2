use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::Database;

/// Raw session persistence. The API layer owns the session format (`sess` is
/// opaque JSON here) and hashes session ids before they reach this table.
impl Database {
    pub fn insert_session(&self, sid_hash: &str, sess: &str, expire: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO sessions (sid_hash, sess, expire) VALUES (?1, ?2, ?3)",
                params![sid_hash, sess, expire],
            )?;
            Ok(())
        })
    }

    /// Session payload, if present and not expired at `now`.
    pub fn get_session(&self, sid_hash: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let sess = conn
                .query_row(
                    "SELECT sess FROM sessions WHERE sid_hash = ?1 AND expire > ?2",
                    params![sid_hash, now],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(sess)
        })
    }

    pub fn delete_session(&self, sid_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE sid_hash = ?1", [sid_hash])?;
            Ok(())
        })
    }

    pub fn prune_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE expire <= ?1", [now])?;
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expired_sessions_are_invisible_and_pruned() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.insert_session("live", "{}", now + Duration::hours(1)).unwrap();
        db.insert_session("stale", "{}", now - Duration::hours(1)).unwrap();

        assert_eq!(db.get_session("live", now).unwrap().as_deref(), Some("{}"));
        assert!(db.get_session("stale", now).unwrap().is_none());

        assert_eq!(db.prune_expired_sessions(now).unwrap(), 1);
        db.delete_session("live").unwrap();
        assert!(db.get_session("live", now).unwrap().is_none());
    }
}
