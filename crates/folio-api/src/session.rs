use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use folio_crypto::tokens::{generate_session_id, hash_session_id};
use folio_db::Database;

pub const SESSION_COOKIE: &str = "folio_session";

/// What a session remembers about its holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
}

/// Server-side session storage, keyed by the opaque id in the session cookie.
pub trait SessionStore: Send + Sync {
    /// Start a session and return its id.
    fn create(&self, user: &SessionUser, ttl: Duration) -> Result<String>;

    /// The session's user, if the id is known and not expired.
    fn get(&self, session_id: &str) -> Result<Option<SessionUser>>;

    fn destroy(&self, session_id: &str) -> Result<()>;
}

// -- In-memory --

/// Process-local sessions. Lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, (SessionUser, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, user: &SessionUser, ttl: Duration) -> Result<String> {
        let session_id = generate_session_id();
        let now = Utc::now();
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| anyhow!("Session lock poisoned: {}", e))?;

        sessions.retain(|_, (_, expire)| *expire > now);
        sessions.insert(session_id.clone(), (user.clone(), now + ttl));
        Ok(session_id)
    }

    fn get(&self, session_id: &str) -> Result<Option<SessionUser>> {
        let now = Utc::now();
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| anyhow!("Session lock poisoned: {}", e))?;

        let live = sessions
            .get(session_id)
            .filter(|(_, expire)| *expire > now)
            .map(|(user, _)| user.clone());
        if live.is_none() {
            sessions.remove(session_id);
        }
        Ok(live)
    }

    fn destroy(&self, session_id: &str) -> Result<()> {
        self.sessions
            .lock()
            .map_err(|e| anyhow!("Session lock poisoned: {}", e))?
            .remove(session_id);
        Ok(())
    }
}

// -- Database-backed --

/// Sessions persisted in the `sessions` table, surviving restarts.
/// Only the SHA-256 of each session id is stored.
pub struct DbSessionStore {
    db: Arc<Database>,
}

impl DbSessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl SessionStore for DbSessionStore {
    fn create(&self, user: &SessionUser, ttl: Duration) -> Result<String> {
        let session_id = generate_session_id();
        let now = Utc::now();

        let pruned = self.db.prune_expired_sessions(now)?;
        if pruned > 0 {
            debug!("Pruned {} expired sessions", pruned);
        }

        let sess = serde_json::to_string(user)?;
        self.db
            .insert_session(&hash_session_id(&session_id), &sess, now + ttl)?;
        Ok(session_id)
    }

    fn get(&self, session_id: &str) -> Result<Option<SessionUser>> {
        let Some(sess) = self.db.get_session(&hash_session_id(session_id), Utc::now())? else {
            return Ok(None);
        };

        match serde_json::from_str(&sess) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!("Discarding unreadable session payload: {}", e);
                self.destroy(session_id)?;
                Ok(None)
            }
        }
    }

    fn destroy(&self, session_id: &str) -> Result<()> {
        self.db.delete_session(&hash_session_id(session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> SessionUser {
        SessionUser {
            id: "admin".into(),
            username: "owner".into(),
            is_admin: true,
        }
    }

    fn exercise(store: &dyn SessionStore) {
        let sid = store.create(&admin(), Duration::hours(1)).unwrap();
        assert_eq!(store.get(&sid).unwrap(), Some(admin()));
        assert_eq!(store.get("unknown").unwrap(), None);

        store.destroy(&sid).unwrap();
        assert_eq!(store.get(&sid).unwrap(), None);

        let expired = store.create(&admin(), Duration::seconds(-1)).unwrap();
        assert_eq!(store.get(&expired).unwrap(), None);
    }

    #[test]
    fn memory_store_lifecycle() {
        exercise(&MemorySessionStore::new());
    }

    #[test]
    fn db_store_lifecycle() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        exercise(&DbSessionStore::new(db));
    }

    #[test]
    fn db_store_never_persists_raw_ids() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = DbSessionStore::new(db.clone());
        let sid = store.create(&admin(), Duration::hours(1)).unwrap();

        assert!(db.get_session(&sid, Utc::now()).unwrap().is_none());
        assert!(db.get_session(&hash_session_id(&sid), Utc::now()).unwrap().is_some());
    }
}
