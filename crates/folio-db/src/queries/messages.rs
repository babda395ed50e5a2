use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params, params_from_iter};
use tracing::warn;
use uuid::Uuid;

use folio_crypto::tokens::generate_conversation_token;
use folio_types::models::{AuthorType, ContactMessage, ConversationReply};

use super::placeholders;
use crate::Database;
use crate::models::{
    MESSAGE_COLUMNS, MessageRow, REPLY_COLUMNS, ThreadState, VisitorReplyOutcome, reply_from_row,
};

/// A freshly minted token colliding with an existing one is a 2^-256 event;
/// a handful of attempts is plenty.
const TOKEN_ATTEMPTS: u32 = 3;

impl From<&ContactMessage> for ThreadState {
    fn from(message: &ContactMessage) -> Self {
        Self {
            message_id: message.id.clone(),
            has_admin_reply: message.has_reply,
            user_reply_count: message.user_reply_count,
            last_user_reply_at: message.last_user_reply_at,
        }
    }
}

impl Database {
    // -- Intake --

    /// Insert a new contact message with a freshly issued conversation token.
    pub fn create_contact_message(
        &self,
        name: &str,
        email: &str,
        subject: Option<&str>,
        message: &str,
    ) -> Result<ContactMessage> {
        self.with_conn(|conn| {
            let created_at = Utc::now();

            for attempt in 1..=TOKEN_ATTEMPTS {
                let id = Uuid::new_v4().to_string();
                let token = generate_conversation_token();

                let inserted = conn.execute(
                    "INSERT INTO contact_messages (id, name, email, subject, message, conversation_token, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![id, name, email, subject, message, token, created_at],
                );

                match inserted {
                    Ok(_) => {
                        let row = MessageRow {
                            id,
                            name: name.to_string(),
                            email: email.to_string(),
                            subject: subject.map(str::to_string),
                            message: message.to_string(),
                            is_read: false,
                            conversation_token: token,
                            user_reply_count: 0,
                            last_user_reply_at: None,
                            created_at,
                        };
                        return Ok(row.into_message(vec![]));
                    }
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.code == ErrorCode::ConstraintViolation && attempt < TOKEN_ATTEMPTS =>
                    {
                        warn!("Conversation token collision on attempt {}, reissuing", attempt);
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            Err(anyhow!("Could not issue a unique conversation token"))
        })
    }

    // -- Reads --

    /// All messages, newest first, each with its ordered thread.
    pub fn list_contact_messages(&self) -> Result<Vec<ContactMessage>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM contact_messages ORDER BY created_at DESC, rowid DESC",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], MessageRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            attach_replies(conn, rows)
        })
    }

    pub fn get_contact_message(&self, id: &str) -> Result<Option<ContactMessage>> {
        self.with_conn(|conn| query_message(conn, "id", id))
    }

    pub fn get_contact_message_by_token(&self, token: &str) -> Result<Option<ContactMessage>> {
        self.with_conn(|conn| query_message(conn, "conversation_token", token))
    }

    // -- Admin mutations --

    pub fn mark_message_read(&self, id: &str) -> Result<Option<ContactMessage>> {
        self.with_conn(|conn| {
            let updated = conn.execute("UPDATE contact_messages SET is_read = 1 WHERE id = ?1", [id])?;
            if updated == 0 {
                return Ok(None);
            }
            query_message(conn, "id", id)
        })
    }

    /// Append an admin entry to the thread and mark the message read, atomically.
    pub fn add_admin_reply(&self, id: &str, content: &str) -> Result<Option<ContactMessage>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute("UPDATE contact_messages SET is_read = 1 WHERE id = ?1", [id])?;
            if updated == 0 {
                return Ok(None);
            }
            insert_reply(&tx, id, AuthorType::Admin, content, Utc::now())?;
            tx.commit()?;

            query_message(conn, "id", id)
        })
    }

    /// Delete a message. Its thread goes with it (ON DELETE CASCADE).
    pub fn delete_contact_message(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM contact_messages WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Visitor replies --

    /// Append a visitor entry to the thread owned by `token`.
    ///
    /// `check` runs against the current thread state inside the write
    /// transaction; if it refuses, nothing is written and its value is
    /// returned as `Blocked`. On success the reply is inserted and the
    /// visitor counters are bumped together.
    pub fn add_visitor_reply<B, F>(
        &self,
        token: &str,
        content: &str,
        now: DateTime<Utc>,
        check: F,
    ) -> Result<VisitorReplyOutcome<B>>
    where
        F: FnOnce(&ThreadState) -> std::result::Result<(), B>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(state) = query_thread_state(&tx, token)? else {
                return Ok(VisitorReplyOutcome::NotFound);
            };
            if let Err(blocked) = check(&state) {
                return Ok(VisitorReplyOutcome::Blocked(blocked));
            }

            let reply = insert_reply(&tx, &state.message_id, AuthorType::User, content, now)?;
            tx.execute(
                "UPDATE contact_messages
                 SET user_reply_count = user_reply_count + 1, last_user_reply_at = ?1
                 WHERE id = ?2",
                params![now, state.message_id],
            )?;
            tx.commit()?;

            Ok(VisitorReplyOutcome::Added(reply))
        })
    }
}

fn query_message(conn: &Connection, column: &str, value: &str) -> Result<Option<ContactMessage>> {
    let sql = format!(
        "SELECT {} FROM contact_messages WHERE {} = ?1",
        MESSAGE_COLUMNS, column
    );
    let row = conn
        .query_row(&sql, [value], MessageRow::from_row)
        .optional()?;

    match row {
        Some(row) => Ok(attach_replies(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

fn query_thread_state(conn: &Connection, token: &str) -> Result<Option<ThreadState>> {
    let state = conn
        .query_row(
            "SELECT m.id, m.user_reply_count, m.last_user_reply_at,
                    EXISTS (SELECT 1 FROM conversation_replies r
                            WHERE r.message_id = m.id AND r.author_type = 'admin')
             FROM contact_messages m
             WHERE m.conversation_token = ?1",
            [token],
            |row| {
                Ok(ThreadState {
                    message_id: row.get(0)?,
                    user_reply_count: row.get(1)?,
                    last_user_reply_at: row.get(2)?,
                    has_admin_reply: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(state)
}

fn insert_reply(
    conn: &Connection,
    message_id: &str,
    author_type: AuthorType,
    content: &str,
    created_at: DateTime<Utc>,
) -> Result<ConversationReply> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO conversation_replies (id, message_id, author_type, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, message_id, author_type.as_str(), content, created_at],
    )?;

    Ok(ConversationReply {
        id,
        message_id: message_id.to_string(),
        author_type,
        content: content.to_string(),
        created_at,
    })
}

/// Batch-fetch the threads for a set of messages (one query, not one per message).
fn attach_replies(conn: &Connection, rows: Vec<MessageRow>) -> Result<Vec<ContactMessage>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let sql = format!(
        "SELECT {} FROM conversation_replies WHERE message_id IN ({})
         ORDER BY created_at ASC, rowid ASC",
        REPLY_COLUMNS,
        placeholders(ids.len())
    );

    let mut stmt = conn.prepare(&sql)?;
    let replies = stmt
        .query_map(params_from_iter(ids.iter()), reply_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut threads: HashMap<String, Vec<ConversationReply>> = HashMap::new();
    for reply in replies {
        threads.entry(reply.message_id.clone()).or_default().push(reply);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let replies = threads.remove(&row.id).unwrap_or_default();
            row.into_message(replies)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn submit(db: &Database, name: &str) -> ContactMessage {
        db.create_contact_message(name, "a@x.com", None, "hello").unwrap()
    }

    fn allow(_: &ThreadState) -> std::result::Result<(), &'static str> {
        Ok(())
    }

    #[test]
    fn new_message_starts_unread_without_reply() {
        let db = db();
        let msg = submit(&db, "A");

        assert!(!msg.is_read);
        assert!(!msg.has_reply);
        assert!(msg.reply.is_none() && msg.replied_at.is_none());
        assert_eq!(msg.user_reply_count, 0);
        assert_eq!(msg.conversation_token.len(), 64);

        let stored = db.get_contact_message(&msg.id).unwrap().unwrap();
        assert_eq!(stored.conversation_token, msg.conversation_token);
        assert_eq!(stored.message, "hello");
    }

    #[test]
    fn tokens_are_unique_across_messages() {
        let db = db();
        let tokens: HashSet<String> = (0..50)
            .map(|i| submit(&db, &format!("sender {}", i)).conversation_token)
            .collect();
        assert_eq!(tokens.len(), 50);
    }

    #[test]
    fn admin_reply_sets_reply_and_read() {
        let db = db();
        let msg = submit(&db, "A");

        let updated = db.add_admin_reply(&msg.id, "hi").unwrap().unwrap();
        assert!(updated.is_read);
        assert!(updated.has_reply);
        assert_eq!(updated.reply.as_deref(), Some("hi"));
        assert!(updated.replied_at.is_some());
        assert_eq!(updated.replies.len(), 1);
        assert_eq!(updated.replies[0].author_type, AuthorType::Admin);

        assert!(db.add_admin_reply("missing", "hi").unwrap().is_none());
    }

    #[test]
    fn reply_fields_track_latest_admin_entry() {
        let db = db();
        let msg = submit(&db, "A");
        db.add_admin_reply(&msg.id, "first").unwrap();
        db.add_visitor_reply(&msg.conversation_token, "thanks", Utc::now(), allow)
            .unwrap();
        let updated = db.add_admin_reply(&msg.id, "second").unwrap().unwrap();

        assert_eq!(updated.reply.as_deref(), Some("second"));
        let authors: Vec<AuthorType> = updated.replies.iter().map(|r| r.author_type).collect();
        assert_eq!(authors, vec![AuthorType::Admin, AuthorType::User, AuthorType::Admin]);
    }

    #[test]
    fn visitor_reply_bumps_counters() {
        let db = db();
        let msg = submit(&db, "A");
        db.add_admin_reply(&msg.id, "hi").unwrap();

        let now = Utc::now();
        let outcome = db
            .add_visitor_reply(&msg.conversation_token, "thanks", now, allow)
            .unwrap();
        let VisitorReplyOutcome::Added(reply) = outcome else {
            panic!("expected reply to be added");
        };
        assert_eq!(reply.author_type, AuthorType::User);

        let stored = db.get_contact_message(&msg.id).unwrap().unwrap();
        assert_eq!(stored.user_reply_count, 1);
        assert!(stored.last_user_reply_at.is_some());
        assert_eq!(stored.replies.len(), 2);
    }

    #[test]
    fn blocked_visitor_reply_writes_nothing() {
        let db = db();
        let msg = submit(&db, "A");

        let outcome = db
            .add_visitor_reply(&msg.conversation_token, "anyone?", Utc::now(), |state| {
                assert!(!state.has_admin_reply);
                Err("awaiting")
            })
            .unwrap();
        assert!(matches!(outcome, VisitorReplyOutcome::Blocked("awaiting")));

        let stored = db.get_contact_message(&msg.id).unwrap().unwrap();
        assert_eq!(stored.user_reply_count, 0);
        assert!(stored.last_user_reply_at.is_none());
        assert!(stored.replies.is_empty());
    }

    #[test]
    fn unknown_token_is_not_found() {
        let db = db();
        submit(&db, "A");

        let outcome = db
            .add_visitor_reply("no-such-token", "hello", Utc::now(), allow)
            .unwrap();
        assert!(matches!(outcome, VisitorReplyOutcome::NotFound));
        assert!(db.get_contact_message_by_token("no-such-token").unwrap().is_none());
    }

    #[test]
    fn thread_state_reflects_counters() {
        let db = db();
        let msg = submit(&db, "A");
        db.add_admin_reply(&msg.id, "hi").unwrap();
        let earlier = Utc::now() - Duration::minutes(5);
        db.add_visitor_reply(&msg.conversation_token, "one", earlier, allow)
            .unwrap();

        let mut seen = None;
        db.add_visitor_reply(&msg.conversation_token, "two", Utc::now(), |state| {
            seen = Some(state.clone());
            Err(())
        })
        .unwrap();

        let state = seen.unwrap();
        assert!(state.has_admin_reply);
        assert_eq!(state.user_reply_count, 1);
        let stored_at = state.last_user_reply_at.unwrap();
        assert!((stored_at - earlier).num_milliseconds().abs() < 1);
    }

    #[test]
    fn delete_cascades_to_replies() {
        let db = db();
        let msg = submit(&db, "A");
        db.add_admin_reply(&msg.id, "hi").unwrap();
        db.add_visitor_reply(&msg.conversation_token, "thanks", Utc::now(), allow)
            .unwrap();

        assert!(db.delete_contact_message(&msg.id).unwrap());
        assert!(!db.delete_contact_message(&msg.id).unwrap());

        let orphans: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM conversation_replies WHERE message_id = ?1",
                    [&msg.id],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn list_is_newest_first_with_threads() {
        let db = db();
        let first = submit(&db, "first");
        let second = submit(&db, "second");
        db.add_admin_reply(&first.id, "hi").unwrap();

        let all = db.list_contact_messages().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert!(all[0].replies.is_empty());
        assert_eq!(all[1].id, first.id);
        assert_eq!(all[1].replies.len(), 1);
    }

    #[test]
    fn mark_read() {
        let db = db();
        let msg = submit(&db, "A");
        assert!(db.mark_message_read(&msg.id).unwrap().unwrap().is_read);
        assert!(db.mark_message_read("missing").unwrap().is_none());
    }
}
