/// Database row types and query outcomes. Rows that map one-to-one onto an
/// API model are returned as `folio_types::models` directly; the types here
/// cover rows that need assembling first.
use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use folio_types::models::{AuthorType, ContactMessage, ConversationReply};

pub struct MessageRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub conversation_token: String,
    pub user_reply_count: u32,
    pub last_user_reply_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub(crate) const MESSAGE_COLUMNS: &str = "id, name, email, subject, message, is_read, \
     conversation_token, user_reply_count, last_user_reply_at, created_at";

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            subject: row.get(3)?,
            message: row.get(4)?,
            is_read: row.get(5)?,
            conversation_token: row.get(6)?,
            user_reply_count: row.get(7)?,
            last_user_reply_at: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    /// Attach the thread. `replies` must already be in display order.
    pub fn into_message(self, replies: Vec<ConversationReply>) -> ContactMessage {
        let latest_admin = ContactMessage::latest_admin_reply(&replies);
        let reply = latest_admin.map(|r| r.content.clone());
        let replied_at = latest_admin.map(|r| r.created_at);

        ContactMessage {
            id: self.id,
            name: self.name,
            email: self.email,
            subject: self.subject,
            message: self.message,
            is_read: self.is_read,
            conversation_token: self.conversation_token,
            user_reply_count: self.user_reply_count,
            last_user_reply_at: self.last_user_reply_at,
            created_at: self.created_at,
            has_reply: reply.is_some(),
            reply,
            replied_at,
            replies,
        }
    }
}

pub(crate) const REPLY_COLUMNS: &str = "id, message_id, author_type, content, created_at";

pub(crate) fn reply_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationReply> {
    let author_type: String = row.get(2)?;
    let author_type = author_type
        .parse::<AuthorType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;

    Ok(ConversationReply {
        id: row.get(0)?,
        message_id: row.get(1)?,
        author_type,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// The parts of a conversation the reply policy looks at.
#[derive(Debug, Clone)]
pub struct ThreadState {
    pub message_id: String,
    pub has_admin_reply: bool,
    pub user_reply_count: u32,
    pub last_user_reply_at: Option<DateTime<Utc>>,
}

/// Result of a visitor reply attempt. `B` is whatever the caller's policy
/// check returns when it refuses the reply.
#[derive(Debug)]
pub enum VisitorReplyOutcome<B> {
    NotFound,
    Blocked(B),
    Added(ConversationReply),
}

/// JSON-in-TEXT columns (tag lists, social links).
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
