use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Conversations --

/// Who wrote an entry in a conversation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorType {
    User,
    Admin,
}

impl AuthorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for AuthorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown author type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReply {
    pub id: String,
    pub message_id: String,
    pub author_type: AuthorType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A contact-form submission together with its thread, as the admin sees it.
///
/// `reply`/`replied_at` mirror the latest admin entry in `replies`; they are
/// derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
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
    pub has_reply: bool,
    pub reply: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub replies: Vec<ConversationReply>,
}

impl ContactMessage {
    /// Latest admin entry in the thread, if any.
    pub fn latest_admin_reply(replies: &[ConversationReply]) -> Option<&ConversationReply> {
        replies
            .iter()
            .rev()
            .find(|r| r.author_type == AuthorType::Admin)
    }
}

// -- Portfolio content --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub external_url: Option<String>,
    pub github_url: Option<String>,
    pub technologies: Vec<String>,
    pub role: Option<String>,
    pub year: Option<i32>,
    pub featured: bool,
    pub published: bool,
    pub sort_order: i32,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectImage {
    pub id: String,
    pub project_id: String,
    pub image_url: String,
    pub caption: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct About {
    pub id: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub resume_url: Option<String>,
    pub skills: Vec<String>,
    pub social_links: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub id: String,
    pub greeting_name: String,
    pub greeting_prefix: String,
    pub hero_title: String,
    pub hero_highlight: String,
    pub hero_description: Option<String>,
    pub works_title: String,
    pub works_subtitle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_type_wire_format() {
        assert_eq!(serde_json::to_string(&AuthorType::Admin).unwrap(), "\"admin\"");
        assert_eq!("user".parse::<AuthorType>().unwrap(), AuthorType::User);
        assert!("visitor".parse::<AuthorType>().is_err());
    }

    #[test]
    fn latest_admin_reply_skips_user_entries() {
        let at = Utc::now();
        let entry = |id: &str, author_type| ConversationReply {
            id: id.into(),
            message_id: "m".into(),
            author_type,
            content: id.into(),
            created_at: at,
        };
        let replies = vec![
            entry("a1", AuthorType::Admin),
            entry("u1", AuthorType::User),
            entry("a2", AuthorType::Admin),
            entry("u2", AuthorType::User),
        ];
        let latest = ContactMessage::latest_admin_reply(&replies).unwrap();
        assert_eq!(latest.id, "a2");
        assert!(ContactMessage::latest_admin_reply(&replies[1..2]).is_none());
    }
}
