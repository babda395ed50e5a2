use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::ConversationReply;

/// Distinguishes "field absent" (`None`) from "field set to null" (`Some(None)`)
/// in partial updates.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub username: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: LoginUser,
}

#[derive(Debug, Serialize)]
pub struct LoginFailure {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
}

// -- Contact & conversations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactResponse {
    pub success: bool,
    pub id: String,
    pub conversation_token: String,
    pub conversation_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminReplyRequest {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VisitorReplyRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct VisitorReplyResponse {
    pub success: bool,
    pub reply: ConversationReply,
}

/// What an anonymous visitor holding a conversation token may see.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub name: String,
    pub subject: Option<String>,
    pub original_message: String,
    pub has_reply: bool,
    pub admin_reply: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub replies: Vec<ConversationReply>,
    pub can_reply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_blocked_reason: Option<String>,
}

// -- Projects --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub external_url: Option<String>,
    pub github_url: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub role: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_true")]
    pub published: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_true() -> bool {
    true
}

/// Partial project update. Absent fields are left alone; `null` clears nullable fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub short_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub external_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub github_url: Option<Option<String>>,
    pub technologies: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub role: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub year: Option<Option<i32>>,
    pub featured: Option<bool>,
    pub published: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOrder {
    pub id: String,
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderProjectsRequest {
    pub project_orders: Vec<ProjectOrder>,
}

#[derive(Debug, Serialize)]
pub struct ReorderProjectsResponse {
    pub success: bool,
    pub updated: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProjectImageRequest {
    pub image_url: String,
    pub caption: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateImageOrderRequest {
    pub sort_order: i32,
}

// -- About & site settings --

/// Upsert body for the about singleton. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAboutRequest {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub resume_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub social_links: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSiteSettingsRequest {
    pub greeting_name: Option<String>,
    pub greeting_prefix: Option<String>,
    pub hero_title: Option<String>,
    pub hero_highlight: Option<String>,
    pub hero_description: Option<String>,
    pub works_title: Option<String>,
    pub works_subtitle: Option<String>,
}
