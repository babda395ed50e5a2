use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use folio_types::api::{AdminReplyRequest, CreateContactRequest, CreateContactResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;
use crate::validation::{Validator, trimmed_opt};

const MAX_NAME_CHARS: usize = 255;
const MAX_EMAIL_CHARS: usize = 255;
const MAX_SUBJECT_CHARS: usize = 500;
const MAX_MESSAGE_CHARS: usize = 5000;

const NOT_FOUND: &str = "Message not found";

/// POST /api/contact: public form submission. The conversation token is
/// handed back so the sender can bookmark their thread.
pub async fn submit_contact(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateContactRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();
    let subject = trimmed_opt(req.subject);
    let body = req.message.trim().to_string();

    Validator::new()
        .required("name", &name, MAX_NAME_CHARS)
        .email("email", &email, MAX_EMAIL_CHARS)
        .max_len("subject", subject.as_deref(), MAX_SUBJECT_CHARS)
        .required("message", &body, MAX_MESSAGE_CHARS)
        .finish()?;

    let message = run_db(&state, move |db| {
        db.create_contact_message(&name, &email, subject.as_deref(), &body)
    })
    .await?;

    info!("Contact message {} received", message.id);

    let token = message.conversation_token;
    Ok((
        StatusCode::CREATED,
        Json(CreateContactResponse {
            success: true,
            id: message.id,
            conversation_url: format!("/conversation/{}", token),
            conversation_token: token,
        }),
    ))
}

/// GET /api/admin/messages: every message with its thread, newest first.
pub async fn list_messages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let messages = run_db(&state, |db| db.list_contact_messages()).await?;
    Ok(Json(messages))
}

/// PATCH /api/admin/messages/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let message = run_db(&state, move |db| db.mark_message_read(&id))
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    Ok(Json(message))
}

/// POST /api/admin/messages/{id}/reply: append an admin entry and mark read.
pub async fn reply_to_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<AdminReplyRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let reply = req.reply.trim().to_string();
    Validator::new()
        .required("reply", &reply, MAX_MESSAGE_CHARS)
        .finish()?;

    let message = run_db(&state, move |db| db.add_admin_reply(&id, &reply))
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    info!("Admin replied to message {}", message.id);
    Ok(Json(message))
}

/// DELETE /api/admin/messages/{id}: the thread is removed with it.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = id.clone();
    if !run_db(&state, move |db| db.delete_contact_message(&target)).await? {
        return Err(ApiError::NotFound(NOT_FOUND));
    }

    info!("Deleted message {}", id);
    Ok(StatusCode::NO_CONTENT)
}
