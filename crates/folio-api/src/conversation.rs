use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info};

use folio_db::{ThreadState, VisitorReplyOutcome};
use folio_types::api::{ConversationView, VisitorReplyRequest, VisitorReplyResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;
use crate::validation::Validator;

pub const MAX_VISITOR_REPLY_CHARS: usize = 2000;

const NOT_FOUND: &str = "Conversation not found";

/// Why a visitor may not reply right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReplyBlock {
    #[error("Awaiting a reply from the site owner")]
    AwaitingAdminReply,

    #[error("Reply limit reached for this conversation")]
    LimitReached,

    #[error("Please wait before sending another reply")]
    CoolingDown,
}

/// Quota and cooldown for visitor replies. Visitors can only reply once the
/// admin has answered at least once.
#[derive(Debug, Clone, Copy)]
pub struct ReplyPolicy {
    pub max_visitor_replies: u32,
    pub cooldown: Duration,
}

impl Default for ReplyPolicy {
    fn default() -> Self {
        Self {
            max_visitor_replies: 5,
            cooldown: Duration::seconds(60),
        }
    }
}

impl ReplyPolicy {
    pub fn check(&self, thread: &ThreadState, now: DateTime<Utc>) -> Result<(), ReplyBlock> {
        if !thread.has_admin_reply {
            return Err(ReplyBlock::AwaitingAdminReply);
        }
        if thread.user_reply_count >= self.max_visitor_replies {
            return Err(ReplyBlock::LimitReached);
        }
        if let Some(last) = thread.last_user_reply_at {
            if now - last < self.cooldown {
                return Err(ReplyBlock::CoolingDown);
            }
        }
        Ok(())
    }
}

/// GET /api/conversation/{token}
///
/// Unknown and malformed tokens get the same 404; nothing about the token is
/// checked before the lookup.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let message = run_db(&state, move |db| db.get_contact_message_by_token(&token))
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    let decision = state
        .config
        .reply_policy
        .check(&ThreadState::from(&message), Utc::now());

    Ok(Json(ConversationView {
        name: message.name,
        subject: message.subject,
        original_message: message.message,
        has_reply: message.has_reply,
        admin_reply: message.reply,
        replied_at: message.replied_at,
        created_at: message.created_at,
        replies: message.replies,
        can_reply: decision.is_ok(),
        reply_blocked_reason: decision.err().map(|block| block.to_string()),
    }))
}

/// POST /api/conversation/{token}/reply
pub async fn reply_to_conversation(
    State(state): State<AppState>,
    Path(token): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<VisitorReplyRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.message.trim().to_string();
    Validator::new()
        .required("message", &content, MAX_VISITOR_REPLY_CHARS)
        .finish()?;

    let policy = state.config.reply_policy;
    let now = Utc::now();
    let outcome = run_db(&state, move |db| {
        db.add_visitor_reply(&token, &content, now, |thread| policy.check(thread, now))
    })
    .await?;

    match outcome {
        VisitorReplyOutcome::Added(reply) => {
            info!("Visitor replied on message {}", reply.message_id);
            Ok(Json(VisitorReplyResponse {
                success: true,
                reply,
            }))
        }
        VisitorReplyOutcome::Blocked(block) => {
            debug!("Visitor reply refused: {:?}", block);
            Err(ApiError::Forbidden(block.to_string()))
        }
        VisitorReplyOutcome::NotFound => Err(ApiError::NotFound(NOT_FOUND)),
    }
}
