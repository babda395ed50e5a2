use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_sessions;
use crate::session::{SESSION_COOKIE, SessionUser};

/// Resolve the session cookie, if any, to its user.
pub async fn session_user(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<SessionUser>, ApiError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let session_id = cookie.value().to_string();
    run_sessions(state, move |sessions| sessions.get(&session_id)).await
}

/// Reject requests without a live session (401). The session's user is
/// inserted as a request extension for downstream handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = session_user(&state, &jar).await?.ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Reject authenticated sessions that are not admin (403). Must run after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<SessionUser>()
        .ok_or(ApiError::Unauthorized)?;

    if !user.is_admin {
        return Err(ApiError::Forbidden("Admin access required".into()));
    }
    Ok(next.run(req).await)
}
