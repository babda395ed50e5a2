use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, CookieJar, SameSite},
};
use tracing::{info, warn};

use folio_crypto::password::verify_password;
use folio_db::Database;
use folio_types::api::{CurrentUserResponse, LoginFailure, LoginRequest, LoginResponse, LoginUser};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::{run_db, run_sessions};
use crate::session::{SESSION_COOKIE, SessionStore, SessionUser};

/// Id of the single administrative user row.
pub const ADMIN_USER_ID: &str = "admin";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub sessions: Arc<dyn SessionStore>,
    pub config: ApiConfig,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, sessions: Arc<dyn SessionStore>, config: ApiConfig) -> AppState {
        Arc::new(Self {
            db,
            sessions,
            config,
        })
    }
}

fn session_cookie(session_id: String, config: &ApiConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(config.secure_cookies)
        .max_age(time::Duration::seconds(config.session_ttl.num_seconds()))
        .build()
}

/// POST /api/login: check the admin credentials and start a session.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let username_ok = req.username == state.config.admin_username;

    // Verify even when the username is wrong so response time does not leak it.
    let hash = state.config.admin_password_hash.clone();
    let password_ok =
        tokio::task::spawn_blocking(move || verify_password(&req.password, &hash)).await?;

    if !(username_ok && password_ok) {
        warn!("Rejected admin login attempt");
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(LoginFailure {
                success: false,
                message: "Invalid username or password".into(),
            }),
        )
            .into_response());
    }

    let username = state.config.admin_username.clone();
    let admin = run_db(&state, move |db| db.upsert_user(ADMIN_USER_ID, &username, true)).await?;

    let user = SessionUser {
        id: admin.id,
        username: admin.username,
        is_admin: admin.is_admin,
    };
    let ttl = state.config.session_ttl;
    let session_user = user.clone();
    let session_id = run_sessions(&state, move |sessions| sessions.create(&session_user, ttl)).await?;
    let jar = jar.add(session_cookie(session_id, &state.config));

    info!("Admin '{}' logged in", user.username);

    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            user: LoginUser {
                username: user.username,
                is_admin: user.is_admin,
            },
        }),
    )
        .into_response())
}

/// GET /api/logout: drop the server-side session and the cookie, back to the site root.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let session_id = cookie.value().to_string();
        run_sessions(&state, move |sessions| sessions.destroy(&session_id)).await?;
        info!("Session ended");
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Redirect::to("/")).into_response())
}

/// GET /api/auth/user: who the current session belongs to.
pub async fn current_user(Extension(user): Extension<SessionUser>) -> impl IntoResponse {
    Json(CurrentUserResponse {
        id: user.id,
        username: user.username,
        is_admin: user.is_admin,
    })
}
