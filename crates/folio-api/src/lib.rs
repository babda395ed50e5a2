pub mod auth;
pub mod config;
pub mod contact;
pub mod content;
pub mod conversation;
pub mod error;
pub mod middleware;
pub mod projects;
pub mod session;
pub mod validation;

use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
};
use serde_json::{Value, json};

use folio_db::Database;

pub use auth::{AppState, AppStateInner};
pub use config::ApiConfig;
pub use conversation::ReplyPolicy;
pub use error::ApiError;
pub use session::{DbSessionStore, MemorySessionStore, SessionStore, SessionUser};

/// Run a synchronous database call on the blocking pool.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    let result = tokio::task::spawn_blocking(move || f(&db)).await??;
    Ok(result)
}

/// Run a session store call on the blocking pool. The database-backed store
/// shares the connection mutex with `run_db` work.
pub(crate) async fn run_sessions<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn SessionStore) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let sessions = state.sessions.clone();
    let result = tokio::task::spawn_blocking(move || f(sessions.as_ref())).await??;
    Ok(result)
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// All API routes with their auth layers applied. Transport layers (tracing,
/// static files) are added by the binary.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/projects", get(projects::list_published))
        .route("/api/projects/{id}", get(projects::get_project))
        .route("/api/projects/{id}/images", get(projects::list_images))
        .route("/api/about", get(content::get_about))
        .route("/api/site-settings", get(content::get_site_settings))
        .route("/api/contact", post(contact::submit_contact))
        .route("/api/conversation/{token}", get(conversation::get_conversation))
        .route("/api/conversation/{token}/reply", post(conversation::reply_to_conversation))
        .route("/api/login", post(auth::login))
        .route("/api/logout", get(auth::logout))
        .route("/health", get(health));

    let session_routes = Router::new()
        .route("/api/auth/user", get(auth::current_user))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    // route_layer keeps unmatched paths out of the auth checks. require_admin is
    // innermost, so require_auth has already attached the user.
    let admin_routes = Router::new()
        .route("/api/admin/projects", get(projects::list_all))
        .route("/api/projects", post(projects::create_project))
        .route("/api/projects/reorder", patch(projects::reorder_projects))
        .route(
            "/api/projects/{id}",
            patch(projects::update_project).delete(projects::delete_project),
        )
        .route("/api/projects/{id}/images", post(projects::add_image))
        .route(
            "/api/project-images/{id}",
            patch(projects::update_image_order).delete(projects::delete_image),
        )
        .route("/api/about", put(content::upsert_about))
        .route("/api/site-settings", put(content::upsert_site_settings))
        .route("/api/admin/messages", get(contact::list_messages))
        .route("/api/admin/messages/{id}/read", patch(contact::mark_read))
        .route("/api/admin/messages/{id}/reply", post(contact::reply_to_message))
        .route("/api/admin/messages/{id}", axum::routing::delete(contact::delete_message))
        .route_layer(from_fn(middleware::require_admin))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .with_state(state)
}
