use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;
use tracing::info;

use folio_types::api::{UpsertAboutRequest, UpsertSiteSettingsRequest};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;
use crate::validation::Validator;

/// GET /api/about: the about singleton, or `null` before it is first saved.
pub async fn get_about(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let about = run_db(&state, |db| db.get_about()).await?;
    Ok(Json(about))
}

/// PUT /api/about
pub async fn upsert_about(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<UpsertAboutRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    Validator::new()
        .max_len("title", req.title.as_deref(), 255)
        .max_len("subtitle", req.subtitle.as_deref(), 500)
        .finish()?;

    if let Some(links) = &req.social_links {
        if !links.is_object() {
            return Err(ApiError::invalid("socialLinks", "socialLinks must be an object"));
        }
    }

    let about = run_db(&state, move |db| db.upsert_about(&req)).await?;
    info!("About content updated");
    Ok(Json(about))
}

/// GET /api/site-settings
pub async fn get_site_settings(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let settings = run_db(&state, |db| db.get_site_settings()).await?;
    Ok(Json(settings))
}

/// PUT /api/site-settings
pub async fn upsert_site_settings(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<UpsertSiteSettingsRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    Validator::new()
        .max_len("greetingName", req.greeting_name.as_deref(), 100)
        .max_len("greetingPrefix", req.greeting_prefix.as_deref(), 100)
        .max_len("heroTitle", req.hero_title.as_deref(), 255)
        .max_len("heroHighlight", req.hero_highlight.as_deref(), 255)
        .max_len("worksTitle", req.works_title.as_deref(), 255)
        .finish()?;

    let settings = run_db(&state, move |db| db.upsert_site_settings(&req)).await?;
    info!("Site settings updated");
    Ok(Json(settings))
}
