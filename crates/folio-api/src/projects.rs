use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::{WithRejection, cookie::CookieJar};
use tracing::info;

use folio_types::api::{
    AddProjectImageRequest, CreateProjectRequest, ReorderProjectsRequest, ReorderProjectsResponse,
    UpdateImageOrderRequest, UpdateProjectRequest,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::session_user;
use crate::run_db;
use crate::session::SessionUser;
use crate::validation::{Validator, trimmed_opt};

const MAX_TITLE_CHARS: usize = 255;
const MAX_SHORT_DESCRIPTION_CHARS: usize = 500;
const MAX_CATEGORY_CHARS: usize = 100;
const MAX_ROLE_CHARS: usize = 255;
const MAX_CAPTION_CHARS: usize = 500;

const PROJECT_NOT_FOUND: &str = "Project not found";
const IMAGE_NOT_FOUND: &str = "Image not found";

// -- Projects --

/// GET /api/projects: the public gallery.
pub async fn list_published(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let projects = run_db(&state, |db| db.list_projects(true)).await?;
    Ok(Json(projects))
}

/// GET /api/admin/projects: drafts included.
pub async fn list_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let projects = run_db(&state, |db| db.list_projects(false)).await?;
    Ok(Json(projects))
}

/// GET /api/projects/{id}: unpublished projects only exist for the admin.
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let project = run_db(&state, move |db| db.get_project(&id))
        .await?
        .ok_or(ApiError::NotFound(PROJECT_NOT_FOUND))?;

    if !project.published {
        let is_admin = session_user(&state, &jar).await?.is_some_and(|u| u.is_admin);
        if !is_admin {
            return Err(ApiError::NotFound(PROJECT_NOT_FOUND));
        }
    }
    Ok(Json(project))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Json(mut req), _): WithRejection<Json<CreateProjectRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    req.title = req.title.trim().to_string();
    req.short_description = trimmed_opt(req.short_description);
    req.category = trimmed_opt(req.category);
    req.role = trimmed_opt(req.role);

    Validator::new()
        .required("title", &req.title, MAX_TITLE_CHARS)
        .max_len("shortDescription", req.short_description.as_deref(), MAX_SHORT_DESCRIPTION_CHARS)
        .max_len("category", req.category.as_deref(), MAX_CATEGORY_CHARS)
        .max_len("role", req.role.as_deref(), MAX_ROLE_CHARS)
        .finish()?;

    let project = run_db(&state, move |db| db.create_project(&req, Some(user.id.as_str()))).await?;

    info!("Created project {} ({})", project.id, project.title);
    Ok((StatusCode::CREATED, Json(project)))
}

/// PATCH /api/projects/reorder: bulk sort-order update from drag-and-drop.
pub async fn reorder_projects(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<ReorderProjectsRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let requested = req.project_orders.len();
    let updated = run_db(&state, move |db| db.reorder_projects(&req.project_orders)).await?;

    info!("Reordered {} of {} projects", updated, requested);
    Ok(Json(ReorderProjectsResponse {
        success: true,
        updated,
    }))
}

/// PATCH /api/projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(mut patch), _): WithRejection<Json<UpdateProjectRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    patch.title = patch.title.map(|t| t.trim().to_string());
    // A provided blank value clears the field, matching create.
    patch.short_description = patch.short_description.map(trimmed_opt);
    patch.category = patch.category.map(trimmed_opt);
    patch.role = patch.role.map(trimmed_opt);

    let mut v = Validator::new();
    if let Some(title) = &patch.title {
        v.required("title", title, MAX_TITLE_CHARS);
    }
    if let Some(Some(short)) = &patch.short_description {
        v.max_len("shortDescription", Some(short), MAX_SHORT_DESCRIPTION_CHARS);
    }
    if let Some(Some(category)) = &patch.category {
        v.max_len("category", Some(category), MAX_CATEGORY_CHARS);
    }
    if let Some(Some(role)) = &patch.role {
        v.max_len("role", Some(role), MAX_ROLE_CHARS);
    }
    v.finish()?;

    let project = run_db(&state, move |db| db.update_project(&id, &patch))
        .await?
        .ok_or(ApiError::NotFound(PROJECT_NOT_FOUND))?;

    info!("Updated project {}", project.id);
    Ok(Json(project))
}

/// DELETE /api/projects/{id}: images cascade.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = id.clone();
    if !run_db(&state, move |db| db.delete_project(&target)).await? {
        return Err(ApiError::NotFound(PROJECT_NOT_FOUND));
    }

    info!("Deleted project {}", id);
    Ok(StatusCode::NO_CONTENT)
}

// -- Project images --

/// GET /api/projects/{id}/images
pub async fn list_images(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let images = run_db(&state, move |db| db.list_project_images(&project_id)).await?;
    Ok(Json(images))
}

/// POST /api/projects/{id}/images
pub async fn add_image(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    WithRejection(Json(mut req), _): WithRejection<Json<AddProjectImageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    req.image_url = req.image_url.trim().to_string();
    req.caption = trimmed_opt(req.caption);

    Validator::new()
        .required("imageUrl", &req.image_url, usize::MAX)
        .max_len("caption", req.caption.as_deref(), MAX_CAPTION_CHARS)
        .finish()?;

    let image = run_db(&state, move |db| db.add_project_image(&project_id, &req))
        .await?
        .ok_or(ApiError::NotFound(PROJECT_NOT_FOUND))?;

    Ok((StatusCode::CREATED, Json(image)))
}

/// PATCH /api/project-images/{id}
pub async fn update_image_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateImageOrderRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let image = run_db(&state, move |db| db.update_project_image_order(&id, req.sort_order))
        .await?
        .ok_or(ApiError::NotFound(IMAGE_NOT_FOUND))?;
    Ok(Json(image))
}

/// DELETE /api/project-images/{id}
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !run_db(&state, move |db| db.delete_project_image(&id)).await? {
        return Err(ApiError::NotFound(IMAGE_NOT_FOUND));
    }
    Ok(StatusCode::NO_CONTENT)
}
