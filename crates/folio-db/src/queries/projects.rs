use anyhow::{Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;
use uuid::Uuid;

use folio_types::api::{AddProjectImageRequest, CreateProjectRequest, ProjectOrder, UpdateProjectRequest};
use folio_types::models::{Project, ProjectImage};

use crate::Database;
use crate::models::json_column;

const PROJECT_COLUMNS: &str = "id, title, description, short_description, image_url, tags, \
     category, external_url, github_url, technologies, role, year, featured, published, \
     sort_order, user_id, created_at, updated_at";

const IMAGE_COLUMNS: &str = "id, project_id, image_url, caption, sort_order, created_at";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        short_description: row.get(3)?,
        image_url: row.get(4)?,
        tags: json_column(row, 5)?,
        category: row.get(6)?,
        external_url: row.get(7)?,
        github_url: row.get(8)?,
        technologies: json_column(row, 9)?,
        role: row.get(10)?,
        year: row.get(11)?,
        featured: row.get(12)?,
        published: row.get(13)?,
        sort_order: row.get(14)?,
        user_id: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectImage> {
    Ok(ProjectImage {
        id: row.get(0)?,
        project_id: row.get(1)?,
        image_url: row.get(2)?,
        caption: row.get(3)?,
        sort_order: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    // -- Projects --

    /// Projects in gallery order: highest `sort_order` first, then newest.
    pub fn list_projects(&self, published_only: bool) -> Result<Vec<Project>> {
        self.with_conn(|conn| {
            let filter = if published_only { "WHERE published = 1" } else { "" };
            let sql = format!(
                "SELECT {} FROM projects {} ORDER BY sort_order DESC, created_at DESC",
                PROJECT_COLUMNS, filter
            );
            let mut stmt = conn.prepare(&sql)?;
            let projects = stmt
                .query_map([], project_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(projects)
        })
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.with_conn(|conn| query_project(conn, id))
    }

    pub fn create_project(&self, req: &CreateProjectRequest, user_id: Option<&str>) -> Result<Project> {
        self.with_conn(|conn| {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                &format!(
                    "INSERT INTO projects ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
                    PROJECT_COLUMNS
                ),
                params![
                    id,
                    req.title,
                    req.description,
                    req.short_description,
                    req.image_url,
                    serde_json::to_string(&req.tags)?,
                    req.category,
                    req.external_url,
                    req.github_url,
                    serde_json::to_string(&req.technologies)?,
                    req.role,
                    req.year,
                    req.featured,
                    req.published,
                    req.sort_order,
                    user_id,
                    now,
                ],
            )?;

            query_project(conn, &id)?.ok_or_else(|| anyhow!("Project vanished after insert: {}", id))
        })
    }

    /// Apply a partial update. Returns `None` if the project does not exist.
    pub fn update_project(&self, id: &str, patch: &UpdateProjectRequest) -> Result<Option<Project>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(mut project) = query_project(&tx, id)? else {
                return Ok(None);
            };

            apply_patch(&mut project, patch);
            project.updated_at = Utc::now();

            tx.execute(
                "UPDATE projects SET
                    title = ?2, description = ?3, short_description = ?4, image_url = ?5,
                    tags = ?6, category = ?7, external_url = ?8, github_url = ?9,
                    technologies = ?10, role = ?11, year = ?12, featured = ?13,
                    published = ?14, sort_order = ?15, updated_at = ?16
                 WHERE id = ?1",
                params![
                    project.id,
                    project.title,
                    project.description,
                    project.short_description,
                    project.image_url,
                    serde_json::to_string(&project.tags)?,
                    project.category,
                    project.external_url,
                    project.github_url,
                    serde_json::to_string(&project.technologies)?,
                    project.role,
                    project.year,
                    project.featured,
                    project.published,
                    project.sort_order,
                    project.updated_at,
                ],
            )?;
            tx.commit()?;

            Ok(Some(project))
        })
    }

    /// Persist a drag-reorder in one transaction. Unknown ids are skipped;
    /// returns how many projects were updated.
    pub fn reorder_projects(&self, orders: &[ProjectOrder]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();
            let mut updated = 0;
            {
                let mut stmt = tx.prepare(
                    "UPDATE projects SET sort_order = ?2, updated_at = ?3 WHERE id = ?1",
                )?;
                for order in orders {
                    let changed = stmt.execute(params![order.id, order.sort_order, now])?;
                    if changed == 0 {
                        debug!("Reorder skipped unknown project {}", order.id);
                    }
                    updated += changed;
                }
            }
            tx.commit()?;
            Ok(updated)
        })
    }

    /// Delete a project. Its images go with it (ON DELETE CASCADE).
    pub fn delete_project(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Project images --

    pub fn list_project_images(&self, project_id: &str) -> Result<Vec<ProjectImage>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM project_images WHERE project_id = ?1
                 ORDER BY sort_order ASC, created_at ASC",
                IMAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let images = stmt
                .query_map([project_id], image_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(images)
        })
    }

    /// Returns `None` if the project does not exist.
    pub fn add_project_image(
        &self,
        project_id: &str,
        req: &AddProjectImageRequest,
    ) -> Result<Option<ProjectImage>> {
        self.with_conn(|conn| {
            if query_project(conn, project_id)?.is_none() {
                return Ok(None);
            }

            let image = ProjectImage {
                id: Uuid::new_v4().to_string(),
                project_id: project_id.to_string(),
                image_url: req.image_url.clone(),
                caption: req.caption.clone(),
                sort_order: req.sort_order,
                created_at: Utc::now(),
            };
            conn.execute(
                &format!("INSERT INTO project_images ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", IMAGE_COLUMNS),
                params![
                    image.id,
                    image.project_id,
                    image.image_url,
                    image.caption,
                    image.sort_order,
                    image.created_at,
                ],
            )?;

            Ok(Some(image))
        })
    }

    pub fn update_project_image_order(&self, id: &str, sort_order: i32) -> Result<Option<ProjectImage>> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE project_images SET sort_order = ?2 WHERE id = ?1",
                params![id, sort_order],
            )?;
            if updated == 0 {
                return Ok(None);
            }

            let image = conn
                .query_row(
                    &format!("SELECT {} FROM project_images WHERE id = ?1", IMAGE_COLUMNS),
                    [id],
                    image_from_row,
                )
                .optional()?;
            Ok(image)
        })
    }

    pub fn delete_project_image(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM project_images WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn query_project(conn: &Connection, id: &str) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
            [id],
            project_from_row,
        )
        .optional()?;
    Ok(project)
}

fn apply_patch(project: &mut Project, patch: &UpdateProjectRequest) {
    if let Some(title) = &patch.title {
        project.title = title.clone();
    }
    if let Some(v) = &patch.description {
        project.description = v.clone();
    }
    if let Some(v) = &patch.short_description {
        project.short_description = v.clone();
    }
    if let Some(v) = &patch.image_url {
        project.image_url = v.clone();
    }
    if let Some(tags) = &patch.tags {
        project.tags = tags.clone();
    }
    if let Some(v) = &patch.category {
        project.category = v.clone();
    }
    if let Some(v) = &patch.external_url {
        project.external_url = v.clone();
    }
    if let Some(v) = &patch.github_url {
        project.github_url = v.clone();
    }
    if let Some(technologies) = &patch.technologies {
        project.technologies = technologies.clone();
    }
    if let Some(v) = &patch.role {
        project.role = v.clone();
    }
    if let Some(v) = patch.year {
        project.year = v;
    }
    if let Some(featured) = patch.featured {
        project.featured = featured;
    }
    if let Some(published) = patch.published {
        project.published = published;
    }
    if let Some(sort_order) = patch.sort_order {
        project.sort_order = sort_order;
    }
}
