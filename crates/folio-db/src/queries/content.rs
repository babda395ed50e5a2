use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use folio_types::api::{UpsertAboutRequest, UpsertSiteSettingsRequest};
use folio_types::models::{About, SiteSettings};

use crate::Database;
use crate::models::json_column;

// Hero defaults for a fresh install.
const DEFAULT_GREETING_NAME: &str = "Filadelfi";
const DEFAULT_GREETING_PREFIX: &str = "Привет, я";
const DEFAULT_HERO_TITLE: &str = "Создаю";
const DEFAULT_HERO_HIGHLIGHT: &str = "цифровые чудеса";
const DEFAULT_WORKS_TITLE: &str = "Мои работы";

impl Database {
    // -- About (singleton) --

    pub fn get_about(&self) -> Result<Option<About>> {
        self.with_conn(query_about)
    }

    /// Merge `req` into the about row, creating it on first use.
    pub fn upsert_about(&self, req: &UpsertAboutRequest) -> Result<About> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();
            let mut about = query_about(&tx)?.unwrap_or_else(|| About {
                id: Uuid::new_v4().to_string(),
                title: None,
                subtitle: None,
                bio: None,
                photo_url: None,
                resume_url: None,
                skills: vec![],
                social_links: serde_json::json!({}),
                created_at: now,
                updated_at: now,
            });

            merge(&mut about.title, &req.title);
            merge(&mut about.subtitle, &req.subtitle);
            merge(&mut about.bio, &req.bio);
            merge(&mut about.photo_url, &req.photo_url);
            merge(&mut about.resume_url, &req.resume_url);
            if let Some(skills) = &req.skills {
                about.skills = skills.clone();
            }
            if let Some(links) = &req.social_links {
                about.social_links = links.clone();
            }
            about.updated_at = now;

            tx.execute(
                "INSERT INTO about_content
                    (id, title, subtitle, bio, photo_url, resume_url, skills, social_links, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title, subtitle = excluded.subtitle, bio = excluded.bio,
                    photo_url = excluded.photo_url, resume_url = excluded.resume_url,
                    skills = excluded.skills, social_links = excluded.social_links,
                    updated_at = excluded.updated_at",
                params![
                    about.id,
                    about.title,
                    about.subtitle,
                    about.bio,
                    about.photo_url,
                    about.resume_url,
                    serde_json::to_string(&about.skills)?,
                    serde_json::to_string(&about.social_links)?,
                    about.created_at,
                    about.updated_at,
                ],
            )?;
            tx.commit()?;

            Ok(about)
        })
    }

    // -- Site settings (singleton) --

    pub fn get_site_settings(&self) -> Result<Option<SiteSettings>> {
        self.with_conn(query_site_settings)
    }

    /// Merge `req` into the settings row, seeding defaults on first use.
    pub fn upsert_site_settings(&self, req: &UpsertSiteSettingsRequest) -> Result<SiteSettings> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();
            let mut settings = query_site_settings(&tx)?.unwrap_or_else(|| SiteSettings {
                id: Uuid::new_v4().to_string(),
                greeting_name: DEFAULT_GREETING_NAME.into(),
                greeting_prefix: DEFAULT_GREETING_PREFIX.into(),
                hero_title: DEFAULT_HERO_TITLE.into(),
                hero_highlight: DEFAULT_HERO_HIGHLIGHT.into(),
                hero_description: None,
                works_title: DEFAULT_WORKS_TITLE.into(),
                works_subtitle: None,
                created_at: now,
                updated_at: now,
            });

            if let Some(v) = &req.greeting_name {
                settings.greeting_name = v.clone();
            }
            if let Some(v) = &req.greeting_prefix {
                settings.greeting_prefix = v.clone();
            }
            if let Some(v) = &req.hero_title {
                settings.hero_title = v.clone();
            }
            if let Some(v) = &req.hero_highlight {
                settings.hero_highlight = v.clone();
            }
            merge(&mut settings.hero_description, &req.hero_description);
            if let Some(v) = &req.works_title {
                settings.works_title = v.clone();
            }
            merge(&mut settings.works_subtitle, &req.works_subtitle);
            settings.updated_at = now;

            tx.execute(
                "INSERT INTO site_settings
                    (id, greeting_name, greeting_prefix, hero_title, hero_highlight,
                     hero_description, works_title, works_subtitle, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    greeting_name = excluded.greeting_name,
                    greeting_prefix = excluded.greeting_prefix,
                    hero_title = excluded.hero_title,
                    hero_highlight = excluded.hero_highlight,
                    hero_description = excluded.hero_description,
                    works_title = excluded.works_title,
                    works_subtitle = excluded.works_subtitle,
                    updated_at = excluded.updated_at",
                params![
                    settings.id,
                    settings.greeting_name,
                    settings.greeting_prefix,
                    settings.hero_title,
                    settings.hero_highlight,
                    settings.hero_description,
                    settings.works_title,
                    settings.works_subtitle,
                    settings.created_at,
                    settings.updated_at,
                ],
            )?;
            tx.commit()?;

            Ok(settings)
        })
    }
}

fn merge(field: &mut Option<String>, incoming: &Option<String>) {
    if incoming.is_some() {
        field.clone_from(incoming);
    }
}

fn query_about(conn: &Connection) -> Result<Option<About>> {
    let about = conn
        .query_row(
            "SELECT id, title, subtitle, bio, photo_url, resume_url, skills, social_links, created_at, updated_at
             FROM about_content ORDER BY created_at ASC LIMIT 1",
            [],
            |row| {
                Ok(About {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    subtitle: row.get(2)?,
                    bio: row.get(3)?,
                    photo_url: row.get(4)?,
                    resume_url: row.get(5)?,
                    skills: json_column(row, 6)?,
                    social_links: json_column(row, 7)?,
                    created_at: row.get(8)?,
                    updated_at: row.get(9)?,
                })
            },
        )
        .optional()?;
    Ok(about)
}

fn query_site_settings(conn: &Connection) -> Result<Option<SiteSettings>> {
    let settings = conn
        .query_row(
            "SELECT id, greeting_name, greeting_prefix, hero_title, hero_highlight,
                    hero_description, works_title, works_subtitle, created_at, updated_at
             FROM site_settings ORDER BY created_at ASC LIMIT 1",
            [],
            |row| {
                Ok(SiteSettings {
                    id: row.get(0)?,
                    greeting_name: row.get(1)?,
                    greeting_prefix: row.get(2)?,
                    hero_title: row.get(3)?,
                    hero_highlight: row.get(4)?,
                    hero_description: row.get(5)?,
                    works_title: row.get(6)?,
                    works_subtitle: row.get(7)?,
                    created_at: row.get(8)?,
                    updated_at: row.get(9)?,
                })
            },
        )
        .optional()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn about_upsert_merges() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_about().unwrap().is_none());

        let first = db
            .upsert_about(&UpsertAboutRequest {
                title: Some("Designer".into()),
                skills: Some(vec!["Figma".into()]),
                ..Default::default()
            })
            .unwrap();
        let second = db
            .upsert_about(&UpsertAboutRequest {
                bio: Some("Hello".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.title.as_deref(), Some("Designer"));
        assert_eq!(second.bio.as_deref(), Some("Hello"));
        assert_eq!(second.skills, vec!["Figma".to_string()]);
        assert_eq!(db.get_about().unwrap().unwrap().social_links, serde_json::json!({}));
    }

    #[test]
    fn site_settings_seed_defaults() {
        let db = Database::open_in_memory().unwrap();
        let settings = db
            .upsert_site_settings(&UpsertSiteSettingsRequest {
                hero_title: Some("Building".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(settings.hero_title, "Building");
        assert_eq!(settings.greeting_name, DEFAULT_GREETING_NAME);
        assert_eq!(settings.works_title, DEFAULT_WORKS_TITLE);

        let stored = db.get_site_settings().unwrap().unwrap();
        assert_eq!(stored.id, settings.id);
        assert_eq!(stored.hero_highlight, DEFAULT_HERO_HIGHLIGHT);
    }
}
