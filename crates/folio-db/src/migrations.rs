use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL,
                is_admin    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE sessions (
                sid_hash    TEXT PRIMARY KEY,
                sess        TEXT NOT NULL,
                expire      TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_expire ON sessions(expire);

            CREATE TABLE projects (
                id                  TEXT PRIMARY KEY,
                title               TEXT NOT NULL,
                description         TEXT,
                short_description   TEXT,
                image_url           TEXT,
                tags                TEXT NOT NULL DEFAULT '[]',
                category            TEXT,
                external_url        TEXT,
                github_url          TEXT,
                technologies        TEXT NOT NULL DEFAULT '[]',
                role                TEXT,
                year                INTEGER,
                featured            INTEGER NOT NULL DEFAULT 0,
                published           INTEGER NOT NULL DEFAULT 1,
                sort_order          INTEGER NOT NULL DEFAULT 0,
                user_id             TEXT REFERENCES users(id) ON DELETE SET NULL,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE TABLE project_images (
                id          TEXT PRIMARY KEY,
                project_id  TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                image_url   TEXT NOT NULL,
                caption     TEXT,
                sort_order  INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_project_images_project ON project_images(project_id, sort_order);

            CREATE TABLE about_content (
                id          TEXT PRIMARY KEY,
                title       TEXT,
                subtitle    TEXT,
                bio         TEXT,
                photo_url   TEXT,
                resume_url  TEXT,
                skills      TEXT NOT NULL DEFAULT '[]',
                social_links TEXT NOT NULL DEFAULT '{}',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE site_settings (
                id                  TEXT PRIMARY KEY,
                greeting_name       TEXT NOT NULL,
                greeting_prefix     TEXT NOT NULL,
                hero_title          TEXT NOT NULL,
                hero_highlight      TEXT NOT NULL,
                hero_description    TEXT,
                works_title         TEXT NOT NULL,
                works_subtitle      TEXT,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE TABLE contact_messages (
                id                  TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                email               TEXT NOT NULL,
                subject             TEXT,
                message             TEXT NOT NULL,
                is_read             INTEGER NOT NULL DEFAULT 0,
                conversation_token  TEXT NOT NULL UNIQUE,
                user_reply_count    INTEGER NOT NULL DEFAULT 0,
                last_user_reply_at  TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE conversation_replies (
                id          TEXT PRIMARY KEY,
                message_id  TEXT NOT NULL REFERENCES contact_messages(id) ON DELETE CASCADE,
                author_type TEXT NOT NULL CHECK (author_type IN ('user', 'admin')),
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_conversation_replies_message
                ON conversation_replies(message_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
