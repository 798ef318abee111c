//! SQLite storage layer for linkshare.
//!
//! Owns the schema and the row-level CRUD for users, sessions, profiles,
//! links and click analytics. Row-level rules that must hold regardless
//! of caller (unique usernames, one highlighted link per user, cascading
//! deletes) live in the schema itself.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid blob name: {0}")]
    InvalidBlobName(String),
}

impl StorageError {
    /// Whether this error is a UNIQUE / CHECK / FOREIGN KEY violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Login credentials. One per account; `id` doubles as the profile id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: u64,
}

/// Server-side session addressed by the cookie token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub token: String,
    pub user_id: String,
    pub created_at: u64,
    pub expires_at: u64,
}

/// Public identity record. Social fields hold bare handles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub instagram_url: Option<String>,
    pub twitter_url: Option<String>,
    pub facebook_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub youtube_url: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// One entry on a user's public page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub cta_text: String,
    pub position: i64,
    pub is_active: bool,
    pub is_highlighted: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

/// One click event on a link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsRow {
    pub id: String,
    pub link_id: String,
    pub clicks: u32,
    pub last_clicked_at: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

// ---------------------------------------------------------------------------
// Storage handle
// ---------------------------------------------------------------------------

/// Main storage handle wrapping a SQLite connection.
pub struct Storage {
    conn: Connection,
}

const PROFILE_COLUMNS: &str = "id, username, full_name, bio, avatar_url,
     instagram_url, twitter_url, facebook_url, linkedin_url, youtube_url,
     created_at, updated_at";

const LINK_COLUMNS: &str = "id, user_id, title, url, description, thumbnail_url, cta_text,
     position, is_active, is_highlighted, created_at, updated_at";

impl Storage {
    /// Open or create a database at the given path. Creates schema if needed.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let storage = Self { conn };
        storage.create_schema()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let storage = Self { conn };
        storage.create_schema()?;
        Ok(storage)
    }

    fn create_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token       TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  INTEGER NOT NULL,
                expires_at  INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON sessions(expires_at);

            CREATE TABLE IF NOT EXISTS profiles (
                id              TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                username        TEXT NOT NULL UNIQUE,
                full_name       TEXT NOT NULL DEFAULT '',
                bio             TEXT,
                avatar_url      TEXT,
                instagram_url   TEXT,
                twitter_url     TEXT,
                facebook_url    TEXT,
                linkedin_url    TEXT,
                youtube_url     TEXT,
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS links (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
                title           TEXT NOT NULL,
                url             TEXT NOT NULL,
                description     TEXT,
                thumbnail_url   TEXT,
                cta_text        TEXT NOT NULL,
                position        INTEGER NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 1,
                is_highlighted  INTEGER NOT NULL DEFAULT 0,
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_links_user_position
                ON links(user_id, position);

            -- At most one highlighted link per user.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_links_single_highlight
                ON links(user_id) WHERE is_highlighted = 1;

            CREATE TABLE IF NOT EXISTS analytics (
                id              TEXT PRIMARY KEY,
                link_id         TEXT NOT NULL REFERENCES links(id) ON DELETE CASCADE,
                clicks          INTEGER NOT NULL DEFAULT 1,
                last_clicked_at INTEGER NOT NULL,
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_analytics_link ON analytics(link_id);
            ",
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub fn insert_user(&self, row: &UserRow) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![row.id, row.email, row.password_hash, row.created_at as i64],
        )?;
        Ok(())
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, email, password_hash, created_at FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                        created_at: row.get::<_, i64>(3)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Insert the user, their profile and a first session atomically.
    pub fn insert_account(
        &self,
        user: &UserRow,
        profile: &ProfileRow,
        session: &SessionRow,
    ) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        self.insert_user(user)?;
        self.insert_profile(profile)?;
        self.insert_session(session)?;
        tx.commit()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    pub fn insert_session(&self, row: &SessionRow) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                row.token,
                row.user_id,
                row.created_at as i64,
                row.expires_at as i64
            ],
        )?;
        Ok(())
    }

    pub fn get_session(&self, token: &str) -> Result<Option<SessionRow>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?1",
                params![token],
                |row| {
                    Ok(SessionRow {
                        token: row.get(0)?,
                        user_id: row.get(1)?,
                        created_at: row.get::<_, i64>(2)? as u64,
                        expires_at: row.get::<_, i64>(3)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn delete_session(&self, token: &str) -> Result<bool, StorageError> {
        let affected = self
            .conn
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(affected > 0)
    }

    /// Remove every session that expired at or before `now`.
    pub fn delete_expired_sessions(&self, now: u64) -> Result<usize, StorageError> {
        let affected = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![now as i64],
        )?;
        Ok(affected)
    }

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    pub fn insert_profile(&self, row: &ProfileRow) -> Result<(), StorageError> {
        self.conn.execute(
            &format!(
                "INSERT INTO profiles ({PROFILE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                row.id,
                row.username,
                row.full_name,
                row.bio,
                row.avatar_url,
                row.instagram_url,
                row.twitter_url,
                row.facebook_url,
                row.linkedin_url,
                row.youtube_url,
                row.created_at as i64,
                row.updated_at as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>, StorageError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id],
                profile_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn get_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<ProfileRow>, StorageError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE username = ?1"),
                params![username],
                profile_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Overwrite every editable column of the profile. `created_at` is kept.
    pub fn update_profile(&self, row: &ProfileRow) -> Result<bool, StorageError> {
        let affected = self.conn.execute(
            "UPDATE profiles SET
                username = ?2, full_name = ?3, bio = ?4, avatar_url = ?5,
                instagram_url = ?6, twitter_url = ?7, facebook_url = ?8,
                linkedin_url = ?9, youtube_url = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                row.id,
                row.username,
                row.full_name,
                row.bio,
                row.avatar_url,
                row.instagram_url,
                row.twitter_url,
                row.facebook_url,
                row.linkedin_url,
                row.youtube_url,
                row.updated_at as i64,
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn update_profile_avatar(
        &self,
        id: &str,
        avatar_url: Option<&str>,
        updated_at: u64,
    ) -> Result<bool, StorageError> {
        let affected = self.conn.execute(
            "UPDATE profiles SET avatar_url = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, avatar_url, updated_at as i64],
        )?;
        Ok(affected > 0)
    }

    pub fn count_profiles(&self) -> Result<u64, StorageError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    pub fn insert_link(&self, row: &LinkRow) -> Result<(), StorageError> {
        self.conn.execute(
            &format!(
                "INSERT INTO links ({LINK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                row.id,
                row.user_id,
                row.title,
                row.url,
                row.description,
                row.thumbnail_url,
                row.cta_text,
                row.position,
                row.is_active as i32,
                row.is_highlighted as i32,
                row.created_at as i64,
                row.updated_at as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_link(&self, id: &str) -> Result<Option<LinkRow>, StorageError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?1"),
                params![id],
                link_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// All links of a user in position order (dashboard view).
    pub fn list_links(&self, user_id: &str) -> Result<Vec<LinkRow>, StorageError> {
        self.query_links(
            &format!(
                "SELECT {LINK_COLUMNS} FROM links WHERE user_id = ?1
                 ORDER BY position, created_at"
            ),
            user_id,
        )
    }

    /// Visible links of a user, highlighted first, then by position.
    pub fn list_active_links(&self, user_id: &str) -> Result<Vec<LinkRow>, StorageError> {
        self.query_links(
            &format!(
                "SELECT {LINK_COLUMNS} FROM links WHERE user_id = ?1 AND is_active = 1
                 ORDER BY is_highlighted DESC, position"
            ),
            user_id,
        )
    }

    fn query_links(&self, sql: &str, user_id: &str) -> Result<Vec<LinkRow>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![user_id], link_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn count_links(&self, user_id: &str) -> Result<i64, StorageError> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM links WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Write the content fields of a link (title, url, description,
    /// thumbnail, cta text). Ordering and flags are left alone.
    pub fn update_link_content(&self, row: &LinkRow) -> Result<bool, StorageError> {
        let affected = self.conn.execute(
            "UPDATE links SET
                title = ?2, url = ?3, description = ?4, thumbnail_url = ?5,
                cta_text = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                row.id,
                row.title,
                row.url,
                row.description,
                row.thumbnail_url,
                row.cta_text,
                row.updated_at as i64,
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn set_link_active(
        &self,
        id: &str,
        is_active: bool,
        updated_at: u64,
    ) -> Result<bool, StorageError> {
        let affected = self.conn.execute(
            "UPDATE links SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, is_active as i32, updated_at as i64],
        )?;
        Ok(affected > 0)
    }

    /// Set or clear the highlight on one link of `user_id`.
    ///
    /// Setting runs as one transaction that first clears every other
    /// highlighted link of the same user, so readers never observe two
    /// highlighted links and a concurrent toggle cannot interleave.
    pub fn set_link_highlight(
        &self,
        user_id: &str,
        link_id: &str,
        highlighted: bool,
        updated_at: u64,
    ) -> Result<bool, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        if highlighted {
            self.conn.execute(
                "UPDATE links SET is_highlighted = 0, updated_at = ?3
                 WHERE user_id = ?1 AND id != ?2 AND is_highlighted = 1",
                params![user_id, link_id, updated_at as i64],
            )?;
        }
        let affected = self.conn.execute(
            "UPDATE links SET is_highlighted = ?3, updated_at = ?4
             WHERE id = ?1 AND user_id = ?2",
            params![link_id, user_id, highlighted as i32, updated_at as i64],
        )?;
        if affected == 0 {
            // Dropping the transaction rolls back the clear above.
            return Ok(false);
        }
        tx.commit()?;
        Ok(true)
    }

    pub fn delete_link(&self, id: &str) -> Result<bool, StorageError> {
        let affected = self
            .conn
            .execute("DELETE FROM links WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    pub fn count_all_links(&self) -> Result<u64, StorageError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    // -----------------------------------------------------------------------
    // Analytics
    // -----------------------------------------------------------------------

    pub fn insert_analytics(&self, row: &AnalyticsRow) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO analytics (id, link_id, clicks, last_clicked_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.link_id,
                row.clicks as i64,
                row.last_clicked_at as i64,
                row.created_at as i64,
                row.updated_at as i64,
            ],
        )?;
        Ok(())
    }

    /// Total recorded clicks for a link.
    pub fn count_clicks(&self, link_id: &str) -> Result<u64, StorageError> {
        let n: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(clicks), 0) FROM analytics WHERE link_id = ?1",
            params![link_id],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        bio: row.get(3)?,
        avatar_url: row.get(4)?,
        instagram_url: row.get(5)?,
        twitter_url: row.get(6)?,
        facebook_url: row.get(7)?,
        linkedin_url: row.get(8)?,
        youtube_url: row.get(9)?,
        created_at: row.get::<_, i64>(10)? as u64,
        updated_at: row.get::<_, i64>(11)? as u64,
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<LinkRow> {
    Ok(LinkRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        description: row.get(4)?,
        thumbnail_url: row.get(5)?,
        cta_text: row.get(6)?,
        position: row.get(7)?,
        is_active: row.get::<_, i32>(8)? != 0,
        is_highlighted: row.get::<_, i32>(9)? != 0,
        created_at: row.get::<_, i64>(10)? as u64,
        updated_at: row.get::<_, i64>(11)? as u64,
    })
}

/// Resolve the database path: `{data_dir}/linkshare.db`.
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("linkshare.db")
}

/// Resolve the blob root: `{data_dir}/blobs`.
pub fn blob_root(data_dir: &Path) -> PathBuf {
    data_dir.join("blobs")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
