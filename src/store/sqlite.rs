//! Implements SessionStore for SQLite.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::traits::SessionStore;
use super::types::{
    from_millis, now_millis, Session, SessionUpdate, StoreError, StoreResult, StoredMessage,
};
use crate::chat::types::Role;
use crate::emotion::EmotionLabel;

/// Create a SQLite connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    SqlitePoolOptions::new()
        // SQLite is single-writer, but can have multiple readers
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))
}

/// Single-connection in-memory pool that never recycles its connection
/// (recycling would drop the database).
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}

pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        super::migration::run_migrations(&pool).await?;
        info!("Database ready: {}", database_url);
        Ok(Self::new(pool))
    }

    /// Fresh in-memory store, used by tests and `--in-memory` runs
    pub async fn in_memory() -> Result<Self> {
        let pool = create_memory_pool().await?;
        super::migration::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    fn session_from_row(row: &SqliteRow) -> Session {
        Session {
            session_id: row.get("session_id"),
            name: row.get("name"),
            color: row.get("color"),
            created_at: from_millis(row.get("created_at")),
            updated_at: from_millis(row.get("updated_at")),
        }
    }

    fn message_from_row(row: &SqliteRow) -> StoreResult<StoredMessage> {
        let role: String = row.get("role");
        let role = role
            .parse::<Role>()
            .map_err(|reason| StoreError::InvalidRow { table: "messages", reason })?;

        let emotion: Option<String> = row.get("emotion");
        let emotion = emotion
            .map(|e| e.parse::<EmotionLabel>())
            .transpose()
            .map_err(|reason| StoreError::InvalidRow { table: "messages", reason })?;

        Ok(StoredMessage {
            id: row.get("id"),
            session_id: row.get("session_id"),
            role,
            content: row.get("content"),
            emotion,
            created_at: from_millis(row.get("created_at")),
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create_session(&self) -> StoreResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        let now = now_millis();

        sqlx::query(
            "INSERT INTO sessions (session_id, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(&session_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!("Created session {}", session_id);
        Ok(Session {
            session_id,
            name: None,
            color: None,
            created_at: from_millis(now),
            updated_at: from_millis(now),
        })
    }

    async fn ensure_session(&self, session_id: &str) -> StoreResult<()> {
        let now = now_millis();
        // Uniqueness of the primary key makes this safe under concurrency
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (session_id, created_at, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!("Created session {} on demand", session_id);
        }
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> StoreResult<Session> {
        let row = sqlx::query(
            "SELECT session_id, name, color, created_at, updated_at FROM sessions WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;

        Ok(Self::session_from_row(&row))
    }

    async fn list_sessions(&self) -> StoreResult<Vec<Session>> {
        let rows = sqlx::query(
            r#"
            SELECT session_id, name, color, created_at, updated_at
            FROM sessions
            ORDER BY updated_at DESC, created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::session_from_row).collect())
    }

    async fn update_session(&self, session_id: &str, update: &SessionUpdate) -> StoreResult<Session> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET name = CASE WHEN ?1 IS NULL THEN name ELSE NULLIF(?1, '') END,
                color = COALESCE(?2, color),
                updated_at = ?3
            WHERE session_id = ?4
            "#,
        )
        .bind(update.name.as_deref())
        .bind(update.color.as_deref())
        .bind(now_millis())
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(session_id.to_string()));
        }
        self.get_session(session_id).await
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound(session_id.to_string()));
        }

        tx.commit().await?;
        debug!("Deleted session {}", session_id);
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        emotion: Option<EmotionLabel>,
    ) -> StoreResult<StoredMessage> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        // Touch the session first; zero rows means it does not exist
        let touched = sqlx::query("UPDATE sessions SET updated_at = ? WHERE session_id = ?")
            .bind(now)
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        if touched.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound(session_id.to_string()));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO messages (session_id, role, content, emotion, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(session_id)
        .bind(role.as_str())
        .bind(content)
        .bind(emotion.map(|e| e.as_str()))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(StoredMessage {
            id: row.get("id"),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            emotion,
            created_at: from_millis(now),
        })
    }

    async fn get_session_messages(&self, session_id: &str) -> StoreResult<Vec<StoredMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, role, content, emotion, created_at
            FROM messages
            WHERE session_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::message_from_row).collect()
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
