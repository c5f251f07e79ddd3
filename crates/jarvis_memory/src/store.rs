use crate::errors::ErrorRecord;
use crate::long_term::PatternEntry;
use crate::short_term::MemoryEntry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use jarvis_core::ContextState;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;

/// Durable backing for the brain's memories. Every write is best-effort
/// from the caller's point of view: failures are reported, never fatal.
#[async_trait]
pub trait BrainStore: Send + Sync {
    /// Append one short-term entry and keep only the newest `capacity`.
    async fn append_short_term(&self, entry: &MemoryEntry, capacity: usize) -> Result<()>;
    /// Short-term entries, oldest first.
    async fn load_short_term(&self) -> Result<Vec<MemoryEntry>>;

    /// Overwrite the stored pattern set.
    async fn save_patterns(&self, patterns: &[PatternEntry]) -> Result<()>;
    async fn load_patterns(&self) -> Result<Vec<PatternEntry>>;

    /// Overwrite the latest context snapshot.
    async fn save_context(&self, state: &ContextState) -> Result<()>;
    async fn load_context(&self) -> Result<Option<ContextState>>;

    async fn upsert_error(&self, record: &ErrorRecord) -> Result<()>;
    /// Overwrite the stored error records.
    async fn save_errors(&self, records: &[ErrorRecord]) -> Result<()>;
    async fn load_errors(&self) -> Result<Vec<ErrorRecord>>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().display().to_string();
        let db_url = format!("sqlite://{}?mode=rwc", path);

        // Each connection to an in-memory database is a separate database.
        let mut options = SqlitePoolOptions::new();
        if path == ":memory:" {
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options
            .connect(&db_url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database at {}", path))?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(path = %path, "Brain store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS short_term (
                id INTEGER PRIMARY KEY,
                action TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                details_json TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create short_term table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patterns (
                position INTEGER PRIMARY KEY,
                pattern TEXT NOT NULL,
                confidence REAL NOT NULL,
                usage_count INTEGER NOT NULL,
                first_seen INTEGER NOT NULL,
                last_used INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create patterns table")?;

        // Singleton row: only the latest snapshot is kept.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS context_snapshot (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                state_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create context_snapshot table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS errors (
                id INTEGER PRIMARY KEY,
                error_type TEXT NOT NULL,
                message TEXT NOT NULL,
                context TEXT NOT NULL,
                occurrence_count INTEGER NOT NULL,
                first_seen INTEGER NOT NULL,
                last_seen INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create errors table")?;

        Ok(())
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

#[async_trait]
impl BrainStore for SqliteStore {
    async fn append_short_term(&self, entry: &MemoryEntry, capacity: usize) -> Result<()> {
        let details = serde_json::to_string(&entry.details)
            .context("Failed to serialize short-term details")?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query(
            "INSERT OR REPLACE INTO short_term (id, action, timestamp, details_json) VALUES (?, ?, ?, ?)",
        )
        .bind(entry.id as i64)
        .bind(&entry.action)
        .bind(entry.timestamp.timestamp_millis())
        .bind(&details)
        .execute(&mut *tx)
        .await
        .context("Failed to insert short-term entry")?;

        sqlx::query(
            "DELETE FROM short_term WHERE id NOT IN \
             (SELECT id FROM short_term ORDER BY id DESC LIMIT ?)",
        )
        .bind(capacity as i64)
        .execute(&mut *tx)
        .await
        .context("Failed to trim short-term table")?;

        tx.commit().await.context("Failed to commit short-term entry")?;
        Ok(())
    }

    async fn load_short_term(&self) -> Result<Vec<MemoryEntry>> {
        let rows = sqlx::query(
            "SELECT id, action, timestamp, details_json FROM short_term ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load short-term memory")?;

        rows.into_iter()
            .map(|row| {
                let details: String = row.get("details_json");
                Ok(MemoryEntry {
                    id: row.get::<i64, _>("id") as u64,
                    action: row.get("action"),
                    timestamp: from_millis(row.get("timestamp")),
                    details: serde_json::from_str(&details)
                        .context("Failed to parse short-term details")?,
                })
            })
            .collect()
    }

    async fn save_patterns(&self, patterns: &[PatternEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query("DELETE FROM patterns")
            .execute(&mut *tx)
            .await
            .context("Failed to clear patterns")?;

        for (position, p) in patterns.iter().enumerate() {
            sqlx::query(
                "INSERT INTO patterns (position, pattern, confidence, usage_count, first_seen, last_used) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(position as i64)
            .bind(&p.pattern)
            .bind(p.confidence as f64)
            .bind(p.usage_count as i64)
            .bind(p.first_seen.timestamp_millis())
            .bind(p.last_used.timestamp_millis())
            .execute(&mut *tx)
            .await
            .context("Failed to insert pattern")?;
        }

        tx.commit().await.context("Failed to commit patterns")?;
        tracing::debug!(count = patterns.len(), "Patterns saved");
        Ok(())
    }

    async fn load_patterns(&self) -> Result<Vec<PatternEntry>> {
        let rows = sqlx::query(
            "SELECT pattern, confidence, usage_count, first_seen, last_used \
             FROM patterns ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load patterns")?;

        Ok(rows
            .into_iter()
            .map(|row| PatternEntry {
                pattern: row.get("pattern"),
                confidence: row.get::<f64, _>("confidence") as f32,
                usage_count: row.get::<i64, _>("usage_count") as u32,
                first_seen: from_millis(row.get("first_seen")),
                last_used: from_millis(row.get("last_used")),
            })
            .collect())
    }

    async fn save_context(&self, state: &ContextState) -> Result<()> {
        let json = serde_json::to_string(state).context("Failed to serialize context state")?;
        sqlx::query(
            "INSERT INTO context_snapshot (id, state_json, updated_at) VALUES (1, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET state_json = excluded.state_json, updated_at = excluded.updated_at",
        )
        .bind(&json)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to save context snapshot")?;

        tracing::debug!(turns = state.turn_count, "Context snapshot saved");
        Ok(())
    }

    async fn load_context(&self) -> Result<Option<ContextState>> {
        let row = sqlx::query("SELECT state_json FROM context_snapshot WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query context snapshot")?;

        match row {
            Some(row) => {
                let json: String = row.get("state_json");
                let state = serde_json::from_str(&json).context("Failed to parse context snapshot")?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn upsert_error(&self, record: &ErrorRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO errors (id, error_type, message, context, occurrence_count, first_seen, last_seen) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET occurrence_count = excluded.occurrence_count, \
             last_seen = excluded.last_seen",
        )
        .bind(record.id as i64)
        .bind(&record.error_type)
        .bind(&record.message)
        .bind(&record.context)
        .bind(record.occurrence_count as i64)
        .bind(record.first_seen.timestamp_millis())
        .bind(record.last_seen.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to save error record")?;
        Ok(())
    }

    async fn save_errors(&self, records: &[ErrorRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query("DELETE FROM errors")
            .execute(&mut *tx)
            .await
            .context("Failed to clear error records")?;

        for r in records {
            sqlx::query(
                "INSERT INTO errors (id, error_type, message, context, occurrence_count, first_seen, last_seen) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(r.id as i64)
            .bind(&r.error_type)
            .bind(&r.message)
            .bind(&r.context)
            .bind(r.occurrence_count as i64)
            .bind(r.first_seen.timestamp_millis())
            .bind(r.last_seen.timestamp_millis())
            .execute(&mut *tx)
            .await
            .context("Failed to insert error record")?;
        }

        tx.commit().await.context("Failed to commit error records")?;
        tracing::debug!(count = records.len(), "Error records saved");
        Ok(())
    }

    async fn load_errors(&self) -> Result<Vec<ErrorRecord>> {
        let rows = sqlx::query(
            "SELECT id, error_type, message, context, occurrence_count, first_seen, last_seen \
             FROM errors ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load error records")?;

        Ok(rows
            .into_iter()
            .map(|row| ErrorRecord {
                id: row.get::<i64, _>("id") as u64,
                error_type: row.get("error_type"),
                message: row.get("message"),
                context: row.get("context"),
                occurrence_count: row.get::<i64, _>("occurrence_count") as u32,
                first_seen: from_millis(row.get("first_seen")),
                last_seen: from_millis(row.get("last_seen")),
            })
            .collect())
    }
}
