//! SQLite connection pool and schema (spec.md §5). Grounded on the teacher's
//! `Database` wrapper (`src/infrastructure/persistence/database.rs`): WAL journal
//! mode, `create_if_missing`, one `init()` pass of idempotent `CREATE TABLE IF NOT
//! EXISTS` statements run at startup.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Bumped whenever a table added by `init()` changes shape. A store opened by
/// a newer engine than wrote it refuses to start rather than risk silently
/// misreading rows (spec.md's supplemental schema-hygiene note).
const SCHEMA_VERSION: i64 = 1;

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent).await.context("failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("failed to connect to SQLite database")?;

        info!("connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candle_state (
                exchange TEXT NOT NULL,
                symbol TEXT NOT NULL,
                state_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (exchange, symbol)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create candle_state table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trade_gaps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exchange TEXT NOT NULL,
                symbol TEXT NOT NULL,
                from_trade_id INTEGER NOT NULL,
                to_trade_id INTEGER NOT NULL,
                detected_at INTEGER NOT NULL,
                synced BOOLEAN NOT NULL DEFAULT 0,
                synced_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_trade_gaps_lookup
            ON trade_gaps (exchange, symbol, synced);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create trade_gaps table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                queue_name TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                enqueued_at INTEGER NOT NULL,
                processed BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_queue_items_pending
            ON queue_items (queue_name, processed, enqueued_at);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create queue_items table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create schema_version table")?;

        let existing: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version WHERE id = 1")
            .fetch_optional(&mut *conn)
            .await
            .context("failed to read schema_version")?;

        match existing {
            None => {
                sqlx::query("INSERT INTO schema_version (id, version) VALUES (1, $1)")
                    .bind(SCHEMA_VERSION)
                    .execute(&mut *conn)
                    .await
                    .context("failed to seed schema_version")?;
            }
            Some((version,)) if version > SCHEMA_VERSION => {
                anyhow::bail!("database schema version {version} is newer than this engine's {SCHEMA_VERSION}; refusing to open");
            }
            Some(_) => {}
        }

        info!("database schema initialized");
        Ok(())
    }
}
