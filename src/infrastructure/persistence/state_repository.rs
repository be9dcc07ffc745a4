//! `StateStore` adapter over the `candle_state` table. Grounded on the teacher's
//! `SqliteRiskStateRepository` upsert pattern
//! (`src/infrastructure/persistence/repositories/risk_state_repository.rs`).
//!
//! The store is opaque to candle shape: callers hand it a pre-serialized state
//! blob per `(exchange, symbol)` and get the same blob back on load.

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::ports::StateStore;
use crate::infrastructure::persistence::database::Database;
use async_trait::async_trait;

pub struct SqliteStateStore {
    database: Database,
}

impl SqliteStateStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    async fn upsert(&self, exchange: &str, symbol: &str, state_json: &str, now: i64) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO candle_state (exchange, symbol, state_json, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(exchange, symbol) DO UPDATE SET
                state_json = excluded.state_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(exchange)
        .bind(symbol)
        .bind(state_json)
        .bind(now)
        .execute(&self.database.pool)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn save(&self, exchange: &str, symbol: &str, state_json: &str) -> EngineResult<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.upsert(exchange, symbol, state_json, now).await
    }

    async fn save_batch(&self, states: Vec<(String, String, String)>) -> EngineResult<()> {
        let mut tx = self.database.pool.begin().await.map_err(|e| EngineError::Storage(e.to_string()))?;
        let now = chrono::Utc::now().timestamp_millis();

        for (exchange, symbol, state_json) in states {
            sqlx::query(
                r#"
                INSERT INTO candle_state (exchange, symbol, state_json, updated_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT(exchange, symbol) DO UPDATE SET
                    state_json = excluded.state_json,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(exchange)
            .bind(symbol)
            .bind(state_json)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        }

        tx.commit().await.map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn load(&self, exchange: &str, symbol: &str) -> EngineResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT state_json FROM candle_state WHERE exchange = $1 AND symbol = $2")
            .bind(exchange)
            .bind(symbol)
            .fetch_optional(&self.database.pool)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok(row.map(|(json,)| json))
    }

    async fn load_batch(&self, exchange: &str, symbols: Vec<String>) -> EngineResult<Vec<(String, String)>> {
        let mut out = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if let Some(json) = self.load(exchange, &symbol).await? {
                out.push((symbol, json));
            }
        }
        Ok(out)
    }

    async fn load_all(&self) -> EngineResult<Vec<(String, String, String)>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as("SELECT exchange, symbol, state_json FROM candle_state")
            .fetch_all(&self.database.pool)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok(rows)
    }
}
