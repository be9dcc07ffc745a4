//! `GapStore` adapter over the `trade_gaps` table (spec.md §4.2). Grounded on the
//! teacher's `OptimizationHistoryRepository` insert/fetch/update-in-place shape
//! (`src/infrastructure/persistence/repositories/optimization_history_repository.rs`),
//! adapted for gap rows instead of optimization runs.

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::market::gap::{GapFilter, GapRecord};
use crate::domain::ports::GapStore;
use crate::infrastructure::persistence::database::Database;
use async_trait::async_trait;

pub struct SqliteGapStore {
    database: Database,
}

impl SqliteGapStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl GapStore for SqliteGapStore {
    async fn gap_save(&self, gap: GapRecord) -> EngineResult<GapRecord> {
        let id: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO trade_gaps (exchange, symbol, from_trade_id, to_trade_id, detected_at, synced, synced_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&gap.exchange)
        .bind(&gap.symbol)
        .bind(gap.from_trade_id as i64)
        .bind(gap.to_trade_id as i64)
        .bind(gap.detected_at)
        .bind(gap.synced)
        .bind(gap.synced_at)
        .fetch_one(&self.database.pool)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        Ok(GapRecord { id: Some(id.0), ..gap })
    }

    async fn gap_save_batch(&self, gaps: Vec<GapRecord>) -> EngineResult<Vec<GapRecord>> {
        let mut tx = self.database.pool.begin().await.map_err(|e| EngineError::Storage(e.to_string()))?;
        let mut saved = Vec::with_capacity(gaps.len());

        for gap in gaps {
            let id: (i64,) = sqlx::query_as(
                r#"
                INSERT INTO trade_gaps (exchange, symbol, from_trade_id, to_trade_id, detected_at, synced, synced_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(&gap.exchange)
            .bind(&gap.symbol)
            .bind(gap.from_trade_id as i64)
            .bind(gap.to_trade_id as i64)
            .bind(gap.detected_at)
            .bind(gap.synced)
            .bind(gap.synced_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;

            saved.push(GapRecord { id: Some(id.0), ..gap });
        }

        tx.commit().await.map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok(saved)
    }

    async fn gap_load(&self, filter: GapFilter) -> EngineResult<Vec<GapRecord>> {
        // exchange/symbol/synced_only are real WHERE filters, not post-fetch
        // filters, so a high gap count on one symbol never forces a full scan.
        let mut sql = String::from(
            "SELECT id, exchange, symbol, from_trade_id, to_trade_id, detected_at, synced, synced_at FROM trade_gaps WHERE 1=1",
        );
        if filter.exchange.is_some() {
            sql.push_str(" AND exchange = ?");
        }
        if filter.symbol.is_some() {
            sql.push_str(" AND symbol = ?");
        }
        if let Some(synced_only) = filter.synced_only {
            sql.push_str(if synced_only { " AND synced = 1" } else { " AND synced = 0" });
        }
        sql.push_str(" ORDER BY detected_at DESC");

        let mut query = sqlx::query_as::<_, (i64, String, String, i64, i64, i64, bool, Option<i64>)>(&sql);
        if let Some(exchange) = &filter.exchange {
            query = query.bind(exchange);
        }
        if let Some(symbol) = &filter.symbol {
            query = query.bind(symbol);
        }

        let rows = query
            .fetch_all(&self.database.pool)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, exchange, symbol, from_trade_id, to_trade_id, detected_at, synced, synced_at)| GapRecord {
                id: Some(id),
                exchange,
                symbol,
                from_trade_id: from_trade_id as u64,
                to_trade_id: to_trade_id as u64,
                detected_at,
                synced,
                synced_at,
            })
            .collect())
    }

    async fn gap_mark_synced(&self, ids: Vec<i64>) -> EngineResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let synced_at = chrono::Utc::now().timestamp_millis();
        let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!("UPDATE trade_gaps SET synced = 1, synced_at = ? WHERE id IN ({placeholders})");

        let mut query = sqlx::query(&sql).bind(synced_at);
        for id in &ids {
            query = query.bind(id);
        }

        let result = query.execute(&self.database.pool).await.map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok(result.rows_affected() as usize)
    }
}
