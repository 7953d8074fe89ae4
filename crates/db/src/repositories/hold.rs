use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use fuelquote_core::domain::customer::SessionId;
use fuelquote_core::domain::quote::PricedQuote;
use fuelquote_core::ports::{HoldStore, StoreError};

use super::{decode_err, RepositoryError};
use crate::DbPool;

/// Holds persisted as JSON so they survive a server restart.
pub struct SqlHoldStore {
    pool: DbPool,
}

impl SqlHoldStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(
        &self,
        session_id: &SessionId,
        quote: &PricedQuote,
    ) -> Result<(), RepositoryError> {
        let quote_json = serde_json::to_string(quote).map_err(decode_err)?;

        sqlx::query(
            "INSERT INTO session_hold (session_id, quote_json, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET
                 quote_json = excluded.quote_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&session_id.0)
        .bind(quote_json)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete-and-return in one statement so two confirmations cannot both
    /// receive the same hold.
    pub async fn remove(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<PricedQuote>, RepositoryError> {
        let row = sqlx::query("DELETE FROM session_hold WHERE session_id = ? RETURNING quote_json")
            .bind(&session_id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_hold).transpose()
    }

    pub async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM session_hold WHERE updated_at < ?")
            .bind(timestamp(cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn find(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<PricedQuote>, RepositoryError> {
        let row = sqlx::query("SELECT quote_json FROM session_hold WHERE session_id = ?")
            .bind(&session_id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_hold).transpose()
    }
}

/// Fixed-width UTC text so `updated_at` compares correctly as a string.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_hold(row: &sqlx::sqlite::SqliteRow) -> Result<PricedQuote, RepositoryError> {
    let quote_json: String = row.try_get("quote_json").map_err(decode_err)?;
    serde_json::from_str(&quote_json).map_err(decode_err)
}

#[async_trait::async_trait]
impl HoldStore for SqlHoldStore {
    async fn put(&self, session_id: &SessionId, quote: PricedQuote) -> Result<(), StoreError> {
        Ok(self.upsert(session_id, &quote).await?)
    }

    async fn take(&self, session_id: &SessionId) -> Result<Option<PricedQuote>, StoreError> {
        Ok(self.remove(session_id).await?)
    }

    async fn peek(&self, session_id: &SessionId) -> Result<Option<PricedQuote>, StoreError> {
        Ok(self.find(session_id).await?)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(self.delete_before(cutoff).await?)
    }
}
