use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use fuelquote_core::domain::customer::CustomerId;
use fuelquote_core::domain::quote::{CommittedQuote, PricedQuote, QuoteId, QuoteRequest};
use fuelquote_core::ports::{QuoteStore, StoreError};

use super::{decode_err, RepositoryError};
use crate::DbPool;

pub struct SqlQuoteStore {
    pool: DbPool,
}

impl SqlQuoteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn count_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM fuel_quote WHERE customer_id = ?")
            .bind(&customer_id.0)
            .fetch_one(&self.pool)
            .await?;
        row.try_get("count").map_err(decode_err)
    }

    pub async fn insert(&self, quote: &CommittedQuote) -> Result<(), RepositoryError> {
        let gallons = i64::from(quote.quote.gallons_requested());

        sqlx::query(
            "INSERT INTO fuel_quote (id, customer_id, gallons_requested, delivery_address,
                                     delivery_date, unit_price, total_due, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&quote.id.0)
        .bind(&quote.customer_id.0)
        .bind(gallons)
        .bind(quote.quote.delivery_address())
        .bind(quote.quote.delivery_date())
        .bind(quote.quote.unit_price().to_string())
        .bind(quote.quote.total_due().to_string())
        .bind(quote.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<CommittedQuote>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, customer_id, gallons_requested, delivery_address, delivery_date,
                    unit_price, total_due, created_at
             FROM fuel_quote WHERE customer_id = ? ORDER BY rowid ASC",
        )
        .bind(&customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_quote).collect::<Result<Vec<_>, _>>()
    }
}

fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

fn row_to_quote(row: &sqlx::sqlite::SqliteRow) -> Result<CommittedQuote, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let customer_id: String = row.try_get("customer_id").map_err(decode_err)?;
    let gallons: i64 = row.try_get("gallons_requested").map_err(decode_err)?;
    let delivery_address: String = row.try_get("delivery_address").map_err(decode_err)?;
    let delivery_date: String = row.try_get("delivery_date").map_err(decode_err)?;
    let unit_price_str: String = row.try_get("unit_price").map_err(decode_err)?;
    let total_due_str: String = row.try_get("total_due").map_err(decode_err)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode_err)?;

    let gallons_requested = u32::try_from(gallons)
        .map_err(|_| RepositoryError::Decode(format!("gallons_requested {gallons} out of range")))?;
    let unit_price = parse_decimal("unit_price", &unit_price_str)?;
    let total_due = parse_decimal("total_due", &total_due_str)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(decode_err)?;

    let quote = PricedQuote::new(
        QuoteRequest { gallons_requested, delivery_address, delivery_date },
        unit_price,
    );
    if quote.total_due() != total_due {
        return Err(RepositoryError::Decode(format!(
            "quote {id} total_due {total_due} does not match {unit_price} x {gallons_requested}"
        )));
    }

    Ok(CommittedQuote { id: QuoteId(id), customer_id: CustomerId(customer_id), quote, created_at })
}

#[async_trait::async_trait]
impl QuoteStore for SqlQuoteStore {
    async fn has_any_quote(&self, customer_id: &CustomerId) -> Result<bool, StoreError> {
        Ok(self.count_for_customer(customer_id).await? > 0)
    }

    async fn commit(&self, quote: CommittedQuote) -> Result<(), StoreError> {
        Ok(self.insert(&quote).await?)
    }

    async fn list_by_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<CommittedQuote>, StoreError> {
        Ok(self.find_by_customer(customer_id).await?)
    }
}
