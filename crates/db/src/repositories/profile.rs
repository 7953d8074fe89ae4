use chrono::Utc;
use sqlx::Row;

use fuelquote_core::domain::customer::{CustomerId, DeliveryProfile};
use fuelquote_core::ports::{ProfileDirectory, StoreError};

use super::{decode_err, RepositoryError};
use crate::DbPool;

pub struct SqlProfileDirectory {
    pool: DbPool,
}

impl SqlProfileDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<DeliveryProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT customer_id, full_name, address1, address2, city, state, zipcode
             FROM delivery_profile WHERE customer_id = ?",
        )
        .bind(&customer_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_profile(r)?)),
            None => Ok(None),
        }
    }

    pub async fn upsert(&self, profile: &DeliveryProfile) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO delivery_profile (customer_id, full_name, address1, address2, city,
                                           state, zipcode, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(customer_id) DO UPDATE SET
                 full_name = excluded.full_name,
                 address1 = excluded.address1,
                 address2 = excluded.address2,
                 city = excluded.city,
                 state = excluded.state,
                 zipcode = excluded.zipcode,
                 updated_at = excluded.updated_at",
        )
        .bind(&profile.customer_id.0)
        .bind(&profile.full_name)
        .bind(&profile.address1)
        .bind(&profile.address2)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.zipcode)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<DeliveryProfile, RepositoryError> {
    Ok(DeliveryProfile {
        customer_id: CustomerId(row.try_get("customer_id").map_err(decode_err)?),
        full_name: row.try_get("full_name").map_err(decode_err)?,
        address1: row.try_get("address1").map_err(decode_err)?,
        address2: row.try_get("address2").map_err(decode_err)?,
        city: row.try_get("city").map_err(decode_err)?,
        state: row.try_get("state").map_err(decode_err)?,
        zipcode: row.try_get("zipcode").map_err(decode_err)?,
    })
}

#[async_trait::async_trait]
impl ProfileDirectory for SqlProfileDirectory {
    async fn get_profile(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<DeliveryProfile>, StoreError> {
        Ok(self.find(customer_id).await?)
    }

    async fn save_profile(&self, profile: DeliveryProfile) -> Result<(), StoreError> {
        Ok(self.upsert(&profile).await?)
    }
}
