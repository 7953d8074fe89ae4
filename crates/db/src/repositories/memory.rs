use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use fuelquote_core::domain::customer::{CustomerId, DeliveryProfile, SessionId};
use fuelquote_core::domain::quote::{CommittedQuote, PricedQuote};
use fuelquote_core::ports::{HoldStore, ProfileDirectory, QuoteStore, StoreError};

#[derive(Default)]
pub struct InMemoryProfileDirectory {
    profiles: RwLock<HashMap<String, DeliveryProfile>>,
}

#[async_trait::async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn get_profile(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<DeliveryProfile>, StoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&customer_id.0).cloned())
    }

    async fn save_profile(&self, profile: DeliveryProfile) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.customer_id.0.clone(), profile);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuoteStore {
    quotes: RwLock<Vec<CommittedQuote>>,
}

#[async_trait::async_trait]
impl QuoteStore for InMemoryQuoteStore {
    async fn has_any_quote(&self, customer_id: &CustomerId) -> Result<bool, StoreError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.iter().any(|quote| &quote.customer_id == customer_id))
    }

    async fn commit(&self, quote: CommittedQuote) -> Result<(), StoreError> {
        let mut quotes = self.quotes.write().await;
        if quotes.iter().any(|existing| existing.id == quote.id) {
            return Err(StoreError::Unavailable(format!("quote {} already committed", quote.id)));
        }
        quotes.push(quote);
        Ok(())
    }

    async fn list_by_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<CommittedQuote>, StoreError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.iter().filter(|quote| &quote.customer_id == customer_id).cloned().collect())
    }
}

/// Session holds kept in process memory; lost on restart.
#[derive(Default)]
pub struct InMemoryHoldStore {
    holds: RwLock<HashMap<String, (PricedQuote, DateTime<Utc>)>>,
}

#[async_trait::async_trait]
impl HoldStore for InMemoryHoldStore {
    async fn put(&self, session_id: &SessionId, quote: PricedQuote) -> Result<(), StoreError> {
        let mut holds = self.holds.write().await;
        holds.insert(session_id.0.clone(), (quote, Utc::now()));
        Ok(())
    }

    async fn take(&self, session_id: &SessionId) -> Result<Option<PricedQuote>, StoreError> {
        let mut holds = self.holds.write().await;
        Ok(holds.remove(&session_id.0).map(|(quote, _)| quote))
    }

    async fn peek(&self, session_id: &SessionId) -> Result<Option<PricedQuote>, StoreError> {
        let holds = self.holds.read().await;
        Ok(holds.get(&session_id.0).map(|(quote, _)| quote.clone()))
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut holds = self.holds.write().await;
        let before = holds.len();
        holds.retain(|_, (_, written_at)| *written_at >= cutoff);
        Ok((before - holds.len()) as u64)
    }
}
