//! Collaborator interfaces the quote workflow depends on.
//!
//! Implementations live in `fuelquote-db` (SQLite and in-memory); tests in this
//! crate use the small fakes at the bottom of `workflow`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::customer::{CustomerId, DeliveryProfile, SessionId};
use crate::domain::quote::{CommittedQuote, PricedQuote};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored record could not be decoded: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_profile(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<DeliveryProfile>, StoreError>;

    async fn save_profile(&self, profile: DeliveryProfile) -> Result<(), StoreError>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn has_any_quote(&self, customer_id: &CustomerId) -> Result<bool, StoreError>;

    /// Persists one committed quote. A single insert; no partial writes.
    async fn commit(&self, quote: CommittedQuote) -> Result<(), StoreError>;

    /// Committed quotes for the customer in insertion order.
    async fn list_by_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<CommittedQuote>, StoreError>;
}

/// Session-scoped storage for at most one pending quote per session.
#[async_trait]
pub trait HoldStore: Send + Sync {
    /// Replaces any hold already stored for the session.
    async fn put(&self, session_id: &SessionId, quote: PricedQuote) -> Result<(), StoreError>;

    /// Removes and returns the session's hold.
    async fn take(&self, session_id: &SessionId) -> Result<Option<PricedQuote>, StoreError>;

    /// Reads the session's hold without removing it.
    async fn peek(&self, session_id: &SessionId) -> Result<Option<PricedQuote>, StoreError>;

    /// Drops every hold last written before `cutoff`; returns how many went.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
