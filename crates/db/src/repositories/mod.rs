use thiserror::Error;

use fuelquote_core::ports::StoreError;

pub mod hold;
pub mod memory;
pub mod profile;
pub mod quote;

pub use hold::SqlHoldStore;
pub use memory::{InMemoryHoldStore, InMemoryProfileDirectory, InMemoryQuoteStore};
pub use profile::SqlProfileDirectory;
pub use quote::SqlQuoteStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => StoreError::Unavailable(error.to_string()),
            RepositoryError::Decode(message) => StoreError::Corrupt(message),
        }
    }
}

pub(crate) fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
