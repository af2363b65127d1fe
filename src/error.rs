use crate::application::store::StoreError;
use crate::domain::AccountId;
use thiserror::Error;

/// Balance race harness error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Balance of account {account} would overflow")]
    BalanceOverflow { account: AccountId },

    #[error("Worker {worker} did not finish: {message}")]
    Worker { worker: usize, message: String },
}

impl Error {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the underlying store gave up on a lock conflict or deadlock
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, Self::Store(store) if store.is_lock_conflict())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
