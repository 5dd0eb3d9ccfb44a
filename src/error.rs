use crate::domain::subscription::SubscriptionStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Unknown tier: {0}")]
    UnknownTier(String),
    #[error("No subscription for user {user} on tier {tier}")]
    SubscriptionNotFound { user: String, tier: String },
    #[error("A payment for user {user} on tier {tier} is in progress")]
    PaymentInProgress { user: String, tier: String },
    #[error("Cannot {action} a subscription that is {from}")]
    InvalidTransition {
        from: SubscriptionStatus,
        action: &'static str,
    },
    #[error("Gateway error: {0}")]
    GatewayError(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, BillingError>;
