use crate::domain::ids::{TierId, UserId};
use crate::domain::ports::SubscriptionStore;
use crate::domain::subscription::Subscription;
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing subscriptions.
pub const CF_SUBSCRIPTIONS: &str = "subscriptions";

/// A persistent subscription store backed by RocksDB.
///
/// Records are JSON values keyed by `user \0 tier`; ids never contain NUL
/// in practice and the separator keeps `("ab", "c")` apart from `("a", "bc")`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "subscriptions" column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_subscriptions = ColumnFamilyDescriptor::new(CF_SUBSCRIPTIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_subscriptions])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn key(user: &UserId, tier: &TierId) -> Vec<u8> {
        let mut key = Vec::with_capacity(user.as_str().len() + tier.as_str().len() + 1);
        key.extend_from_slice(user.as_str().as_bytes());
        key.push(0);
        key.extend_from_slice(tier.as_str().as_bytes());
        key
    }

    fn decode(bytes: &[u8]) -> Result<Subscription> {
        serde_json::from_slice(bytes).map_err(|e| {
            BillingError::InternalError(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Deserialization error: {}", e),
            )))
        })
    }
}

fn missing_cf() -> BillingError {
    BillingError::InternalError(Box::new(std::io::Error::other(
        "Subscriptions column family not found",
    )))
}

#[async_trait]
impl SubscriptionStore for RocksDBStore {
    async fn store(&self, subscription: Subscription) -> Result<()> {
        let cf = self.db.cf_handle(CF_SUBSCRIPTIONS).ok_or_else(missing_cf)?;

        let key = Self::key(&subscription.user, &subscription.tier);
        let value = serde_json::to_vec(&subscription).map_err(|e| {
            BillingError::InternalError(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Serialization error: {}", e),
            )))
        })?;

        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    async fn get(&self, user: &UserId, tier: &TierId) -> Result<Option<Subscription>> {
        let cf = self.db.cf_handle(CF_SUBSCRIPTIONS).ok_or_else(missing_cf)?;

        match self.db.get_cf(&cf, Self::key(user, tier))? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<Subscription>> {
        let cf = self.db.cf_handle(CF_SUBSCRIPTIONS).ok_or_else(missing_cf)?;

        let mut subscriptions = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            subscriptions.push(Self::decode(&value)?);
        }
        Ok(subscriptions)
    }
}
