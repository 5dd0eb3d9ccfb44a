use crate::domain::ids::{TierId, UserId};
use crate::domain::ports::SubscriptionStore;
use crate::domain::subscription::Subscription;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for subscriptions.
///
/// Keyed by `(user, tier)`: a consumer holds at most one subscription per tier.
/// Clones share the same map.
#[derive(Default, Clone)]
pub struct InMemorySubscriptionStore {
    subscriptions: Arc<RwLock<HashMap<(UserId, TierId), Subscription>>>,
}

impl InMemorySubscriptionStore {
    /// Creates a new, empty in-memory subscription store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn store(&self, subscription: Subscription) -> Result<()> {
        let mut subscriptions = self.subscriptions.write().await;
        let key = (subscription.user.clone(), subscription.tier.clone());
        subscriptions.insert(key, subscription);
        Ok(())
    }

    async fn get(&self, user: &UserId, tier: &TierId) -> Result<Option<Subscription>> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions.get(&(user.clone(), tier.clone())).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Subscription>> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions.values().cloned().collect())
    }
}
