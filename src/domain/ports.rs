use super::ids::{TierId, UserId};
use super::intent::{ConfirmationResult, IntentRequest, PaymentIntentResult};
use super::subscription::Subscription;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Remote payment processor.
///
/// Errors returned here are transport failures; business rejections come
/// back as a [`PaymentIntentResult`] with `success == false`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(&self, request: &IntentRequest) -> Result<PaymentIntentResult>;
    async fn confirm_card_payment(&self, client_secret: &str) -> Result<ConfirmationResult>;
    async fn cancel_payment_intent(&self, payment_intent_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A human-readable status message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Fire-and-forget sink for user-facing messages (toasts in a UI).
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn store(&self, subscription: Subscription) -> Result<()>;
    async fn get(&self, user: &UserId, tier: &TierId) -> Result<Option<Subscription>>;
    async fn get_all(&self) -> Result<Vec<Subscription>>;
}

pub type GatewayHandle = Arc<dyn PaymentGateway>;
pub type NotifierHandle = Arc<dyn Notifier>;
pub type SubscriptionStoreBox = Box<dyn SubscriptionStore>;
pub type SubscriptionStoreFactory = Box<dyn Fn() -> SubscriptionStoreBox + Send + Sync>;
