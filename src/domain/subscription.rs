use super::ids::{PaymentMethodId, TierId, UserId};
use super::intent::SettledCharge;
use super::tier::Price;
use crate::error::{BillingError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    PendingCancellation,
    Cancelled,
    PastDue,
}

impl SubscriptionStatus {
    /// Whether the consumer currently has access to the tier.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Active | Self::PendingCancellation)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "ACTIVE",
            Self::PendingCancellation => "PENDING_CANCELLATION",
            Self::Cancelled => "CANCELLED",
            Self::PastDue => "PAST_DUE",
        };
        f.write_str(name)
    }
}

/// A consumer's membership of a tier.
///
/// Created only from a [`SettledCharge`], so a subscription never becomes
/// `Active` without an observed successful payment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Subscription {
    pub user: UserId,
    pub tier: TierId,
    pub payment_method: PaymentMethodId,
    pub price: Price,
    pub status: SubscriptionStatus,
    /// Id of the charge that last activated or renewed this subscription.
    pub activation_key: String,
    pub current_period_end: DateTime<Utc>,
}

impl Subscription {
    pub fn activate(
        user: UserId,
        charge: &SettledCharge,
        price: Price,
        activation_key: impl Into<String>,
        period_end: DateTime<Utc>,
    ) -> Self {
        Self {
            user,
            tier: charge.tier_id().clone(),
            payment_method: charge.payment_method_id().clone(),
            price,
            status: SubscriptionStatus::Active,
            activation_key: activation_key.into(),
            current_period_end: period_end,
        }
    }

    /// Extends the period after a renewal charge settled.
    ///
    /// The new period starts at the later of the old period end and `now`, so a
    /// subscription that lapsed into `PastDue` does not get back-dated time.
    pub fn renew(
        &mut self,
        charge: &SettledCharge,
        activation_key: impl Into<String>,
        now: DateTime<Utc>,
        period: Duration,
    ) -> Result<()> {
        match self.status {
            SubscriptionStatus::Active | SubscriptionStatus::PastDue => {
                let start = self.current_period_end.max(now);
                self.current_period_end = start + period;
                self.payment_method = charge.payment_method_id().clone();
                self.activation_key = activation_key.into();
                self.status = SubscriptionStatus::Active;
                Ok(())
            }
            from => Err(BillingError::InvalidTransition {
                from,
                action: "renew",
            }),
        }
    }

    pub fn request_cancellation(&mut self) -> Result<()> {
        self.transition(
            SubscriptionStatus::Active,
            SubscriptionStatus::PendingCancellation,
            "cancel",
        )
    }

    pub fn resume(&mut self) -> Result<()> {
        self.transition(
            SubscriptionStatus::PendingCancellation,
            SubscriptionStatus::Active,
            "resume",
        )
    }

    pub fn mark_past_due(&mut self) -> Result<()> {
        match self.status {
            SubscriptionStatus::Active | SubscriptionStatus::PastDue => {
                self.status = SubscriptionStatus::PastDue;
                Ok(())
            }
            from => Err(BillingError::InvalidTransition {
                from,
                action: "mark past due",
            }),
        }
    }

    /// Ends the subscription. Cancelling twice is a no-op.
    pub fn cancel(&mut self) {
        self.status = SubscriptionStatus::Cancelled;
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status != SubscriptionStatus::Cancelled && self.current_period_end <= now
    }

    fn transition(
        &mut self,
        expected: SubscriptionStatus,
        next: SubscriptionStatus,
        action: &'static str,
    ) -> Result<()> {
        if self.status == expected {
            self.status = next;
            Ok(())
        } else {
            Err(BillingError::InvalidTransition {
                from: self.status,
                action,
            })
        }
    }
}
