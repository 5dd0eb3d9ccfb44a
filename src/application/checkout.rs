use super::orchestrator::{PaymentOrchestrator, PaymentOutcome};
use crate::config::CheckoutConfig;
use crate::domain::ids::{PaymentMethodId, TierId, UserId};
use crate::domain::intent::IntentRequest;
use crate::domain::ports::SubscriptionStoreBox;
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::domain::tier::TierCatalog;
use crate::error::{BillingError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, instrument, warn};
use uuid::Uuid;

type Slot = (UserId, TierId);

/// What a subscribe call ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Charged and written to the store.
    Activated(Subscription),
    /// Charged, but the store rejected every write. The activation is parked
    /// until [`CheckoutService::reconcile`] succeeds.
    ActivationPending { activation_key: String },
    /// No settled charge; the store was not touched.
    NotCharged(PaymentOutcome),
    /// The consumer already has access to the tier.
    AlreadySubscribed,
    /// Another attempt for the same user and tier is still running.
    AlreadyInProgress,
}

impl CheckoutOutcome {
    pub fn is_charged(&self) -> bool {
        matches!(self, Self::Activated(_) | Self::ActivationPending { .. })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Settled renewal charges, including those whose write was parked.
    pub renewed: usize,
    pub cancelled: usize,
    pub past_due: usize,
    /// Due subscriptions left alone because a checkout was in flight or a
    /// settled renewal is still parked.
    pub skipped: usize,
    /// Due subscriptions whose new state could not be read or written. No
    /// charge was lost; they are due again on the next cycle.
    pub failed: usize,
}

/// How one due subscription was settled.
enum Settled {
    Cancelled,
    Renewed,
    PastDue,
}

/// Holds a `(user, tier)` slot until dropped.
struct InFlight<'a> {
    slots: &'a Mutex<HashSet<Slot>>,
    slot: Slot,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.slots).remove(&self.slot);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Caller of the payment orchestrator that owns subscription state.
///
/// Every change to a `(user, tier)` pair, whether a payment attempt, a
/// cancel or resume, a cycle step or a reconcile write, happens while holding
/// that pair's slot. Each attempt is tagged with a fresh idempotency key, and
/// a subscription is only written as active after the orchestrator returned a
/// settled charge.
pub struct CheckoutService {
    orchestrator: PaymentOrchestrator,
    subscriptions: SubscriptionStoreBox,
    catalog: TierCatalog,
    config: CheckoutConfig,
    in_flight: Mutex<HashSet<Slot>>,
    parked: Mutex<Vec<Subscription>>,
}

impl CheckoutService {
    pub fn new(
        orchestrator: PaymentOrchestrator,
        subscriptions: SubscriptionStoreBox,
        catalog: TierCatalog,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            orchestrator,
            subscriptions,
            catalog,
            config,
            in_flight: Mutex::new(HashSet::new()),
            parked: Mutex::new(Vec::new()),
        }
    }

    #[instrument(skip_all, fields(user = %user, tier = %tier))]
    pub async fn subscribe(
        &self,
        user: UserId,
        tier: TierId,
        payment_method: PaymentMethodId,
    ) -> Result<CheckoutOutcome> {
        let price = self
            .catalog
            .get(&tier)
            .ok_or_else(|| BillingError::UnknownTier(tier.to_string()))?
            .price;

        let Some(_slot) = self.claim(&user, &tier) else {
            warn!("payment attempt already in flight");
            return Ok(CheckoutOutcome::AlreadyInProgress);
        };

        if self.is_parked(&user, &tier) {
            return Ok(CheckoutOutcome::AlreadySubscribed);
        }
        if let Some(existing) = self.subscriptions.get(&user, &tier).await?
            && existing.status.is_live()
        {
            return Ok(CheckoutOutcome::AlreadySubscribed);
        }

        let idempotency_key = format!("{}:{}:{}", user, tier, Uuid::new_v4());
        let request =
            IntentRequest::new(payment_method, tier).with_idempotency_key(&idempotency_key);

        let charge = match self.orchestrator.attempt(&request).await {
            PaymentOutcome::Succeeded(charge) => charge,
            outcome => return Ok(CheckoutOutcome::NotCharged(outcome)),
        };

        let activation_key = charge
            .payment_intent_id()
            .unwrap_or(idempotency_key.as_str())
            .to_string();
        let subscription = Subscription::activate(
            user,
            &charge,
            price,
            activation_key.clone(),
            Utc::now() + self.config.billing_period,
        );

        if self.write_activation(&subscription).await {
            info!(activation_key = %activation_key, "subscription activated");
            Ok(CheckoutOutcome::Activated(subscription))
        } else {
            self.park(subscription);
            Ok(CheckoutOutcome::ActivationPending { activation_key })
        }
    }

    /// Writes parked activations again. Returns how many made it to the store.
    ///
    /// Pairs with a checkout in flight are left parked for the next call.
    pub async fn reconcile(&self) -> usize {
        let parked = lock(&self.parked).clone();
        let mut written = 0;

        for subscription in parked {
            let Some(_slot) = self.claim(&subscription.user, &subscription.tier) else {
                continue;
            };
            match self.apply_activation(&subscription).await {
                Ok(()) => {
                    lock(&self.parked)
                        .retain(|entry| entry.activation_key != subscription.activation_key);
                    written += 1;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        activation_key = %subscription.activation_key,
                        "activation still failing"
                    );
                }
            }
        }

        written
    }

    pub fn pending_activations(&self) -> usize {
        lock(&self.parked).len()
    }

    pub async fn request_cancellation(&self, user: &UserId, tier: &TierId) -> Result<Subscription> {
        self.update(user, tier, Subscription::request_cancellation).await
    }

    pub async fn resume(&self, user: &UserId, tier: &TierId) -> Result<Subscription> {
        self.update(user, tier, Subscription::resume).await
    }

    /// Settles every subscription whose period ended at or before `now`.
    ///
    /// Pending cancellations end; active and past-due subscriptions are charged
    /// again with their stored payment method. A failure on one subscription
    /// is logged and counted, and the cycle moves on to the next.
    #[instrument(skip(self))]
    pub async fn run_billing_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        for snapshot in self.subscriptions().await? {
            if !snapshot.is_due(now) {
                continue;
            }
            let (user, tier) = (&snapshot.user, &snapshot.tier);
            let Some(_slot) = self.claim(user, tier) else {
                report.skipped += 1;
                continue;
            };
            if self.is_parked(user, tier) {
                report.skipped += 1;
                continue;
            }

            // The snapshot may predate a cancel or resume; act on the stored record.
            let subscription = match self.subscriptions.get(user, tier).await {
                Ok(Some(current)) if current.is_due(now) => current,
                Ok(_) => continue,
                Err(e) => {
                    warn!(error = %e, %user, %tier, "cannot read due subscription");
                    report.failed += 1;
                    continue;
                }
            };

            match self.settle_due(subscription, now).await {
                Ok(Settled::Cancelled) => report.cancelled += 1,
                Ok(Settled::Renewed) => report.renewed += 1,
                Ok(Settled::PastDue) => report.past_due += 1,
                Err(e) => {
                    warn!(error = %e, %user, %tier, "billing step failed");
                    report.failed += 1;
                }
            }
        }

        info!(?report, "billing cycle finished");
        Ok(report)
    }

    /// All subscriptions ordered by user, then tier.
    pub async fn subscriptions(&self) -> Result<Vec<Subscription>> {
        let mut subscriptions = self.subscriptions.get_all().await?;
        subscriptions.sort_by(|a, b| (&a.user, &a.tier).cmp(&(&b.user, &b.tier)));
        Ok(subscriptions)
    }

    /// Caller holds the slot.
    async fn settle_due(
        &self,
        mut subscription: Subscription,
        now: DateTime<Utc>,
    ) -> Result<Settled> {
        if subscription.status == SubscriptionStatus::PendingCancellation {
            subscription.cancel();
            self.subscriptions.store(subscription).await?;
            return Ok(Settled::Cancelled);
        }

        // Stable for a given period and run time, so re-running a crashed
        // cycle replays the same intent.
        let idempotency_key = format!(
            "{}:{}:renewal:{}:{}",
            subscription.user,
            subscription.tier,
            subscription.current_period_end.timestamp(),
            now.timestamp()
        );
        let request =
            IntentRequest::new(subscription.payment_method.clone(), subscription.tier.clone())
                .with_idempotency_key(&idempotency_key);

        match self.orchestrator.attempt(&request).await {
            PaymentOutcome::Succeeded(charge) => {
                let activation_key = charge
                    .payment_intent_id()
                    .unwrap_or(idempotency_key.as_str())
                    .to_string();
                // Only ACTIVE and PAST_DUE reach this point, both renewable.
                subscription.renew(&charge, activation_key, now, self.config.billing_period)?;
                if !self.write_activation(&subscription).await {
                    self.park(subscription);
                }
                Ok(Settled::Renewed)
            }
            outcome => {
                info!(?outcome, user = %subscription.user, "renewal not charged");
                subscription.mark_past_due()?;
                self.subscriptions.store(subscription).await?;
                Ok(Settled::PastDue)
            }
        }
    }

    fn claim(&self, user: &UserId, tier: &TierId) -> Option<InFlight<'_>> {
        let slot = (user.clone(), tier.clone());
        if lock(&self.in_flight).insert(slot.clone()) {
            Some(InFlight {
                slots: &self.in_flight,
                slot,
            })
        } else {
            None
        }
    }

    fn is_parked(&self, user: &UserId, tier: &TierId) -> bool {
        lock(&self.parked)
            .iter()
            .any(|entry| &entry.user == user && &entry.tier == tier)
    }

    fn park(&self, subscription: Subscription) {
        warn!(
            activation_key = %subscription.activation_key,
            "charge settled but activation parked"
        );
        lock(&self.parked).push(subscription);
    }

    async fn update(
        &self,
        user: &UserId,
        tier: &TierId,
        change: impl FnOnce(&mut Subscription) -> Result<()>,
    ) -> Result<Subscription> {
        let Some(_slot) = self.claim(user, tier) else {
            return Err(BillingError::PaymentInProgress {
                user: user.to_string(),
                tier: tier.to_string(),
            });
        };

        let mut subscription = self.subscriptions.get(user, tier).await?.ok_or_else(|| {
            BillingError::SubscriptionNotFound {
                user: user.to_string(),
                tier: tier.to_string(),
            }
        })?;
        change(&mut subscription)?;
        self.subscriptions.store(subscription.clone()).await?;
        info!(user = %user, tier = %tier, status = %subscription.status, "subscription updated");
        Ok(subscription)
    }

    async fn write_activation(&self, subscription: &Subscription) -> bool {
        let attempts = self.config.activation_attempts.max(1);
        for attempt in 1..=attempts {
            match self.apply_activation(subscription).await {
                Ok(()) => return true,
                Err(e) => {
                    warn!(attempt, error = %e, "activation write failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.config.activation_backoff).await;
                    }
                }
            }
        }
        false
    }

    /// Idempotent on the activation key: a write that already landed is not
    /// repeated. A cancellation requested while the write was parked is kept.
    async fn apply_activation(&self, subscription: &Subscription) -> Result<()> {
        let mut subscription = subscription.clone();
        if let Some(current) = self
            .subscriptions
            .get(&subscription.user, &subscription.tier)
            .await?
        {
            if current.activation_key == subscription.activation_key {
                return Ok(());
            }
            if current.status == SubscriptionStatus::PendingCancellation
                && subscription.status == SubscriptionStatus::Active
            {
                subscription.request_cancellation()?;
            }
        }
        self.subscriptions.store(subscription).await
    }
}
