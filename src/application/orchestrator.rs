use crate::domain::ids::{PaymentMethodId, TierId};
use crate::domain::intent::{
    IntentRequest, IntentState, PaymentIntentResult, PaymentIntentStatus, SettledCharge,
};
use crate::domain::ports::{GatewayHandle, Notification, NotifierHandle};
use tracing::{error, info, instrument, warn};

pub const PAYMENT_SUCCEEDED: &str = "Payment successful";
pub const PAYMENT_ERROR: &str = "Error processing payment";

/// Terminal result of one payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The processor reported SUCCEEDED, immediately or after confirmation.
    Succeeded(SettledCharge),
    /// Confirmation was required and did not end in `succeeded`. The intent
    /// was cancelled.
    ConfirmationFailed,
    /// The processor asked for a fresh attempt; nothing was charged.
    RetryRequested,
    /// Terminal business rejection.
    Declined,
    /// The gateway could not be reached or misbehaved.
    Errored,
    /// The request was invalid before any gateway call.
    Rejected,
}

impl PaymentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Whether the caller may safely start over with the same selection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryRequested | Self::Errored)
    }

    pub fn settled_charge(&self) -> Option<&SettledCharge> {
        match self {
            Self::Succeeded(charge) => Some(charge),
            _ => None,
        }
    }
}

/// Drives the payment processor from "create intent" to one terminal outcome.
///
/// Per attempt it makes exactly one create call, at most one confirm call and
/// at most one cancel call. Every failure is reported through the notifier
/// exactly once; nothing is returned as an error.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    gateway: GatewayHandle,
    notifier: NotifierHandle,
}

impl PaymentOrchestrator {
    pub fn new(gateway: GatewayHandle, notifier: NotifierHandle) -> Self {
        Self { gateway, notifier }
    }

    /// Charges `payment_method_id` for `tier_id`; `true` only on a settled charge.
    pub async fn attempt_payment(&self, tier_id: &str, payment_method_id: &str) -> bool {
        let (tier_id, payment_method_id) =
            match (TierId::new(tier_id), PaymentMethodId::new(payment_method_id)) {
                (Ok(tier), Ok(method)) => (tier, method),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "rejecting payment attempt");
                    self.notifier.notify(Notification::error(e.to_string()));
                    return false;
                }
            };

        self.attempt(&IntentRequest::new(payment_method_id, tier_id))
            .await
            .is_success()
    }

    #[instrument(
        skip(self, request),
        fields(tier = %request.tier_id, payment_method = %request.payment_method_id)
    )]
    pub async fn attempt(&self, request: &IntentRequest) -> PaymentOutcome {
        let result = match self.gateway.create_payment_intent(request).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "create payment intent failed");
                self.notifier.notify(Notification::error(PAYMENT_ERROR));
                return PaymentOutcome::Errored;
            }
        };

        if result.success {
            info!("payment succeeded");
            return self.settle(request, result.data.payment_intent_id);
        }

        self.notifier.notify(Notification::error(result.message.clone()));

        match result.status {
            PaymentIntentStatus::ConfirmationRequired => {
                self.confirm_or_cancel(request, result).await
            }
            PaymentIntentStatus::RetryPayment => {
                info!(message = %result.message, "processor asked for a new attempt");
                PaymentOutcome::RetryRequested
            }
            PaymentIntentStatus::Failed => {
                info!(message = %result.message, "payment declined");
                PaymentOutcome::Declined
            }
            PaymentIntentStatus::Succeeded => {
                warn!("processor reported SUCCEEDED with success=false, treating as declined");
                PaymentOutcome::Declined
            }
        }
    }

    async fn confirm_or_cancel(
        &self,
        request: &IntentRequest,
        result: PaymentIntentResult,
    ) -> PaymentOutcome {
        let fallback_id = result.data.payment_intent_id;

        let Some(secret) = result.data.client_secret else {
            warn!("confirmation required but no client secret was returned");
            self.cancel(fallback_id.as_deref()).await;
            return PaymentOutcome::ConfirmationFailed;
        };

        match self.gateway.confirm_card_payment(&secret).await {
            Ok(confirmation) if confirmation.payment_intent.status == IntentState::Succeeded => {
                info!("payment confirmed");
                let id = confirmation.payment_intent.id.or(fallback_id);
                self.settle(request, id)
            }
            Ok(confirmation) => {
                let intent = confirmation.payment_intent;
                info!(status = %intent.status, "confirmation did not succeed");
                self.cancel(intent.id.as_deref().or(fallback_id.as_deref()))
                    .await;
                PaymentOutcome::ConfirmationFailed
            }
            Err(e) => {
                error!(error = %e, "confirm card payment failed");
                self.cancel(fallback_id.as_deref()).await;
                PaymentOutcome::ConfirmationFailed
            }
        }
    }

    fn settle(&self, request: &IntentRequest, payment_intent_id: Option<String>) -> PaymentOutcome {
        self.notifier.notify(Notification::success(PAYMENT_SUCCEEDED));
        PaymentOutcome::Succeeded(SettledCharge::new(request, payment_intent_id))
    }

    /// Best-effort; the intent expires on the processor side if this fails.
    async fn cancel(&self, payment_intent_id: Option<&str>) {
        let id = payment_intent_id.unwrap_or_default();
        if let Err(e) = self.gateway.cancel_payment_intent(id).await {
            warn!(error = %e, payment_intent = id, "cancel payment intent failed");
        }
    }
}
