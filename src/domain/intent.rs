use super::ids::{PaymentMethodId, TierId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Business status reported by the processor when an intent is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentIntentStatus {
    Succeeded,
    ConfirmationRequired,
    RetryPayment,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
}

/// Transient response of the "create payment intent" call. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentResult {
    pub success: bool,
    pub status: PaymentIntentStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: IntentData,
}

impl PaymentIntentResult {
    pub fn succeeded(payment_intent_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: PaymentIntentStatus::Succeeded,
            message: message.into(),
            data: IntentData {
                client_secret: None,
                payment_intent_id,
            },
        }
    }

    pub fn rejected(status: PaymentIntentStatus, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            message: message.into(),
            data: IntentData::default(),
        }
    }

    pub fn with_data(mut self, data: IntentData) -> Self {
        self.data = data;
        self
    }
}

/// Processor-side state of an intent after client-side confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentState {
    Succeeded,
    RequiresAction,
    RequiresPaymentMethod,
    Processing,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for IntentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntentState::Succeeded => "succeeded",
            IntentState::RequiresAction => "requires_action",
            IntentState::RequiresPaymentMethod => "requires_payment_method",
            IntentState::Processing => "processing",
            IntentState::Canceled => "canceled",
            IntentState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedIntent {
    pub status: IntentState,
    #[serde(default)]
    pub id: Option<String>,
}

/// Response of the client-side card confirmation primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    pub payment_intent: ConfirmedIntent,
}

/// Arguments of a single "create payment intent" call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    pub payment_method_id: PaymentMethodId,
    pub tier_id: TierId,
    /// Lets the processor collapse duplicate submissions into one intent.
    pub idempotency_key: Option<String>,
}

impl IntentRequest {
    pub fn new(payment_method_id: PaymentMethodId, tier_id: TierId) -> Self {
        Self {
            payment_method_id,
            tier_id,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Evidence that the processor reported an effective SUCCEEDED status for a
/// tier and payment method pair.
///
/// Only the orchestrator builds these, which keeps subscriptions from being
/// activated on anything but an observed successful charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledCharge {
    tier_id: TierId,
    payment_method_id: PaymentMethodId,
    payment_intent_id: Option<String>,
}

impl SettledCharge {
    pub(crate) fn new(request: &IntentRequest, payment_intent_id: Option<String>) -> Self {
        Self {
            tier_id: request.tier_id.clone(),
            payment_method_id: request.payment_method_id.clone(),
            payment_intent_id,
        }
    }

    pub fn tier_id(&self) -> &TierId {
        &self.tier_id
    }

    pub fn payment_method_id(&self) -> &PaymentMethodId {
        &self.payment_method_id
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent_id.as_deref()
    }
}
