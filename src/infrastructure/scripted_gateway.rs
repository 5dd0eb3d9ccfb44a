use crate::domain::intent::{
    ConfirmationResult, ConfirmedIntent, IntentData, IntentRequest, IntentState,
    PaymentIntentResult, PaymentIntentStatus,
};
use crate::domain::ports::PaymentGateway;
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateBehavior {
    #[default]
    Succeed,
    RequireConfirmation,
    Retry,
    Fail,
    TransportError,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmBehavior {
    #[default]
    Succeed,
    RequireAction,
    Decline,
    TransportError,
}

/// How the sandbox answers for one payment method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MethodScript {
    pub create: CreateBehavior,
    pub confirm: ConfirmBehavior,
    /// Returned with `require_confirmation`; leave unset to omit the secret.
    pub client_secret: Option<String>,
    pub intent_id: Option<String>,
    pub message: Option<String>,
    /// Simulated latency of the create call.
    pub delay_ms: u64,
}

impl MethodScript {
    pub fn new(create: CreateBehavior) -> Self {
        Self {
            create,
            ..Self::default()
        }
    }

    pub fn confirm(mut self, confirm: ConfirmBehavior) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn intent_id(mut self, id: impl Into<String>) -> Self {
        self.intent_id = Some(id.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// A call received by the sandbox, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Create {
        payment_method_id: String,
        tier_id: String,
        idempotency_key: Option<String>,
    },
    Confirm {
        client_secret: String,
    },
    Cancel {
        payment_intent_id: String,
    },
}

/// Sandbox payment processor driven by per-payment-method scripts.
///
/// Payment methods without a script always succeed. Creates that carry an
/// idempotency key already seen are answered with the first response.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    scripts: HashMap<String, MethodScript>,
    secrets: Mutex<HashMap<String, String>>,
    replays: Mutex<HashMap<String, PaymentIntentResult>>,
    calls: Mutex<Vec<GatewayCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads scripts from a JSON object keyed by payment method id.
    pub fn from_json<R: Read>(source: R) -> Result<Self> {
        let scripts: HashMap<String, MethodScript> = serde_json::from_reader(source)?;
        Ok(Self {
            scripts,
            ..Self::default()
        })
    }

    pub fn with_script(
        mut self,
        payment_method_id: impl Into<String>,
        script: MethodScript,
    ) -> Self {
        self.scripts.insert(payment_method_id.into(), script);
        self
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    pub fn create_calls(&self) -> usize {
        self.count(|call| matches!(call, GatewayCall::Create { .. }))
    }

    pub fn confirm_calls(&self) -> usize {
        self.count(|call| matches!(call, GatewayCall::Confirm { .. }))
    }

    pub fn cancelled_intents(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                GatewayCall::Cancel { payment_intent_id } => Some(payment_intent_id.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|call| predicate(call)).count()
    }

    fn replay(&self, idempotency_key: &str) -> Option<PaymentIntentResult> {
        lock(&self.replays).get(idempotency_key).cloned()
    }

    fn record(&self, call: GatewayCall) {
        lock(&self.calls).push(call);
    }

    fn respond(
        &self,
        script: &MethodScript,
        payment_method_id: &str,
    ) -> Result<PaymentIntentResult> {
        let message = |default: &str| script.message.clone().unwrap_or_else(|| default.to_string());
        let result = match script.create {
            CreateBehavior::Succeed => {
                let id = script
                    .intent_id
                    .clone()
                    .unwrap_or_else(|| format!("pi_{}", uuid::Uuid::new_v4().simple()));
                PaymentIntentResult::succeeded(Some(id), message("Payment succeeded"))
            }
            CreateBehavior::RequireConfirmation => {
                if let Some(secret) = &script.client_secret {
                    lock(&self.secrets).insert(secret.clone(), payment_method_id.to_string());
                }
                PaymentIntentResult::rejected(
                    PaymentIntentStatus::ConfirmationRequired,
                    message("Payment requires confirmation"),
                )
                .with_data(IntentData {
                    client_secret: script.client_secret.clone(),
                    payment_intent_id: script.intent_id.clone(),
                })
            }
            CreateBehavior::Retry => PaymentIntentResult::rejected(
                PaymentIntentStatus::RetryPayment,
                message("Payment could not be processed, please try again"),
            ),
            CreateBehavior::Fail => PaymentIntentResult::rejected(
                PaymentIntentStatus::Failed,
                message("Payment failed"),
            ),
            CreateBehavior::TransportError => {
                return Err(BillingError::GatewayError(format!(
                    "connection reset while charging {}",
                    payment_method_id
                )));
            }
        };
        Ok(result)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_payment_intent(&self, request: &IntentRequest) -> Result<PaymentIntentResult> {
        self.record(GatewayCall::Create {
            payment_method_id: request.payment_method_id.to_string(),
            tier_id: request.tier_id.to_string(),
            idempotency_key: request.idempotency_key.clone(),
        });

        if let Some(key) = &request.idempotency_key
            && let Some(previous) = self.replay(key)
        {
            debug!(idempotency_key = %key, "replaying earlier intent");
            return Ok(previous);
        }

        let script = self
            .scripts
            .get(request.payment_method_id.as_str())
            .cloned()
            .unwrap_or_default();
        if script.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(script.delay_ms)).await;
        }

        let result = self.respond(&script, request.payment_method_id.as_str())?;
        if let Some(key) = &request.idempotency_key {
            lock(&self.replays).insert(key.clone(), result.clone());
        }
        Ok(result)
    }

    async fn confirm_card_payment(&self, client_secret: &str) -> Result<ConfirmationResult> {
        self.record(GatewayCall::Confirm {
            client_secret: client_secret.to_string(),
        });

        let payment_method_id = lock(&self.secrets)
            .get(client_secret)
            .cloned()
            .ok_or_else(|| BillingError::GatewayError("unknown client secret".to_string()))?;
        let script = self
            .scripts
            .get(&payment_method_id)
            .cloned()
            .unwrap_or_default();

        let status = match script.confirm {
            ConfirmBehavior::Succeed => IntentState::Succeeded,
            ConfirmBehavior::RequireAction => IntentState::RequiresAction,
            ConfirmBehavior::Decline => IntentState::RequiresPaymentMethod,
            ConfirmBehavior::TransportError => {
                return Err(BillingError::GatewayError(
                    "confirmation request timed out".to_string(),
                ));
            }
        };
        Ok(ConfirmationResult {
            payment_intent: ConfirmedIntent {
                status,
                id: script.intent_id,
            },
        })
    }

    async fn cancel_payment_intent(&self, payment_intent_id: &str) -> Result<()> {
        self.record(GatewayCall::Cancel {
            payment_intent_id: payment_intent_id.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{PaymentMethodId, TierId};

    fn request(pm: &str) -> IntentRequest {
        IntentRequest::new(PaymentMethodId::new(pm).unwrap(), TierId::new("t1").unwrap())
    }

    #[tokio::test]
    async fn test_unscripted_method_succeeds() {
        let gateway = ScriptedGateway::new();
        let result = gateway.create_payment_intent(&request("pm_any")).await.unwrap();
        assert!(result.success);
        assert!(result.data.payment_intent_id.unwrap().starts_with("pi_"));
        assert_eq!(gateway.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_scripts_from_json() {
        let json = r#"{
            "pm_3ds": {"create": "require_confirmation", "client_secret": "sec_1", "confirm": "require_action", "intent_id": "pi_9"},
            "pm_down": {"create": "transport_error"}
        }"#;
        let gateway = ScriptedGateway::from_json(json.as_bytes()).unwrap();

        let result = gateway.create_payment_intent(&request("pm_3ds")).await.unwrap();
        assert_eq!(result.status, PaymentIntentStatus::ConfirmationRequired);
        assert_eq!(result.data.client_secret.as_deref(), Some("sec_1"));

        let confirmed = gateway.confirm_card_payment("sec_1").await.unwrap();
        assert_eq!(confirmed.payment_intent.status, IntentState::RequiresAction);
        assert_eq!(confirmed.payment_intent.id.as_deref(), Some("pi_9"));

        assert!(matches!(
            gateway.create_payment_intent(&request("pm_down")).await,
            Err(BillingError::GatewayError(_))
        ));
    }

    #[test]
    fn test_delay_saturates_instead_of_wrapping() {
        let script = MethodScript::new(CreateBehavior::Succeed).delay(Duration::MAX);
        assert_eq!(script.delay_ms, u64::MAX);

        let script = MethodScript::new(CreateBehavior::Succeed).delay(Duration::from_secs(2));
        assert_eq!(script.delay_ms, 2000);
    }

    #[tokio::test]
    async fn test_confirm_with_unknown_secret_fails() {
        let gateway = ScriptedGateway::new();
        assert!(gateway.confirm_card_payment("sec_missing").await.is_err());
        assert_eq!(gateway.confirm_calls(), 1);
    }

    #[tokio::test]
    async fn test_idempotency_key_replays_first_response() {
        let gateway = ScriptedGateway::new();
        let req = request("pm1").with_idempotency_key("u1:t1:abc");

        let first = gateway.create_payment_intent(&req).await.unwrap();
        let second = gateway.create_payment_intent(&req).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(gateway.create_calls(), 2);

        let fresh = gateway
            .create_payment_intent(&request("pm1").with_idempotency_key("u1:t1:def"))
            .await
            .unwrap();
        assert_ne!(first.data.payment_intent_id, fresh.data.payment_intent_id);
    }
}
