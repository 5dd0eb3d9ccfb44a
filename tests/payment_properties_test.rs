//! Call-count and notification guarantees of the orchestrator, checked over
//! every scripted gateway behaviour.

use std::sync::Arc;
use tierpay::application::orchestrator::PaymentOrchestrator;
use tierpay::infrastructure::notifier::RecordingNotifier;
use tierpay::infrastructure::scripted_gateway::{
    ConfirmBehavior, CreateBehavior, MethodScript, ScriptedGateway,
};

const CREATES: [CreateBehavior; 5] = [
    CreateBehavior::Succeed,
    CreateBehavior::RequireConfirmation,
    CreateBehavior::Retry,
    CreateBehavior::Fail,
    CreateBehavior::TransportError,
];

const CONFIRMS: [ConfirmBehavior; 4] = [
    ConfirmBehavior::Succeed,
    ConfirmBehavior::RequireAction,
    ConfirmBehavior::Decline,
    ConfirmBehavior::TransportError,
];

struct Observation {
    succeeded: bool,
    creates: usize,
    confirms: usize,
    cancels: usize,
    errors: usize,
    successes: usize,
}

async fn observe(script: MethodScript) -> Observation {
    let gateway = Arc::new(ScriptedGateway::new().with_script("pm1", script));
    let notifier = RecordingNotifier::new();
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), Arc::new(notifier.clone()));

    let succeeded = orchestrator.attempt_payment("t1", "pm1").await;
    Observation {
        succeeded,
        creates: gateway.create_calls(),
        confirms: gateway.confirm_calls(),
        cancels: gateway.cancelled_intents().len(),
        errors: notifier.errors().len(),
        successes: notifier.successes().len(),
    }
}

fn scripts() -> Vec<MethodScript> {
    let mut scripts = Vec::new();
    for create in CREATES {
        for confirm in CONFIRMS {
            for secret in [None, Some("sec_1")] {
                let mut script = MethodScript::new(create).confirm(confirm).intent_id("pi_1");
                if let Some(secret) = secret {
                    script = script.client_secret(secret);
                }
                scripts.push(script);
            }
        }
    }
    scripts
}

#[tokio::test]
async fn test_exactly_one_create_per_attempt() {
    for script in scripts() {
        let seen = observe(script.clone()).await;
        assert_eq!(seen.creates, 1, "{:?}", script);
    }
}

#[tokio::test]
async fn test_confirm_only_with_confirmation_and_secret() {
    for script in scripts() {
        let seen = observe(script.clone()).await;
        let expected = usize::from(
            script.create == CreateBehavior::RequireConfirmation && script.client_secret.is_some(),
        );
        assert_eq!(seen.confirms, expected, "{:?}", script);
    }
}

#[tokio::test]
async fn test_cancel_only_when_confirmation_did_not_succeed() {
    for script in scripts() {
        let seen = observe(script.clone()).await;
        let confirmed =
            script.client_secret.is_some() && script.confirm == ConfirmBehavior::Succeed;
        let expected =
            usize::from(script.create == CreateBehavior::RequireConfirmation && !confirmed);
        assert_eq!(seen.cancels, expected, "{:?}", script);
    }
}

#[tokio::test]
async fn test_every_failure_reports_exactly_one_error() {
    for script in scripts() {
        let seen = observe(script.clone()).await;
        if seen.succeeded {
            assert_eq!(seen.successes, 1, "{:?}", script);
        } else {
            assert_eq!(seen.errors, 1, "{:?}", script);
            assert_eq!(seen.successes, 0, "{:?}", script);
        }
    }
}

#[tokio::test]
async fn test_success_iff_effective_status_succeeded() {
    for script in scripts() {
        let seen = observe(script.clone()).await;
        let expected = match script.create {
            CreateBehavior::Succeed => true,
            CreateBehavior::RequireConfirmation => {
                script.client_secret.is_some() && script.confirm == ConfirmBehavior::Succeed
            }
            _ => false,
        };
        assert_eq!(seen.succeeded, expected, "{:?}", script);
    }
}
