#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;
use tierpay::application::checkout::CheckoutService;
use tierpay::application::orchestrator::PaymentOrchestrator;
use tierpay::config::CheckoutConfig;
use tierpay::domain::ids::{TierId, UserId};
use tierpay::domain::ports::{SubscriptionStore, SubscriptionStoreBox};
use tierpay::domain::subscription::Subscription;
use tierpay::domain::tier::{Price, SubscriptionTier, TierCatalog};
use tierpay::error::{BillingError, Result};
use tierpay::infrastructure::in_memory::InMemorySubscriptionStore;
use tierpay::infrastructure::notifier::RecordingNotifier;
use tierpay::infrastructure::scripted_gateway::ScriptedGateway;

pub const CATALOG_FIXTURE: &str = "tests/fixtures/catalog.json";
pub const GATEWAY_FIXTURE: &str = "tests/fixtures/gateway.json";

/// Writes a commands CSV (header included) to a temp file.
pub fn commands_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "action, user, tier, payment_method").unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file
}

pub fn catalog() -> TierCatalog {
    TierCatalog::new([
        SubscriptionTier {
            id: TierId::new("basic").unwrap(),
            service: "weather-api".to_string(),
            price: Price::new(dec!(4.99)).unwrap(),
            features: vec!["1k calls/day".to_string()],
        },
        SubscriptionTier {
            id: TierId::new("pro").unwrap(),
            service: "weather-api".to_string(),
            price: Price::new(dec!(19.90)).unwrap(),
            features: vec![],
        },
    ])
    .unwrap()
}

pub fn fast_config() -> CheckoutConfig {
    CheckoutConfig {
        activation_backoff: std::time::Duration::from_millis(1),
        ..CheckoutConfig::default()
    }
}

pub struct Harness {
    pub service: CheckoutService,
    pub gateway: Arc<ScriptedGateway>,
    pub notifier: RecordingNotifier,
}

pub fn harness(gateway: ScriptedGateway, store: SubscriptionStoreBox) -> Harness {
    let gateway = Arc::new(gateway);
    let notifier = RecordingNotifier::new();
    let orchestrator = PaymentOrchestrator::new(gateway.clone(), Arc::new(notifier.clone()));
    Harness {
        service: CheckoutService::new(orchestrator, store, catalog(), fast_config()),
        gateway,
        notifier,
    }
}

pub fn memory_harness(gateway: ScriptedGateway) -> Harness {
    harness(gateway, Box::new(InMemorySubscriptionStore::new()))
}

/// Store whose first `failures` writes fail; reads always succeed.
#[derive(Clone)]
pub struct FlakyStore {
    inner: InMemorySubscriptionStore,
    failures: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: InMemorySubscriptionStore::new(),
            failures: Arc::new(AtomicUsize::new(failures)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Fails the next `failures` writes.
    pub fn fail_next(&self, failures: usize) {
        self.failures.store(failures, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.failures.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriptionStore for FlakyStore {
    async fn store(&self, subscription: Subscription) -> Result<()> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BillingError::IoError(std::io::Error::other(
                "database unavailable",
            )));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.store(subscription).await
    }

    async fn get(&self, user: &UserId, tier: &TierId) -> Result<Option<Subscription>> {
        self.inner.get(user, tier).await
    }

    async fn get_all(&self) -> Result<Vec<Subscription>> {
        self.inner.get_all().await
    }
}
