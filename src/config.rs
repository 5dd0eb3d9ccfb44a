use std::time::Duration;
use tracing::warn;

pub const ENV_ACTIVATION_ATTEMPTS: &str = "TIERPAY_ACTIVATION_ATTEMPTS";
pub const ENV_ACTIVATION_BACKOFF_MS: &str = "TIERPAY_ACTIVATION_BACKOFF_MS";
pub const ENV_BILLING_PERIOD_DAYS: &str = "TIERPAY_BILLING_PERIOD_DAYS";

/// Tunables of the checkout service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// How many times a subscription write is tried after a settled charge.
    pub activation_attempts: u32,
    /// Pause between activation write attempts.
    pub activation_backoff: Duration,
    /// Length of one paid period.
    pub billing_period: chrono::Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            activation_attempts: 3,
            activation_backoff: Duration::from_millis(50),
            billing_period: chrono::Duration::days(30),
        }
    }
}

impl CheckoutConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. Missing or unparsable
    /// values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(key, value = %raw, "ignoring unparsable setting");
                    None
                }
            }
        };

        Self {
            activation_attempts: parse(ENV_ACTIVATION_ATTEMPTS)
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.activation_attempts),
            activation_backoff: parse(ENV_ACTIVATION_BACKOFF_MS)
                .map(Duration::from_millis)
                .unwrap_or(defaults.activation_backoff),
            billing_period: parse(ENV_BILLING_PERIOD_DAYS)
                .filter(|v| *v > 0)
                .and_then(|v| i64::try_from(v).ok())
                .map(chrono::Duration::days)
                .unwrap_or(defaults.billing_period),
        }
    }
}
