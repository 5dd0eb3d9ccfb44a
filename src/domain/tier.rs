use super::ids::TierId;
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;

/// Price of a tier per billing period.
///
/// Currency-less; zero is allowed for free tiers, negatives are not.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub const FREE: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(BillingError::ValidationError(
                "Price must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = BillingError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// A priced plan attached to a published service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionTier {
    pub id: TierId,
    /// Name of the service the tier belongs to.
    pub service: String,
    pub price: Price,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Read-only lookup of the tiers consumers may subscribe to.
#[derive(Debug, Clone, Default)]
pub struct TierCatalog {
    tiers: HashMap<TierId, SubscriptionTier>,
}

impl TierCatalog {
    pub fn new(tiers: impl IntoIterator<Item = SubscriptionTier>) -> Result<Self> {
        let mut catalog = HashMap::new();
        for tier in tiers {
            let id = tier.id.clone();
            if catalog.insert(id.clone(), tier).is_some() {
                return Err(BillingError::ValidationError(format!(
                    "Duplicate tier id: {}",
                    id
                )));
            }
        }
        Ok(Self { tiers: catalog })
    }

    /// Loads a catalog from a JSON array of tiers.
    pub fn from_json<R: Read>(source: R) -> Result<Self> {
        let tiers: Vec<SubscriptionTier> = serde_json::from_reader(source)?;
        Self::new(tiers)
    }

    pub fn get(&self, id: &TierId) -> Option<&SubscriptionTier> {
        self.tiers.get(id)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}
