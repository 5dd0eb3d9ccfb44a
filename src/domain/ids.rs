use crate::error::BillingError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares an opaque, non-empty string identifier.
///
/// Validation runs on construction and on deserialization, so an empty CSV
/// field or JSON string never produces a usable id.
macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, BillingError> {
                let value = value.into();
                if value.trim().is_empty() {
                    Err(BillingError::ValidationError(format!(
                        "{} must not be empty",
                        $label
                    )))
                } else {
                    Ok(Self(value))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = BillingError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = BillingError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a consumer account.
    UserId,
    "user id"
);

opaque_id!(
    /// Identifier of a priced subscription plan.
    TierId,
    "tier id"
);

opaque_id!(
    /// Reference to an instrument stored at the payment processor.
    ///
    /// Immutable once created; the processor owns the card details.
    PaymentMethodId,
    "payment method id"
);
