use crate::domain::ids::{PaymentMethodId, TierId, UserId};
use crate::error::{BillingError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Subscribe,
    Cancel,
    Resume,
}

/// One row of the checkout input: `action, user, tier, payment_method`.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct CheckoutCommand {
    pub action: CommandType,
    pub user: UserId,
    pub tier: TierId,
    /// Required for `subscribe`, ignored otherwise.
    pub payment_method: Option<PaymentMethodId>,
}

/// Reads checkout commands from a CSV source.
///
/// Whitespace around fields is trimmed and the trailing `payment_method`
/// column may be omitted entirely.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes commands; a bad row yields an error and reading
    /// continues with the next one.
    pub fn commands(self) -> impl Iterator<Item = Result<CheckoutCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BillingError::from))
    }
}
