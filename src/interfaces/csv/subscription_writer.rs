use crate::domain::subscription::Subscription;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct SubscriptionRow<'a> {
    user: &'a str,
    tier: &'a str,
    status: String,
    price: String,
    payment_method: &'a str,
    activation_key: &'a str,
}

/// Writes the subscription table as CSV with a header row.
pub struct SubscriptionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SubscriptionWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_subscriptions(&mut self, subscriptions: &[Subscription]) -> Result<()> {
        if subscriptions.is_empty() {
            // serde-driven headers are only emitted with the first record
            self.writer.write_record([
                "user",
                "tier",
                "status",
                "price",
                "payment_method",
                "activation_key",
            ])?;
        }
        for subscription in subscriptions {
            self.writer.serialize(SubscriptionRow {
                user: subscription.user.as_str(),
                tier: subscription.tier.as_str(),
                status: subscription.status.to_string(),
                price: subscription.price.to_string(),
                payment_method: subscription.payment_method.as_str(),
                activation_key: &subscription.activation_key,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
