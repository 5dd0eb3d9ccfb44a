//! Application layer containing the payment workflow orchestration.
//!
//! `PaymentOrchestrator` turns one gateway exchange into a terminal outcome;
//! `CheckoutService` is its caller and the only writer of subscription state.

pub mod checkout;
pub mod orchestrator;
