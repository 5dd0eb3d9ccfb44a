//! Adapters for the domain ports: stores, the sandbox gateway and notifiers.

pub mod in_memory;
pub mod notifier;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod scripted_gateway;
