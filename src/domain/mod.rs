//! Domain types and the ports the application layer talks through.

pub mod ids;
pub mod intent;
pub mod ports;
pub mod subscription;
pub mod tier;
