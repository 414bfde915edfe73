//! # Adapters
//!
//! Outbound port implementations: an in-memory ledger platform with
//! per-node vaults, and the connection liveness monitor its nodes use.

pub mod in_memory;
pub mod liveness;

pub use in_memory::{InMemoryLedger, InMemoryNetwork, InMemoryNode};
pub use liveness::ConnectionMonitor;
