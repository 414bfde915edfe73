//! # Business Network Benchmarks
//!
//! Times the "single member joins an existing network" scenario phase by
//! phase and fails the run when any phase exceeds a cutoff.
//!
//! ## Usage
//!
//! Run the scenario over the in-memory ledger:
//! ```bash
//! cargo run --package bn-benchmarks --bin bn-bench -- --participants 20
//! ```
//!
//! Criterion micro-benchmarks:
//! ```bash
//! cargo bench --package bn-benchmarks --bench membership_benchmarks
//! ```
//!
//! ## Phases
//!
//! | Phase | Measures |
//! |-------|----------|
//! | Membership Activation Time | authority activates the late joiner |
//! | Group Addition Time | late joiner added to the default group |
//! | Time taken to Run Suspend Membership Flow | authority suspends the late joiner |
//! | Time taken to Register Suspension In Vault | suspension reaches the joiner's vault |
//!
//! Setup phases (network creation, onboarding, default group, the joiner's
//! request) are reported alongside.

#![warn(missing_docs)]

pub mod harness;
pub mod report;

pub use harness::{BenchmarkHarness, HarnessConfig, HarnessError};
pub use report::{BenchmarkReport, Phase, PhaseTiming};
