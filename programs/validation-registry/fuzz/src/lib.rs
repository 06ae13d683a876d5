//! Property-based fuzz testing library for the Validation Registry
//!
//! Drives the program's consensus, settlement, stake and withdrawal helpers
//! through an in-memory registry and checks value conservation and state
//! machine invariants after every step.
//!
//! # Usage
//!
//! ```bash
//! # Run all property-based tests
//! cargo test --release
//!
//! # Run the fuzz test runner
//! cargo run --release
//!
//! # Run with more iterations
//! PROPTEST_CASES=10000 cargo test --release
//! ```

pub mod arbitrary;
pub mod invariants;
pub mod scenarios;

pub use arbitrary::*;
pub use invariants::*;
pub use scenarios::*;

// Include fuzz targets as test modules
#[cfg(test)]
#[path = "../fuzz_targets/consensus.rs"]
mod consensus_tests;

#[cfg(test)]
#[path = "../fuzz_targets/settlement.rs"]
mod settlement_tests;

#[cfg(test)]
#[path = "../fuzz_targets/request_lifecycle.rs"]
mod request_lifecycle_tests;

#[cfg(test)]
#[path = "../fuzz_targets/withdrawal.rs"]
mod withdrawal_tests;
