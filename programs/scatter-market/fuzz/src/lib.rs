//! Property-based fuzz testing library for the Scatter storage market
//!
//! Drives the program's state-transition helpers through an in-memory
//! market and checks value conservation, bid state machine and stake
//! invariants after every step.
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
#[path = "../fuzz_targets/bid_placement.rs"]
mod bid_placement_tests;

#[cfg(test)]
#[path = "../fuzz_targets/accept_hold.rs"]
mod accept_hold_tests;

#[cfg(test)]
#[path = "../fuzz_targets/validation.rs"]
mod validation_tests;

#[cfg(test)]
#[path = "../fuzz_targets/pin_challenge.rs"]
mod pin_challenge_tests;

#[cfg(test)]
#[path = "../fuzz_targets/defense.rs"]
mod defense_tests;

#[cfg(test)]
#[path = "../fuzz_targets/withdraw.rs"]
mod withdraw_tests;

#[cfg(test)]
#[path = "../fuzz_targets/lifecycle.rs"]
mod lifecycle_tests;
