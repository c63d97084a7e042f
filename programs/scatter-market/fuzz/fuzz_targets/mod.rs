//! Fuzz target modules
//!
//! Each module contains property-based tests for one instruction family.
//! Run all tests with: cargo test --release -p scatter-market-fuzz

pub mod accept_hold;
pub mod bid_placement;
pub mod defense;
pub mod lifecycle;
pub mod pin_challenge;
pub mod validation;
pub mod withdraw;
