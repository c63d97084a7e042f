//! End-to-end market sessions
//!
//! Random operation sequences over a handful of actors, plus the fixed
//! walkthroughs used as acceptance checks.
//!
//! Run with: cargo test --release -p scatter-market-fuzz lifecycle

use crate::*;
use proptest::prelude::*;
use scatter_market::outcome::Outcome;
use scatter_market::state::BidStatus;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// No operation sequence breaks value conservation or bid invariants
    #[test]
    fn fuzz_market_session(ops in prop::collection::vec(any::<MarketOp>(), 1..64)) {
        let result = run_operations(&ops);
        prop_assert!(result.is_ok(), "{:?}", result);
    }
}
