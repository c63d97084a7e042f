//! Fuzz target for withdraw and withdraw_bid
//!
//! Checks that:
//! - A balance is paid out once and only once
//! - Only the hoster of a settled bid may withdraw through the bid, and
//!   only that bid's price
//! - The vault always covers what the market owes
//!
//! Run with: cargo test --release -p scatter-market-fuzz withdraw

use crate::*;
use proptest::prelude::*;
use scatter_market::outcome::{reason, Outcome};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every validator and the hoster withdraw twice after a validation round
    #[test]
    fn fuzz_withdraw_once(input in any::<ValidationInput>()) {
        let mut sim = SimulatedMarket::default();
        let (bidder, hoster) = (actor(10), actor(20));
        let pool = input.share * u64::from(input.quorum);
        let bid_id = must_place(&mut sim, bidder, validation_terms(SCENARIO_HASH, input.price, pool, input.quorum))
            .expect("valid bid");
        sim.accept(bid_id, hoster).expect("accept");
        sim.pin(bid_id, hoster).expect("pin");

        let validators: Vec<_> = (0..input.votes.len()).map(|i| actor(40 + i as u8)).collect();
        for (validator, verdict) in validators.iter().zip(&input.votes) {
            sim.validate(bid_id, *validator, *verdict).expect("distinct validators");
        }

        for validator in &validators {
            let owed = sim.owed(validator);
            let first = sim.step(|s| s.withdraw(*validator));
            let expected = if owed > 0 {
                Outcome::Withdrawn { value: owed }
            } else {
                Outcome::WithdrawFailed { reason: reason::ZERO_BALANCE }
            };
            prop_assert_eq!(first.outcome(), Some(&expected), "{:?}", input);

            let second = sim.step(|s| s.withdraw(*validator));
            prop_assert_eq!(
                second.outcome(),
                Some(&Outcome::WithdrawFailed { reason: reason::ZERO_BALANCE })
            );
            prop_assert_eq!(sim.paid_out(validator), owed);
        }

        let settled = sim.bid(bid_id).expect("bid stored").settled;
        let result = sim.step(|s| s.withdraw_bid(bid_id, bidder));
        prop_assert_eq!(
            result.outcome(),
            Some(&Outcome::WithdrawFailed { reason: reason::INVALID_WITHDRAWER })
        );

        let result = sim.step(|s| s.withdraw_bid(bid_id, hoster));
        prop_assert!(!result.is_invariant_violation(), "{:?}", result);
        if settled {
            prop_assert_eq!(result.outcome(), Some(&Outcome::Withdrawn { value: input.price }));
            let again = sim.step(|s| s.withdraw_bid(bid_id, hoster));
            prop_assert_eq!(
                again.outcome(),
                Some(&Outcome::WithdrawFailed { reason: reason::ZERO_BALANCE })
            );
        } else {
            prop_assert_eq!(
                result.outcome(),
                Some(&Outcome::WithdrawFailed { reason: reason::NOT_SATISFIED })
            );
        }
        prop_assert_eq!(sim.market.total_owed, 0);
        prop_assert!(sim.check_invariants().is_ok());
    }
}
