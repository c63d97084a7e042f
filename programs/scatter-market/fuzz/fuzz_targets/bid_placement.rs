//! Fuzz target for the bid instruction
//!
//! Checks that:
//! - The outcome always agrees with the terms checks
//! - A rejected bid leaves the ledger, market and vault untouched
//! - Accepted bids escrow exactly their value
//! - Ids are assigned from 1 and never reused
//!
//! Run with: cargo test --release -p scatter-market-fuzz bid_placement

use crate::*;
use proptest::prelude::*;
use scatter_market::instructions::bid_helpers::check_bid_terms;
use scatter_market::outcome::Outcome;
use scatter_market::state::BidStatus;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Fuzz bid placement with arbitrary terms
    #[test]
    fn fuzz_place_bid(input in any::<BidInput>()) {
        let mut sim = SimulatedMarket::default();
        let bidder = actor(10);
        if input.banned {
            sim.banned.insert(bidder);
        }
        let terms = input.terms();
        let value = input.value();
        let expected = check_bid_terms(&sim.market, &terms, value, input.banned);

        let result = sim.step(|s| s.place_bid(bidder, terms, value));
        prop_assert!(!result.is_invariant_violation(),
            "Invariant violation: {:?}\nInput: {:?}", result, input);

        match expected {
            Some(reason) => {
                prop_assert_eq!(result.outcome(), Some(&Outcome::BidInvalid { reason }));
                prop_assert_eq!(sim.bid_ledger.bid_count, 0);
                prop_assert_eq!(sim.market.total_escrowed, 0);
                prop_assert_eq!(sim.vault, 0);
                prop_assert!(sim.bids.is_empty());
            }
            None => {
                prop_assert_eq!(result.outcome(), Some(&Outcome::BidSuccessful { bid_id: 1 }));
                let bid = sim.bid(1).expect("bid stored");
                prop_assert_eq!(bid.status, BidStatus::Open);
                prop_assert_eq!(bid.escrow_remaining, value);
                prop_assert_eq!(sim.market.total_escrowed, value);
                prop_assert_eq!(sim.vault, value);
            }
        }
    }

    /// Interleaved valid and invalid bids receive consecutive ids
    #[test]
    fn fuzz_bid_ids_sequential(
        valid in prop::collection::vec(any::<bool>(), 1..20),
        price in 1u64..10 * ONE_SOL,
    ) {
        let mut sim = SimulatedMarket::default();
        let mut expected_id = 0u64;

        for (i, ok) in valid.iter().enumerate() {
            let mut hash = [0x5Au8; 32];
            hash[0] = i as u8;
            let terms = validation_terms(hash, price, 0, 3);
            let value = if *ok { price } else { price + 1 };

            let outcome = sim.place_bid(actor(10), terms, value).expect("soft failures commit");
            if *ok {
                expected_id += 1;
                prop_assert_eq!(outcome, Outcome::BidSuccessful { bid_id: expected_id });
            } else {
                prop_assert!(outcome.is_rejection());
            }
            prop_assert_eq!(sim.bid_ledger.bid_count, expected_id);
        }
        for id in sim.bids.keys() {
            prop_assert_eq!(check_bid_id(*id, sim.bid_ledger.bid_count), BidInvariantResult::Valid);
        }
        prop_assert_eq!(sim.bids.len() as u64, expected_id);
        prop_assert!(sim.check_invariants().is_ok());
    }
}

#[cfg(test)]
mod edge_cases {
    use super::*;
    use scatter_market::outcome::reason;
    use scatter_market::state::{Quorum, QuorumKind};

    #[test]
    fn test_default_quorum_is_validation() {
        let mut sim = SimulatedMarket::default();
        let terms = scatter_market::instructions::bid_helpers::BidTerms {
            quorum: None,
            ..validation_terms(SCENARIO_HASH, ONE_SOL, 0, 1)
        };
        assert_eq!(
            sim.place_bid(actor(10), terms, ONE_SOL).unwrap(),
            Outcome::BidSuccessful { bid_id: 1 }
        );
        let bid = sim.bid(1).unwrap();
        assert_eq!(bid.quorum_kind, QuorumKind::Validation);
        assert_eq!(bid.quorum_value, sim.market.default_min_validations);
    }

    #[test]
    fn test_banned_bidder_rejected() {
        let mut sim = SimulatedMarket::default();
        sim.banned.insert(actor(10));
        assert_eq!(
            sim.place_bid(actor(10), validation_terms(SCENARIO_HASH, ONE_SOL, 0, 3), ONE_SOL)
                .unwrap(),
            Outcome::BidInvalid {
                reason: reason::BIDDER_BANNED
            }
        );
        assert_eq!(sim.vault, 0);
    }

    #[test]
    fn test_pinner_bid_with_pool_rejected() {
        let mut sim = SimulatedMarket::default();
        let terms = scatter_market::instructions::bid_helpers::BidTerms {
            validation_pool: 10,
            quorum: Some(Quorum {
                kind: QuorumKind::PinnerCount,
                value: 2,
            }),
            ..validation_terms(SCENARIO_HASH, ONE_SOL, 0, 1)
        };
        assert_eq!(
            sim.place_bid(actor(10), terms, ONE_SOL + 10).unwrap(),
            Outcome::BidInvalid {
                reason: reason::POOL_NEEDS_VALIDATION
            }
        );
    }

    #[test]
    fn test_short_duration_rejected() {
        let mut sim = SimulatedMarket::default();
        let terms = scatter_market::instructions::bid_helpers::BidTerms {
            duration: sim.market.min_duration - 1,
            ..validation_terms(SCENARIO_HASH, ONE_SOL, 0, 3)
        };
        assert_eq!(
            sim.place_bid(actor(10), terms, ONE_SOL).unwrap(),
            Outcome::BidInvalid {
                reason: reason::BELOW_MIN_DURATION
            }
        );
    }
}
