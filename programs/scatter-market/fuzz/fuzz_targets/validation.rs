//! Fuzz target for validate and invalidate
//!
//! Checks that:
//! - Sway always equals true votes minus false votes
//! - Only the first quorum voters are paid, each an equal pool share
//! - The hoster is paid once, at the vote that first satisfies the bid
//! - A validator votes at most once per bid
//! - Final sway does not depend on vote order
//!
//! Run with: cargo test --release -p scatter-market-fuzz validation

use crate::*;
use proptest::prelude::*;
use scatter_market::outcome::{reason, Outcome};
use scatter_market::state::BidStatus;

const HOSTER: u8 = 20;
const FIRST_VALIDATOR: u8 = 40;

fn pinned_validation_bid(sim: &mut SimulatedMarket, price: u64, pool: u64, quorum: u16) -> u64 {
    let bid_id = must_place(sim, actor(10), validation_terms(SCENARIO_HASH, price, pool, quorum))
        .expect("valid bid");
    sim.accept(bid_id, actor(HOSTER)).expect("accept");
    sim.pin(bid_id, actor(HOSTER)).expect("pin");
    bid_id
}

fn final_sway(votes: &[bool]) -> i64 {
    let mut sim = SimulatedMarket::default();
    let bid_id = pinned_validation_bid(&mut sim, ONE_SOL, 0, 3);
    for (i, verdict) in votes.iter().enumerate() {
        sim.validate(bid_id, actor(FIRST_VALIDATOR + i as u8), *verdict)
            .expect("distinct validators");
    }
    sim.bid(bid_id).map(|b| b.validation_sway()).unwrap_or_default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Fuzz a sequence of validations from distinct validators
    #[test]
    fn fuzz_validation_sequence(input in any::<ValidationInput>()) {
        let mut sim = SimulatedMarket::default();
        let pool = input.share * u64::from(input.quorum);
        let bid_id = pinned_validation_bid(&mut sim, input.price, pool, input.quorum);

        let mut sway = 0i64;
        let mut settlements = 0;
        for (i, verdict) in input.votes.iter().enumerate() {
            let validator = actor(FIRST_VALIDATOR + i as u8);
            let result = sim.step(|s| s.validate(bid_id, validator, *verdict));
            prop_assert!(result.is_success(), "vote {}: {:?}\nInput: {:?}", i, result, input);

            sway += if *verdict { 1 } else { -1 };
            let bid = sim.bid(bid_id).expect("bid stored");
            prop_assert_eq!(bid.validation_sway(), sway);
            prop_assert_eq!(usize::from(bid.validation_count), i + 1);

            if let Some(Outcome::Validated { payment, satisfied_now, .. }) = result.outcome() {
                let expected = if i < usize::from(input.quorum) { input.share } else { 0 };
                prop_assert_eq!(*payment, expected);
                prop_assert_eq!(
                    check_satisfaction(bid.validation_count, input.quorum, sway, *satisfied_now),
                    BidInvariantResult::Valid
                );
                if *satisfied_now {
                    settlements += 1;
                    prop_assert_eq!(bid.status, BidStatus::Satisfied);
                }
            } else {
                prop_assert!(false, "unexpected outcome {:?}", result);
            }
        }
        prop_assert!(settlements <= 1);

        let paid_votes = input.votes.len().min(usize::from(input.quorum)) as u64;
        let validators_owed: u64 = (0..input.votes.len())
            .map(|i| sim.owed(&actor(FIRST_VALIDATOR + i as u8)))
            .sum();
        prop_assert_eq!(validators_owed, input.share * paid_votes);
        prop_assert_eq!(sim.owed(&actor(HOSTER)), if settlements == 1 { input.price } else { 0 });

        // Replays are soft rejections and change nothing
        for r in input.replays.iter().filter(|r| **r < input.votes.len()) {
            let before = sim.bid(bid_id).cloned().expect("bid stored");
            let result = sim.step(|s| s.validate(bid_id, actor(FIRST_VALIDATOR + *r as u8), true));
            prop_assert_eq!(
                result.outcome(),
                Some(&Outcome::ValidationRejected {
                    bid_id,
                    reason: reason::DUPLICATE_VALIDATION,
                })
            );
            let after = sim.bid(bid_id).expect("bid stored");
            prop_assert_eq!(after.validation_count, before.validation_count);
            prop_assert_eq!(after.validation_sway(), before.validation_sway());
        }
    }

    /// Sway is order-independent
    #[test]
    fn fuzz_vote_order(votes in prop::collection::vec(any::<bool>(), 0..16)) {
        let mut reversed = votes.clone();
        reversed.reverse();
        let expected =
            votes.iter().filter(|v| **v).count() as i64 - votes.iter().filter(|v| !**v).count() as i64;
        prop_assert_eq!(final_sway(&votes), expected);
        prop_assert_eq!(final_sway(&reversed), expected);
    }
}

#[cfg(test)]
mod edge_cases {
    use super::*;

    #[test]
    fn test_bidder_cannot_validate() {
        let mut sim = SimulatedMarket::default();
        let bid_id = pinned_validation_bid(&mut sim, ONE_SOL, 0, 3);
        assert!(sim.validate(bid_id, actor(10), true).is_err());
        assert_eq!(sim.bid(bid_id).unwrap().validation_count, 0);
    }

    #[test]
    fn test_hoster_cannot_validate() {
        let mut sim = SimulatedMarket::default();
        let bid_id = pinned_validation_bid(&mut sim, ONE_SOL, 0, 3);
        assert!(sim.validate(bid_id, actor(HOSTER), true).is_err());
    }

    #[test]
    fn test_unpinned_bid_cannot_be_validated() {
        let mut sim = SimulatedMarket::default();
        let bid_id = must_place(&mut sim, actor(10), validation_terms(SCENARIO_HASH, ONE_SOL, 0, 3)).unwrap();
        sim.accept(bid_id, actor(HOSTER)).unwrap();
        assert!(sim.validate(bid_id, actor(FIRST_VALIDATOR), true).is_err());
    }

    #[test]
    fn test_tie_at_quorum_is_not_satisfied() {
        let mut sim = SimulatedMarket::default();
        let bid_id = pinned_validation_bid(&mut sim, ONE_SOL, 0, 2);
        sim.validate(bid_id, actor(40), true).unwrap();
        sim.validate(bid_id, actor(41), false).unwrap();
        let bid = sim.bid(bid_id).unwrap();
        assert!(!bid.satisfied());
        assert_eq!(bid.status, BidStatus::Pinned);

        let outcome = sim.validate(bid_id, actor(42), true).unwrap();
        assert_eq!(
            outcome,
            Outcome::Validated {
                bid_id,
                is_valid: true,
                sway: 1,
                payment: 0,
                satisfied_now: true
            }
        );
        assert_eq!(sim.owed(&actor(HOSTER)), ONE_SOL);
    }

    #[test]
    fn test_four_validator_quorum() {
        let report = scenario_validation_quorum().unwrap();
        assert_eq!(report.sway, 2);
        assert!(report.satisfied);
        assert_eq!(report.validator_owed, vec![25_000_000; 4]);
    }

    #[test]
    fn test_pinner_count_bid_rejects_validation() {
        let mut sim = SimulatedMarket::default();
        let pinners = [SimulatedPinner::new(1), SimulatedPinner::new(2)];
        let bid_id = challenged_bid(&mut sim, actor(10), SCENARIO_HASH, 1_000, &pinners, 10).unwrap();
        assert!(sim.validate(bid_id, actor(40), true).is_err());
    }
}
