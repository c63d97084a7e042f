//! Fuzz target for accept and the hoster candidacy hold
//!
//! Checks that:
//! - A sitting candidate cannot be displaced before the hold elapses
//! - The reported availability time is accepted_at + hold
//! - Pinned bids refuse new candidates
//!
//! Run with: cargo test --release -p scatter-market-fuzz accept_hold

use crate::*;
use proptest::prelude::*;
use scatter_market::outcome::{reason, Outcome};
use scatter_market::state::BidStatus;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Second accept waits or displaces depending on elapsed time
    #[test]
    fn fuzz_accept_hold(input in any::<AcceptInput>()) {
        let mut sim = SimulatedMarket::new(input.first_at);
        sim.market.accept_hold_duration = input.hold;
        let bid_id = must_place(&mut sim, actor(10), validation_terms(SCENARIO_HASH, 1_000, 0, 3))
            .expect("valid bid");

        let first = actor(20);
        let second = if input.same_caller { first } else { actor(21) };

        let result = sim.step(|s| s.accept(bid_id, first));
        prop_assert_eq!(result.outcome(), Some(&Outcome::Accepted { bid_id, hoster: first }));

        sim.advance(input.second_after);
        let result = sim.step(|s| s.accept(bid_id, second));
        prop_assert!(!result.is_invariant_violation(), "{:?}\nInput: {:?}", result, input);

        let bid = sim.bid(bid_id).expect("bid stored");
        prop_assert_eq!(bid.status, BidStatus::Accepted);
        if input.second_after < input.hold {
            prop_assert_eq!(
                result.outcome(),
                Some(&Outcome::AcceptWait {
                    bid_id,
                    candidate: first,
                    available_at: input.first_at + input.hold,
                })
            );
            prop_assert_eq!(bid.hoster, first);
            prop_assert_eq!(bid.accepted_at, input.first_at);
        } else {
            prop_assert_eq!(result.outcome(), Some(&Outcome::Accepted { bid_id, hoster: second }));
            prop_assert_eq!(bid.hoster, second);
            prop_assert_eq!(bid.accepted_at, input.first_at + input.second_after);
        }
    }

    /// Accept never moves value
    #[test]
    fn fuzz_accept_moves_no_value(hosters in prop::collection::vec(20u8..30u8, 1..10)) {
        let mut sim = SimulatedMarket::default();
        let bid_id = must_place(&mut sim, actor(10), validation_terms(SCENARIO_HASH, ONE_SOL, 0, 3))
            .expect("valid bid");
        for hoster in hosters {
            let result = sim.step(|s| s.accept(bid_id, actor(hoster)));
            prop_assert!(result.is_success());
            prop_assert_eq!(sim.vault, ONE_SOL);
            prop_assert_eq!(sim.bid(bid_id).expect("bid stored").escrow_remaining, ONE_SOL);
            sim.advance(1_800);
        }
    }
}

#[cfg(test)]
mod edge_cases {
    use super::*;

    fn open_bid(sim: &mut SimulatedMarket) -> u64 {
        must_place(sim, actor(10), validation_terms(SCENARIO_HASH, ONE_SOL, 0, 3)).unwrap()
    }

    #[test]
    fn test_bidder_cannot_accept() {
        let mut sim = SimulatedMarket::default();
        let bid_id = open_bid(&mut sim);
        assert!(sim.accept(bid_id, actor(10)).is_err());
        assert_eq!(sim.bid(bid_id).unwrap().status, BidStatus::Open);
    }

    #[test]
    fn test_pinner_count_bid_cannot_be_accepted() {
        let mut sim = SimulatedMarket::default();
        let bid_id = must_place(&mut sim, actor(10), pinner_terms(SCENARIO_HASH, ONE_SOL, 2)).unwrap();
        assert!(sim.accept(bid_id, actor(20)).is_err());
    }

    #[test]
    fn test_unknown_bid_is_hard_failure() {
        let mut sim = SimulatedMarket::default();
        assert!(sim.accept(42, actor(20)).is_err());
    }

    #[test]
    fn test_accept_after_pin_rejected() {
        let mut sim = SimulatedMarket::default();
        let bid_id = open_bid(&mut sim);
        sim.accept(bid_id, actor(20)).unwrap();
        sim.pin(bid_id, actor(20)).unwrap();
        sim.advance(sim.market.accept_hold_duration);
        assert_eq!(
            sim.accept(bid_id, actor(21)).unwrap(),
            Outcome::AcceptRejected {
                bid_id,
                reason: reason::ALREADY_PINNED
            }
        );
        assert_eq!(sim.bid(bid_id).unwrap().hoster, actor(20));
    }

    #[test]
    fn test_other_hoster_cannot_pin_during_hold() {
        let mut sim = SimulatedMarket::default();
        let bid_id = open_bid(&mut sim);
        sim.accept(bid_id, actor(20)).unwrap();
        assert!(sim.pin(bid_id, actor(21)).is_err());

        sim.advance(sim.market.accept_hold_duration);
        assert_eq!(
            sim.pin(bid_id, actor(21)).unwrap(),
            Outcome::Pinned {
                bid_id,
                hoster: actor(21)
            }
        );
    }

    #[test]
    fn test_pin_without_accept() {
        let mut sim = SimulatedMarket::default();
        let bid_id = open_bid(&mut sim);
        assert_eq!(
            sim.pin(bid_id, actor(22)).unwrap(),
            Outcome::Pinned {
                bid_id,
                hoster: actor(22)
            }
        );
        assert_eq!(sim.bid(bid_id).unwrap().status, BidStatus::Pinned);
    }
}
