//! Fuzz target for defend and expire_challenge
//!
//! Checks that:
//! - A bid is satisfied only when every pinner defends validly in time
//! - Any failed or missing defense burns every stake on the bid (MAD)
//! - A failed bid refunds its whole escrow to the bidder
//! - Failure commits whatever stakes are supplied; the rest burn later
//! - Expiry needs a closed window
//!
//! Run with: cargo test --release -p scatter-market-fuzz defense

use crate::*;
use proptest::prelude::*;
use scatter_market::outcome::Outcome;
use scatter_market::state::BidStatus;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Fuzz a full challenge round with honest, dishonest and silent pinners
    #[test]
    fn fuzz_defense_round(input in any::<PinnerInput>()) {
        let report = run_defense_round(&input);
        prop_assert!(report.is_ok(), "{:?}\nInput: {:?}", report, input);
        let report = report.expect("checked above");

        let plans: Vec<&StakerPlan> = input
            .stakers
            .iter()
            .cycle()
            .take(usize::from(input.required))
            .collect();
        let dishonest = plans.iter().any(|p| p.defends && p.dishonest);
        let silent = plans.iter().any(|p| !p.defends);
        prop_assert_eq!(report.mad, dishonest || silent);

        if report.mad {
            prop_assert_eq!(report.status, BidStatus::Failed);
            prop_assert_eq!(report.burned, report.staked);
            prop_assert_eq!(report.remaining_stake, 0);
            prop_assert_eq!(report.bidder_owed, input.price);
        } else {
            prop_assert_eq!(report.status, BidStatus::Satisfied);
            prop_assert_eq!(report.burned, 0);
            prop_assert_eq!(report.remaining_stake, report.staked);
            prop_assert_eq!(report.bidder_owed, 0);
            prop_assert_eq!(report.defenses_recorded, u64::from(input.required));
        }
        prop_assert!(report.defenses_recorded <= u64::from(input.required));
    }

    /// Honest proofs verify for any hash and nonce parity
    #[test]
    fn fuzz_proof_parity(hash in arb_bytes32(), nonce in 1u64..1_000, eth_v in any::<bool>()) {
        use scatter_market::instructions::defense_helpers::verify_defense;
        let pinner = SimulatedPinner::new(5);
        let proof = pinner.prove(&hash, nonce, eth_v);
        prop_assert!(verify_defense(&hash, nonce, &proof, &pinner.address()).expect("well-formed v"));
        // Halves given in the other nonce's order rebuild a different hash
        if proof.half_hash_a != proof.half_hash_b {
            prop_assert!(!verify_defense(&hash, nonce + 1, &proof, &pinner.address()).expect("well-formed v"));
        }
    }
}

#[cfg(test)]
mod edge_cases {
    use super::*;

    const PRICE: u64 = 3_000;
    const STAKE: u64 = 500;

    fn challenged(sim: &mut SimulatedMarket, count: u8) -> (u64, Vec<SimulatedPinner>) {
        let pinners: Vec<SimulatedPinner> = (1..=count).map(SimulatedPinner::new).collect();
        let bid_id = challenged_bid(sim, actor(10), SCENARIO_HASH, PRICE, &pinners, STAKE).unwrap();
        (bid_id, pinners)
    }

    #[test]
    fn test_every_pinner_defends() {
        let mut sim = SimulatedMarket::default();
        let (bid_id, pinners) = challenged(&mut sim, 3);
        for (i, pinner) in pinners.iter().enumerate() {
            let proof = pinner.prove(&SCENARIO_HASH, 1, true);
            assert_eq!(
                sim.defend(bid_id, pinner.key, &proof).unwrap(),
                Outcome::Defended {
                    bid_id,
                    satisfied_now: i == 2
                }
            );
        }
        let bid = sim.bid(bid_id).unwrap();
        assert_eq!(bid.status, BidStatus::Satisfied);
        assert!(bid.settled);
        assert_eq!(sim.defenses.len(), 3);
        assert!(sim.check_invariants().is_ok());
    }

    #[test]
    fn test_mad_after_valid_defense() {
        let mut sim = SimulatedMarket::default();
        let (bid_id, pinners) = challenged(&mut sim, 3);

        let honest = pinners[0].prove(&SCENARIO_HASH, 1, true);
        sim.defend(bid_id, pinners[0].key, &honest).unwrap();
        let forged = pinners[1].forge(&SCENARIO_HASH, 1, true);
        assert_eq!(
            sim.defend(bid_id, pinners[1].key, &forged).unwrap(),
            Outcome::DefenseFailed { bid_id }
        );

        // The honest pinner loses its stake too
        for pinner in &pinners {
            assert_eq!(sim.stakes[&(bid_id, pinner.key)].value, 0);
        }
        assert_eq!(sim.market.total_burned, 3 * STAKE);
        assert_eq!(sim.owed(&actor(10)), PRICE);
        assert_eq!(sim.bid(bid_id).unwrap().status, BidStatus::Failed);

        let late = pinners[2].prove(&SCENARIO_HASH, 1, true);
        assert!(sim.defend(bid_id, pinners[2].key, &late).is_err());
        assert!(sim.check_invariants().is_ok());
    }

    #[test]
    fn test_defense_window_boundary() {
        let mut sim = SimulatedMarket::default();
        let (bid_id, pinners) = challenged(&mut sim, 2);
        let window = sim.market.defense_window;

        assert!(sim.expire_challenge(bid_id).is_err());

        sim.advance(window);
        let proof = pinners[0].prove(&SCENARIO_HASH, 1, false);
        assert!(matches!(
            sim.defend(bid_id, pinners[0].key, &proof).unwrap(),
            Outcome::Defended { .. }
        ));

        sim.advance(1);
        let proof = pinners[1].prove(&SCENARIO_HASH, 1, false);
        assert!(sim.defend(bid_id, pinners[1].key, &proof).is_err());

        assert_eq!(
            sim.expire_challenge(bid_id).unwrap(),
            Outcome::DefenseFailed { bid_id }
        );
        assert_eq!(sim.market.total_burned, 2 * STAKE);
        assert!(sim.expire_challenge(bid_id).is_err());
    }

    #[test]
    fn test_expiry_with_partial_stake_set() {
        let mut sim = SimulatedMarket::default();
        let (bid_id, pinners) = challenged(&mut sim, 3);
        sim.advance(sim.market.defense_window + 1);

        let supplied = [pinners[0].key, pinners[2].key];
        sim.expire_challenge_with(bid_id, Some(&supplied[..])).unwrap();
        assert_eq!(sim.bid(bid_id).unwrap().status, BidStatus::Failed);
        assert_eq!(sim.owed(&actor(10)), PRICE);
        assert_eq!(sim.stake_ledger.total_staked, STAKE);
        assert!(sim.release_stake(bid_id, pinners[1].key).is_err());
        assert!(sim.check_invariants().is_ok());

        sim.burn_stakes(bid_id, Some(&[pinners[1].key][..])).unwrap();
        assert_eq!(sim.stake_ledger.total_staked, 0);
        assert_eq!(sim.market.total_burned, 3 * STAKE);
        assert!(sim.check_invariants().is_ok());
    }

    #[test]
    fn test_burn_needs_failed_bid() {
        let mut sim = SimulatedMarket::default();
        let (bid_id, _) = challenged(&mut sim, 2);
        assert!(sim.burn_stakes(bid_id, None).is_err());
        assert_eq!(sim.stake_ledger.total_staked, 2 * STAKE);
    }

    #[test]
    fn test_forged_defense_fails_bid_without_remaining_accounts() {
        let mut sim = SimulatedMarket::default();
        let (bid_id, pinners) = challenged(&mut sim, 3);
        let forged = pinners[2].forge(&SCENARIO_HASH, 1, true);

        assert_eq!(
            sim.defend_with(bid_id, pinners[2].key, &forged, Some(&[])).unwrap(),
            Outcome::DefenseFailed { bid_id }
        );
        assert_eq!(sim.bid(bid_id).unwrap().status, BidStatus::Failed);
        assert_eq!(sim.defense_ledger.defense_count, 1);
        assert_eq!(sim.market.total_burned, STAKE);
        assert_eq!(sim.owed(&actor(10)), PRICE);

        // A second attempt with an honest proof is refused
        let honest = pinners[2].prove(&SCENARIO_HASH, 1, true);
        assert!(sim.defend(bid_id, pinners[2].key, &honest).is_err());
        assert_eq!(sim.defense_ledger.defense_count, 1);

        assert_eq!(
            sim.burn_stakes(bid_id, None).unwrap(),
            Outcome::StakesBurned {
                bid_id,
                stakes_burned: 2,
                value_burned: 2 * STAKE
            }
        );
        assert!(sim.check_invariants().is_ok());
    }

    #[test]
    fn test_malformed_recovery_id() {
        let mut sim = SimulatedMarket::default();
        let (bid_id, pinners) = challenged(&mut sim, 2);
        let mut proof = pinners[0].prove(&SCENARIO_HASH, 1, true);
        proof.v = 5;
        assert!(sim.defend(bid_id, pinners[0].key, &proof).is_err());
        assert_eq!(sim.defense_ledger.defense_count, 0);
        assert_eq!(sim.bid(bid_id).unwrap().status, BidStatus::Challenged);
    }

    #[test]
    fn test_defend_twice_rejected() {
        let mut sim = SimulatedMarket::default();
        let (bid_id, pinners) = challenged(&mut sim, 2);
        let proof = pinners[0].prove(&SCENARIO_HASH, 1, true);
        sim.defend(bid_id, pinners[0].key, &proof).unwrap();
        assert!(sim.defend(bid_id, pinners[0].key, &proof).is_err());
        assert_eq!(sim.bid(bid_id).unwrap().valid_defenses, 1);
    }

    #[test]
    fn test_even_nonce_swaps_halves() {
        let mut sim = SimulatedMarket::default();
        let bid_id = must_place(&mut sim, actor(10), pinner_terms(SCENARIO_HASH, PRICE, 2)).unwrap();
        let pinners = [SimulatedPinner::new(1), SimulatedPinner::new(2)];
        sim.stake(bid_id, &pinners[0], STAKE).unwrap();
        sim.stake(bid_id, &pinners[0], STAKE).unwrap();
        sim.stake(bid_id, &pinners[1], STAKE).unwrap();
        for pinner in &pinners {
            sim.pin(bid_id, pinner.key).unwrap();
        }
        assert_eq!(sim.stakes[&(bid_id, pinners[0].key)].nonce, 2);

        // Odd-order reveal against an even nonce does not rebuild the hash
        let wrong_order = pinners[0].prove(&SCENARIO_HASH, 1, true);
        let mut trial = sim.clone();
        assert_eq!(
            trial.defend(bid_id, pinners[0].key, &wrong_order).unwrap(),
            Outcome::DefenseFailed { bid_id }
        );

        let proof = pinners[0].prove(&SCENARIO_HASH, 2, true);
        assert!(matches!(
            sim.defend(bid_id, pinners[0].key, &proof).unwrap(),
            Outcome::Defended { .. }
        ));
    }

    #[test]
    fn test_non_pinner_cannot_defend() {
        let mut sim = SimulatedMarket::default();
        let (bid_id, _) = challenged(&mut sim, 2);
        let outsider = SimulatedPinner::new(9);
        let proof = outsider.prove(&SCENARIO_HASH, 1, true);
        assert!(sim.defend(bid_id, outsider.key, &proof).is_err());
    }
}
