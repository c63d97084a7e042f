//! Fuzz target for stake and pinned on pinner-count bids
//!
//! Checks that:
//! - Pinning requires a non-zero stake
//! - Pinner count never exceeds the required count
//! - Exactly one challenge is raised, at the second pin
//! - Later pinners join the running challenge up to the required count
//! - Stake tallies match the stake records
//!
//! Run with: cargo test --release -p scatter-market-fuzz pin_challenge

use crate::*;
use proptest::prelude::*;
use scatter_market::instructions::constants::MIN_PINNERS;
use scatter_market::outcome::{reason, Outcome};
use scatter_market::state::BidStatus;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Fuzz staking and pinning by each required pinner
    #[test]
    fn fuzz_stake_and_pin(input in any::<PinnerInput>()) {
        let mut sim = SimulatedMarket::default();
        let bid_id = must_place(&mut sim, actor(10), pinner_terms(input.file_hash, input.price, input.required))
            .expect("valid bid");
        let count = input.required as u8;
        let pinners: Vec<SimulatedPinner> = (1..=count).map(SimulatedPinner::new).collect();

        // Staking closes once the challenge is raised, so every stake comes
        // before the first pin
        let mut staked: u64 = 0;
        let mut has_stake = Vec::with_capacity(pinners.len());
        for (pinner, plan) in pinners.iter().zip(input.stakers.iter().cycle()) {
            let mut staked_any = false;
            for amount in &plan.stakes {
                let result = sim.step(|s| s.stake(bid_id, pinner, *amount));
                prop_assert!(!result.is_invariant_violation(), "{:?}\nInput: {:?}", result, input);
                if *amount == 0 {
                    prop_assert!(result.is_error());
                } else {
                    prop_assert!(result.is_success(), "{:?}", result);
                    staked_any = true;
                    staked += amount;
                }
            }
            has_stake.push(staked_any);
        }

        let mut pinned: u16 = 0;
        for ((pinner, plan), staked_any) in pinners.iter().zip(input.stakers.iter().cycle()).zip(&has_stake) {
            if !plan.pins {
                continue;
            }
            let result = sim.step(|s| s.pin(bid_id, pinner.key));
            prop_assert!(!result.is_invariant_violation(), "{:?}\nInput: {:?}", result, input);
            if *staked_any {
                pinned += 1;
                prop_assert_eq!(
                    result.outcome(),
                    Some(&Outcome::FilePinned {
                        bid_id,
                        pinner_count: pinned,
                        raises_challenge: pinned == MIN_PINNERS,
                    })
                );
            } else {
                prop_assert_eq!(result.outcome(), Some(&Outcome::NotOpenToPin { bid_id }));
            }
        }

        let bid = sim.bid(bid_id).expect("bid stored");
        prop_assert_eq!(bid.pinner_count, pinned);
        prop_assert_eq!(check_pinner_count(bid), BidInvariantResult::Valid);
        prop_assert_eq!(sim.challenges.len(), usize::from(pinned >= MIN_PINNERS));
        let expected_status = match pinned {
            0 => BidStatus::Open,
            1 => BidStatus::PartiallyPinned,
            _ => BidStatus::Challenged,
        };
        prop_assert_eq!(bid.status, expected_status);
        prop_assert_eq!(sim.stake_ledger.total_staked, staked);
        prop_assert_eq!(sim.vault, input.price + staked);
    }

    /// Restaking raises the nonce by one per stake call
    #[test]
    fn fuzz_restake_nonce(amounts in prop::collection::vec(1u64..ONE_SOL, 1..8)) {
        let mut sim = SimulatedMarket::default();
        let bid_id = must_place(&mut sim, actor(10), pinner_terms(SCENARIO_HASH, ONE_SOL, 2))
            .expect("valid bid");
        let pinner = SimulatedPinner::new(1);
        let mut total = 0;
        for (i, amount) in amounts.iter().enumerate() {
            total += amount;
            let outcome = sim.stake(bid_id, &pinner, *amount).expect("stake");
            prop_assert_eq!(
                outcome,
                Outcome::PinStake {
                    bid_id,
                    value: total,
                    nonce: i as u64 + 1,
                }
            );
        }
        let tally = sim.tallies.get(&bid_id).expect("tally");
        prop_assert_eq!(tally.stake_count, 1);
        prop_assert_eq!(tally.total_value, total);
    }
}
