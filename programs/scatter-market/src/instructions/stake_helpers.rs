//! Shared helper functions for pinner-count bids.
//!
//! Used by `stake_bid`, `pin_bid`, `release_stake`, `defend`,
//! `expire_challenge` and `burn_stakes`.

use crate::errors::MarketError;
use crate::instructions::constants::MIN_PINNERS;
use crate::outcome::{reason, Outcome};
use crate::state::{
    Balance, Bid, BidStatus, MarketConfig, QuorumKind, StakeLedger, StakeRecord, StakeTally,
};
use anchor_lang::prelude::*;

/// Add collateral toward pinning a bid.
///
/// The first stake binds `proof_signer`; later stakes must repeat it.
#[allow(clippy::too_many_arguments)]
pub fn stake_on_bid(
    market: &mut MarketConfig,
    coordinator: &Pubkey,
    ledger: &mut StakeLedger,
    bid: &Bid,
    record: &mut StakeRecord,
    tally: &mut StakeTally,
    staker: Pubkey,
    amount: u64,
    proof_signer: [u8; 20],
) -> Result<Outcome> {
    bid.require_kind(QuorumKind::PinnerCount)?;
    require!(amount > 0, MarketError::InvalidStakeAmount);
    require!(
        matches!(bid.status, BidStatus::Open | BidStatus::PartiallyPinned),
        MarketError::BidClosed
    );
    require_keys_neq!(staker, bid.bidder, MarketError::BidderCannotHost);
    require!(proof_signer != [0u8; 20], MarketError::InvalidProofSigner);

    if record.account == Pubkey::default() {
        record.bid_id = bid.id;
        record.account = staker;
        record.proof_signer = proof_signer;
    } else {
        require_keys_eq!(record.account, staker, MarketError::Unauthorized);
        require!(record.bid_id == bid.id, MarketError::StakeBidMismatch);
        if record.proof_signer == [0u8; 20] {
            record.proof_signer = proof_signer;
        }
        require!(
            record.proof_signer == proof_signer,
            MarketError::ProofSignerMismatch
        );
    }
    tally.bid_id = bid.id;

    ledger.add_stake(coordinator, record, tally, amount)?;
    market.lock_stake(amount)?;

    Ok(Outcome::PinStake {
        bid_id: bid.id,
        value: record.value,
        nonce: record.nonce,
    })
}

/// Staked pin on a pinner-count bid.
///
/// The pin that brings the bid to `MIN_PINNERS` pinners returns
/// `FilePinned` with `raises_challenge` set; the caller then raises the
/// challenge. Stakers may keep pinning up to the required count while the
/// challenge window is open, and each late pinner must defend before the
/// same deadline.
pub fn pin_with_stake(
    bid: &mut Bid,
    stake: Option<&mut StakeRecord>,
    pinner: Pubkey,
    now: i64,
) -> Result<Outcome> {
    bid.require_kind(QuorumKind::PinnerCount)?;

    let stake = match stake {
        Some(stake) if stake.value > 0 => stake,
        _ => return Ok(Outcome::NotOpenToPin { bid_id: bid.id }),
    };
    require_keys_eq!(stake.account, pinner, MarketError::Unauthorized);
    require!(stake.bid_id == bid.id, MarketError::StakeBidMismatch);

    if stake.pinned {
        return Ok(Outcome::PinRejected {
            bid_id: bid.id,
            reason: reason::ALREADY_PINNED,
        });
    }
    let open = match bid.status {
        BidStatus::Open | BidStatus::PartiallyPinned => true,
        BidStatus::Challenged => now <= bid.challenge_deadline,
        _ => false,
    };
    if !open {
        return Ok(Outcome::PinRejected {
            bid_id: bid.id,
            reason: reason::BID_CLOSED,
        });
    }
    if bid.pinner_count >= bid.quorum_value {
        return Ok(Outcome::PinRejected {
            bid_id: bid.id,
            reason: reason::FULLY_PINNED,
        });
    }

    stake.pinned = true;
    stake.pinned_at = now;
    bid.pinner_count = bid
        .pinner_count
        .checked_add(1)
        .ok_or(MarketError::ArithmeticOverflow)?;
    if bid.status == BidStatus::Open {
        bid.set_status(BidStatus::PartiallyPinned)?;
    }

    Ok(Outcome::FilePinned {
        bid_id: bid.id,
        pinner_count: bid.pinner_count,
        raises_challenge: bid.status == BidStatus::PartiallyPinned
            && bid.pinner_count >= MIN_PINNERS,
    })
}

/// Share of the price owed to one pinner. The last of `pinner_count`
/// releasers also takes the division remainder.
pub fn pinner_reward(price: u64, pinner_count: u16, released_count: u16) -> Result<u64> {
    let count = u64::from(pinner_count);
    let share = price
        .checked_div(count)
        .ok_or(MarketError::ArithmeticOverflow)?;

    // Give remainder to last pinner
    if released_count == pinner_count.saturating_sub(1) {
        let remainder = price
            .checked_rem(count)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(share
            .checked_add(remainder)
            .ok_or(MarketError::ArithmeticOverflow)?)
    } else {
        Ok(share)
    }
}

/// Return a stake to its owner's balance.
///
/// Pinned stakes unlock only once the bid is satisfied and carry a share of
/// the price. Unpinned stakes unlock unless a challenge is running or the
/// bid has failed.
#[allow(clippy::too_many_arguments)]
pub fn release_stake(
    market: &mut MarketConfig,
    coordinator: &Pubkey,
    ledger: &mut StakeLedger,
    bid: &mut Bid,
    record: &mut StakeRecord,
    tally: &mut StakeTally,
    balance: &mut Balance,
) -> Result<Outcome> {
    bid.require_kind(QuorumKind::PinnerCount)?;
    require!(record.bid_id == bid.id, MarketError::StakeBidMismatch);
    require!(record.value > 0, MarketError::StakeEmpty);

    let reward = if record.pinned {
        require!(bid.status == BidStatus::Satisfied, MarketError::StakeLocked);
        let reward = pinner_reward(bid.price, bid.pinner_count, bid.released_count)?;
        bid.take_escrow(reward)?;
        market.release_escrow(reward)?;
        bid.released_count = bid
            .released_count
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
        reward
    } else {
        require!(
            !matches!(bid.status, BidStatus::Challenged | BidStatus::Failed),
            MarketError::StakeLocked
        );
        0
    };

    let value = ledger.zero(coordinator, record, tally)?;
    market.release_stake(value)?;
    balance.credit(
        value
            .checked_add(reward)
            .ok_or(MarketError::ArithmeticOverflow)?,
    )?;

    Ok(Outcome::StakeReleased {
        bid_id: bid.id,
        value,
        reward,
    })
}

/// Fail a challenged bid and credit its remaining escrow to the bidder.
///
/// Stakes stay locked on the failed bid until [`burn_stakes`] zeroes them.
/// Returns the refunded value.
pub fn fail_bid(
    market: &mut MarketConfig,
    bid: &mut Bid,
    bidder_balance: &mut Balance,
) -> Result<u64> {
    bid.set_status(BidStatus::Failed)?;
    let refund = bid.escrow_remaining;
    bid.take_escrow(refund)?;
    market.release_escrow(refund)?;
    bidder_balance.credit(refund)?;
    Ok(refund)
}

/// Burn the given stakes of a failed bid.
///
/// Any subset may be passed; zeroed records are skipped, so repeated calls
/// finish the burn piecewise. Returns (stakes burned, value burned).
pub fn burn_stakes<'a, I>(
    market: &mut MarketConfig,
    coordinator: &Pubkey,
    ledger: &mut StakeLedger,
    bid: &Bid,
    tally: &mut StakeTally,
    stakes: I,
) -> Result<(u16, u64)>
where
    I: IntoIterator<Item = &'a mut StakeRecord>,
{
    require!(bid.status == BidStatus::Failed, MarketError::BidNotFailed);
    require!(tally.bid_id == bid.id, MarketError::StakeBidMismatch);

    let mut burned_count: u16 = 0;
    let mut burned_value: u64 = 0;
    for stake in stakes {
        require!(stake.bid_id == bid.id, MarketError::StakeBidMismatch);
        let value = ledger.zero(coordinator, stake, tally)?;
        if value > 0 {
            burned_count = burned_count
                .checked_add(1)
                .ok_or(MarketError::ArithmeticOverflow)?;
            burned_value = burned_value
                .checked_add(value)
                .ok_or(MarketError::ArithmeticOverflow)?;
        }
    }
    market.burn_stake(burned_value)?;

    Ok((burned_count, burned_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::writers::WriteGuarded;

    const PRICE: u64 = 1_000;

    struct Fixture {
        coordinator: Pubkey,
        market: MarketConfig,
        ledger: StakeLedger,
        bid: Bid,
        tally: StakeTally,
    }

    fn fixture(pinners: u16) -> Fixture {
        let owner = Pubkey::new_unique();
        let coordinator = Pubkey::new_unique();
        let mut ledger = StakeLedger::default();
        ledger.writers.owner = owner;
        ledger.grant(&owner, coordinator).unwrap();

        let mut market = MarketConfig::default();
        market.escrow(PRICE).unwrap();

        Fixture {
            coordinator,
            market,
            ledger,
            bid: Bid {
                id: 7,
                bidder: Pubkey::new_unique(),
                price: PRICE,
                quorum_kind: QuorumKind::PinnerCount,
                quorum_value: pinners,
                escrow_remaining: PRICE,
                ..Bid::default()
            },
            tally: StakeTally::default(),
        }
    }

    fn stake(f: &mut Fixture, staker: Pubkey, amount: u64) -> StakeRecord {
        let mut record = StakeRecord::default();
        stake_on_bid(
            &mut f.market,
            &f.coordinator,
            &mut f.ledger,
            &f.bid,
            &mut record,
            &mut f.tally,
            staker,
            amount,
            [9u8; 20],
        )
        .unwrap();
        record
    }

    mod staking {
        use super::*;

        #[test]
        fn test_stake_locks_value() {
            let mut f = fixture(2);
            let staker = Pubkey::new_unique();
            let record = stake(&mut f, staker, 50);

            assert_eq!(record.account, staker);
            assert_eq!(record.bid_id, 7);
            assert_eq!(record.nonce, 1);
            assert_eq!(f.tally.stake_count, 1);
            assert_eq!(f.market.total_staked, 50);
        }

        #[test]
        fn test_restake_requires_same_signer() {
            let mut f = fixture(2);
            let staker = Pubkey::new_unique();
            let mut record = stake(&mut f, staker, 50);

            let result = stake_on_bid(
                &mut f.market,
                &f.coordinator,
                &mut f.ledger,
                &f.bid,
                &mut record,
                &mut f.tally,
                staker,
                10,
                [8u8; 20],
            );
            assert!(result.is_err());

            let outcome = stake_on_bid(
                &mut f.market,
                &f.coordinator,
                &mut f.ledger,
                &f.bid,
                &mut record,
                &mut f.tally,
                staker,
                10,
                [9u8; 20],
            )
            .unwrap();
            assert_eq!(
                outcome,
                Outcome::PinStake {
                    bid_id: 7,
                    value: 60,
                    nonce: 2
                }
            );
            assert_eq!(f.tally.stake_count, 1);
        }

        #[test]
        fn test_bidder_and_zero_amount_rejected() {
            let mut f = fixture(2);
            let bidder = f.bid.bidder;
            for (staker, amount) in [(bidder, 10), (Pubkey::new_unique(), 0)] {
                let result = stake_on_bid(
                    &mut f.market,
                    &f.coordinator,
                    &mut f.ledger,
                    &f.bid,
                    &mut StakeRecord::default(),
                    &mut f.tally,
                    staker,
                    amount,
                    [9u8; 20],
                );
                assert!(result.is_err());
            }
            assert_eq!(f.market.total_staked, 0);
        }

        #[test]
        fn test_validation_bid_rejects_stake() {
            let mut f = fixture(2);
            f.bid.quorum_kind = QuorumKind::Validation;
            let result = stake_on_bid(
                &mut f.market,
                &f.coordinator,
                &mut f.ledger,
                &f.bid,
                &mut StakeRecord::default(),
                &mut f.tally,
                Pubkey::new_unique(),
                10,
                [9u8; 20],
            );
            assert!(result.is_err());
        }
    }

    mod pinning {
        use super::*;

        #[test]
        fn test_zero_stake_cannot_pin() {
            let mut f = fixture(2);
            let pinner = Pubkey::new_unique();
            assert_eq!(
                pin_with_stake(&mut f.bid, None, pinner, 0).unwrap(),
                Outcome::NotOpenToPin { bid_id: 7 }
            );
            let mut empty = StakeRecord {
                bid_id: 7,
                account: pinner,
                ..StakeRecord::default()
            };
            assert_eq!(
                pin_with_stake(&mut f.bid, Some(&mut empty), pinner, 0).unwrap(),
                Outcome::NotOpenToPin { bid_id: 7 }
            );
            assert!(!empty.pinned);
            assert_eq!(f.bid.pinner_count, 0);
        }

        #[test]
        fn test_two_pinners_fill_bid() {
            let mut f = fixture(2);
            let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
            let mut sa = stake(&mut f, a, 10);
            let mut sb = stake(&mut f, b, 10);

            assert_eq!(
                pin_with_stake(&mut f.bid, Some(&mut sa), a, 1).unwrap(),
                Outcome::FilePinned {
                    bid_id: 7,
                    pinner_count: 1,
                    raises_challenge: false
                }
            );
            assert_eq!(f.bid.status, BidStatus::PartiallyPinned);
            assert!(matches!(
                pin_with_stake(&mut f.bid, Some(&mut sa), a, 2).unwrap(),
                Outcome::PinRejected { .. }
            ));
            assert_eq!(
                pin_with_stake(&mut f.bid, Some(&mut sb), b, 3).unwrap(),
                Outcome::FilePinned {
                    bid_id: 7,
                    pinner_count: 2,
                    raises_challenge: true
                }
            );
        }

        #[test]
        fn test_third_pinner_rejected_when_full() {
            let mut f = fixture(2);
            let pinners: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
            let mut stakes: Vec<StakeRecord> =
                pinners.iter().map(|p| stake(&mut f, *p, 10)).collect();

            for i in 0..2 {
                pin_with_stake(&mut f.bid, Some(&mut stakes[i]), pinners[i], 0).unwrap();
            }
            assert_eq!(
                pin_with_stake(&mut f.bid, Some(&mut stakes[2]), pinners[2], 0).unwrap(),
                Outcome::PinRejected {
                    bid_id: 7,
                    reason: reason::FULLY_PINNED
                }
            );
            assert_eq!(f.bid.pinner_count, 2);
        }

        #[test]
        fn test_second_pinner_raises_challenge_below_required() {
            let mut f = fixture(3);
            let pinners: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
            let mut stakes: Vec<StakeRecord> =
                pinners.iter().map(|p| stake(&mut f, *p, 10)).collect();

            pin_with_stake(&mut f.bid, Some(&mut stakes[0]), pinners[0], 0).unwrap();
            assert_eq!(
                pin_with_stake(&mut f.bid, Some(&mut stakes[1]), pinners[1], 1).unwrap(),
                Outcome::FilePinned {
                    bid_id: 7,
                    pinner_count: 2,
                    raises_challenge: true
                }
            );

            // The challenge is running; the third staker joins it
            f.bid.set_status(BidStatus::Challenged).unwrap();
            f.bid.challenge_deadline = 100;
            assert_eq!(
                pin_with_stake(&mut f.bid, Some(&mut stakes[2]), pinners[2], 50).unwrap(),
                Outcome::FilePinned {
                    bid_id: 7,
                    pinner_count: 3,
                    raises_challenge: false
                }
            );
            assert_eq!(f.bid.status, BidStatus::Challenged);
        }

        #[test]
        fn test_late_pin_rejected_after_window() {
            let mut f = fixture(3);
            let pinners: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
            let mut stakes: Vec<StakeRecord> =
                pinners.iter().map(|p| stake(&mut f, *p, 10)).collect();
            for i in 0..2 {
                pin_with_stake(&mut f.bid, Some(&mut stakes[i]), pinners[i], 0).unwrap();
            }
            f.bid.set_status(BidStatus::Challenged).unwrap();
            f.bid.challenge_deadline = 100;

            assert_eq!(
                pin_with_stake(&mut f.bid, Some(&mut stakes[2]), pinners[2], 101).unwrap(),
                Outcome::PinRejected {
                    bid_id: 7,
                    reason: reason::BID_CLOSED
                }
            );
            assert!(!stakes[2].pinned);
            assert_eq!(f.bid.pinner_count, 2);
        }
    }

    mod release {
        use super::*;

        #[test]
        fn test_reward_split_gives_remainder_to_last() {
            assert_eq!(pinner_reward(1_000, 3, 0).unwrap(), 333);
            assert_eq!(pinner_reward(1_000, 3, 1).unwrap(), 333);
            assert_eq!(pinner_reward(1_000, 3, 2).unwrap(), 334);
            assert!(pinner_reward(1_000, 0, 0).is_err());
        }

        #[test]
        fn test_pinned_stake_locked_until_satisfied() {
            let mut f = fixture(2);
            let a = Pubkey::new_unique();
            let mut record = stake(&mut f, a, 10);
            pin_with_stake(&mut f.bid, Some(&mut record), a, 0).unwrap();

            let result = release_stake(
                &mut f.market,
                &f.coordinator,
                &mut f.ledger,
                &mut f.bid,
                &mut record,
                &mut f.tally,
                &mut Balance::default(),
            );
            assert!(result.is_err());
            assert_eq!(record.value, 10);
        }

        #[test]
        fn test_unpinned_stake_released_without_reward() {
            let mut f = fixture(2);
            let a = Pubkey::new_unique();
            let mut record = stake(&mut f, a, 10);
            let mut balance = Balance::default();

            let outcome = release_stake(
                &mut f.market,
                &f.coordinator,
                &mut f.ledger,
                &mut f.bid,
                &mut record,
                &mut f.tally,
                &mut balance,
            )
            .unwrap();
            assert_eq!(
                outcome,
                Outcome::StakeReleased {
                    bid_id: 7,
                    value: 10,
                    reward: 0
                }
            );
            assert_eq!(balance.owed, 10);
            assert_eq!(f.tally.stake_count, 0);
            assert_eq!(f.market.total_staked, 0);
            assert_eq!(f.market.total_owed, 10);
        }

        #[test]
        fn test_satisfied_pinners_split_price() {
            let mut f = fixture(2);
            let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
            let mut sa = stake(&mut f, a, 10);
            let mut sb = stake(&mut f, b, 20);
            pin_with_stake(&mut f.bid, Some(&mut sa), a, 0).unwrap();
            pin_with_stake(&mut f.bid, Some(&mut sb), b, 0).unwrap();
            f.bid.set_status(BidStatus::Challenged).unwrap();
            f.bid.set_status(BidStatus::Satisfied).unwrap();

            let mut ba = Balance::default();
            let mut bb = Balance::default();
            for (record, balance) in [(&mut sa, &mut ba), (&mut sb, &mut bb)] {
                release_stake(
                    &mut f.market,
                    &f.coordinator,
                    &mut f.ledger,
                    &mut f.bid,
                    record,
                    &mut f.tally,
                    balance,
                )
                .unwrap();
            }
            assert_eq!(ba.owed, 10 + PRICE / 2);
            assert_eq!(bb.owed, 20 + PRICE / 2);
            assert_eq!(f.bid.escrow_remaining, 0);
            assert_eq!(f.market.total_escrowed, 0);
            assert_eq!(f.market.total_staked, 0);
        }
    }

    mod burning {
        use super::*;

        fn challenged(f: &mut Fixture) -> (StakeRecord, StakeRecord) {
            let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
            let mut sa = stake(f, a, 10);
            let mut sb = stake(f, b, 30);
            pin_with_stake(&mut f.bid, Some(&mut sa), a, 0).unwrap();
            pin_with_stake(&mut f.bid, Some(&mut sb), b, 0).unwrap();
            f.bid.set_status(BidStatus::Challenged).unwrap();
            (sa, sb)
        }

        fn burn<'a>(
            f: &mut Fixture,
            stakes: impl IntoIterator<Item = &'a mut StakeRecord>,
        ) -> Result<(u16, u64)> {
            burn_stakes(
                &mut f.market,
                &f.coordinator,
                &mut f.ledger,
                &f.bid,
                &mut f.tally,
                stakes,
            )
        }

        #[test]
        fn test_fail_refunds_bidder_and_locks_stakes() {
            let mut f = fixture(2);
            let (mut sa, _sb) = challenged(&mut f);
            let mut bidder_balance = Balance::default();

            let refund = fail_bid(&mut f.market, &mut f.bid, &mut bidder_balance).unwrap();
            assert_eq!(refund, PRICE);
            assert_eq!(f.bid.status, BidStatus::Failed);
            assert_eq!(bidder_balance.owed, PRICE);
            assert_eq!(f.bid.escrow_remaining, 0);
            assert_eq!(f.market.total_staked, 40);

            let result = release_stake(
                &mut f.market,
                &f.coordinator,
                &mut f.ledger,
                &mut f.bid,
                &mut sa,
                &mut f.tally,
                &mut Balance::default(),
            );
            assert!(result.is_err());
        }

        #[test]
        fn test_burn_all_after_failure() {
            let mut f = fixture(2);
            let (mut sa, mut sb) = challenged(&mut f);
            fail_bid(&mut f.market, &mut f.bid, &mut Balance::default()).unwrap();
            let held = f.market.total_held().unwrap();

            assert_eq!(burn(&mut f, [&mut sa, &mut sb]).unwrap(), (2, 40));
            assert_eq!(sa.value, 0);
            assert_eq!(sb.value, 0);
            assert_eq!(sa.nonce, 1);
            assert_eq!(f.tally.stake_count, 0);
            assert_eq!(f.market.total_burned, 40);
            assert_eq!(f.market.total_held().unwrap(), held);
        }

        #[test]
        fn test_burn_finishes_piecewise() {
            let mut f = fixture(2);
            let (mut sa, mut sb) = challenged(&mut f);
            fail_bid(&mut f.market, &mut f.bid, &mut Balance::default()).unwrap();

            assert_eq!(burn(&mut f, [&mut sa]).unwrap(), (1, 10));
            assert_eq!(f.tally.stake_count, 1);
            // Already burned records count for nothing
            assert_eq!(burn(&mut f, [&mut sa, &mut sb]).unwrap(), (1, 30));
            assert_eq!(burn(&mut f, [&mut sb]).unwrap(), (0, 0));
            assert_eq!(f.market.total_burned, 40);
            assert_eq!(f.market.total_staked, 0);
        }

        #[test]
        fn test_burn_requires_failed_bid() {
            let mut f = fixture(2);
            let (mut sa, _sb) = challenged(&mut f);
            assert!(burn(&mut f, [&mut sa]).is_err());
            assert_eq!(sa.value, 10);
        }
    }
}
