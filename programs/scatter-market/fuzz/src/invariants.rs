//! Market invariant checking for fuzz testing
//!
//! Each checker is independent of the program's own guards so a broken
//! guard shows up as a violation rather than a silently agreeing assert.

use scatter_market::state::{Bid, BidStatus, MarketConfig, QuorumKind, StakeRecord, StakeTally};

/// Value accounting invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueInvariantResult {
    Valid,
    /// Vault holdings differ from the sum of the market's books
    ConservationViolation { expected: u64, actual: u64 },
    /// A bid holds more escrow than it was funded with
    EscrowExceedsFunding { escrow: u64, funded: u64 },
    /// A failed bid kept escrow instead of refunding the bidder
    EscrowSurvivedFailure { escrow: u64 },
    /// Market books overflowed
    Overflow,
}

/// Bid state machine invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidInvariantResult {
    Valid,
    InvalidStateTransition { from: BidStatus, to: BidStatus },
    TerminalStateModified { status: BidStatus },
    /// Sway differs from (#true - #false)
    SwayMismatch { sway: i64, expected: i64 },
    VoteCountMismatch { count: u16, trues: u16, falses: u16 },
    /// Validation bid satisfied without quorum and a positive sway
    SatisfiedWithoutQuorum { count: u16, quorum: u16, sway: i64 },
    PinnersExceedRequired { pinners: u16, required: u16 },
    /// Bid id outside 1..=bid_count
    IdOutOfRange { id: u64, count: u64 },
}

/// Stake invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeInvariantResult {
    Valid,
    TallyCountMismatch { counted: u16, tally: u16 },
    TallyValueMismatch { summed: u64, tally: u64 },
    /// A failed bid paid a pinner reward
    RewardAfterFailure { released: u16 },
    /// A staker pinned without collateral
    PinnedWithoutStake { account: [u8; 32] },
}

// ============================================================================
// Value Invariants
// ============================================================================

/// Vault lamports above rent equal escrowed + staked + burned + owed.
pub fn check_value_conservation(market: &MarketConfig, vault: u64) -> ValueInvariantResult {
    let expected = market
        .total_escrowed
        .checked_add(market.total_staked)
        .and_then(|v| v.checked_add(market.total_burned))
        .and_then(|v| v.checked_add(market.total_owed));
    match expected {
        None => ValueInvariantResult::Overflow,
        Some(expected) if expected != vault => ValueInvariantResult::ConservationViolation {
            expected,
            actual: vault,
        },
        Some(_) => ValueInvariantResult::Valid,
    }
}

/// A bid's remaining escrow never exceeds price + pool, and a failed bid
/// holds none.
pub fn check_escrow_bounded(bid: &Bid) -> ValueInvariantResult {
    if bid.status == BidStatus::Failed && bid.escrow_remaining > 0 {
        return ValueInvariantResult::EscrowSurvivedFailure {
            escrow: bid.escrow_remaining,
        };
    }
    let funded = match bid.price.checked_add(bid.validation_pool) {
        Some(funded) => funded,
        None => return ValueInvariantResult::Overflow,
    };
    if bid.escrow_remaining > funded {
        ValueInvariantResult::EscrowExceedsFunding {
            escrow: bid.escrow_remaining,
            funded,
        }
    } else {
        ValueInvariantResult::Valid
    }
}

// ============================================================================
// Bid Invariants
// ============================================================================

/// Allowed status edges, per quorum kind.
pub fn check_status_transition(kind: QuorumKind, from: BidStatus, to: BidStatus) -> BidInvariantResult {
    use BidStatus::*;

    if from == to {
        return BidInvariantResult::Valid;
    }
    if matches!(from, Satisfied | Failed) {
        return BidInvariantResult::TerminalStateModified { status: from };
    }
    let valid = match kind {
        QuorumKind::Validation => matches!(
            (from, to),
            (Open, Accepted) | (Open, Pinned) | (Accepted, Pinned) | (Pinned, Satisfied)
        ),
        QuorumKind::PinnerCount => matches!(
            (from, to),
            (Open, PartiallyPinned)
                | (PartiallyPinned, Challenged)
                | (Challenged, Satisfied)
                | (Challenged, Failed)
        ),
    };
    if valid {
        BidInvariantResult::Valid
    } else {
        BidInvariantResult::InvalidStateTransition { from, to }
    }
}

/// Vote counters agree with each other and with the sway.
pub fn check_votes(bid: &Bid) -> BidInvariantResult {
    let total = u32::from(bid.true_votes) + u32::from(bid.false_votes);
    if total != u32::from(bid.validation_count) {
        return BidInvariantResult::VoteCountMismatch {
            count: bid.validation_count,
            trues: bid.true_votes,
            falses: bid.false_votes,
        };
    }
    let expected = i64::from(bid.true_votes) - i64::from(bid.false_votes);
    if bid.validation_sway() != expected {
        return BidInvariantResult::SwayMismatch {
            sway: bid.validation_sway(),
            expected,
        };
    }
    BidInvariantResult::Valid
}

/// Validation bids settle only after quorum with true votes in the majority.
///
/// Settlement is checked at the vote that caused it, so pass the counters
/// as they stood right after that vote.
pub fn check_satisfaction(count: u16, quorum: u16, sway: i64, settled: bool) -> BidInvariantResult {
    if settled && (count < quorum || sway <= 0) {
        BidInvariantResult::SatisfiedWithoutQuorum { count, quorum, sway }
    } else {
        BidInvariantResult::Valid
    }
}

/// Pinner-count bids never record more pinners than they require.
pub fn check_pinner_count(bid: &Bid) -> BidInvariantResult {
    if bid.quorum_kind == QuorumKind::PinnerCount && bid.pinner_count > bid.quorum_value {
        BidInvariantResult::PinnersExceedRequired {
            pinners: bid.pinner_count,
            required: bid.quorum_value,
        }
    } else {
        BidInvariantResult::Valid
    }
}

/// Ids are assigned from 1 and never exceed the ledger count.
pub fn check_bid_id(id: u64, count: u64) -> BidInvariantResult {
    if id == 0 || id > count {
        BidInvariantResult::IdOutOfRange { id, count }
    } else {
        BidInvariantResult::Valid
    }
}

// ============================================================================
// Stake Invariants
// ============================================================================

/// The tally counts exactly the non-zero stakes of its bid.
pub fn check_tally<'a, I>(tally: &StakeTally, stakes: I) -> StakeInvariantResult
where
    I: IntoIterator<Item = &'a StakeRecord>,
{
    let mut counted: u16 = 0;
    let mut summed: u64 = 0;
    for stake in stakes {
        if stake.value > 0 {
            counted = counted.saturating_add(1);
            summed = summed.saturating_add(stake.value);
        }
    }
    if counted != tally.stake_count {
        return StakeInvariantResult::TallyCountMismatch {
            counted,
            tally: tally.stake_count,
        };
    }
    if summed != tally.total_value {
        return StakeInvariantResult::TallyValueMismatch {
            summed,
            tally: tally.total_value,
        };
    }
    StakeInvariantResult::Valid
}

/// Failed bids pay no pinner; pinned stakes were staked when pinned.
///
/// Stakes may outlive a failure until they are burned, so a non-zero value
/// on a failed bid is not a violation by itself.
pub fn check_stake_after_resolution(bid: &Bid, stake: &StakeRecord) -> StakeInvariantResult {
    if bid.status == BidStatus::Failed && bid.released_count > 0 {
        return StakeInvariantResult::RewardAfterFailure {
            released: bid.released_count,
        };
    }
    if stake.pinned && stake.nonce == 0 {
        return StakeInvariantResult::PinnedWithoutStake {
            account: stake.account.to_bytes(),
        };
    }
    StakeInvariantResult::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conservation_detects_drift() {
        let mut market = MarketConfig::default();
        market.escrow(100).unwrap();
        assert_eq!(check_value_conservation(&market, 100), ValueInvariantResult::Valid);
        assert_eq!(
            check_value_conservation(&market, 99),
            ValueInvariantResult::ConservationViolation {
                expected: 100,
                actual: 99
            }
        );
    }

    #[test]
    fn test_transition_table_matches_program() {
        use BidStatus::*;
        let all = [Open, Accepted, Pinned, PartiallyPinned, Challenged, Satisfied, Failed];
        for from in all {
            for to in all {
                if from == to {
                    continue;
                }
                let allowed = [QuorumKind::Validation, QuorumKind::PinnerCount]
                    .into_iter()
                    .any(|kind| check_status_transition(kind, from, to) == BidInvariantResult::Valid);
                assert_eq!(
                    allowed,
                    from.can_transition_to(to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_tie_never_satisfies() {
        assert_eq!(
            check_satisfaction(4, 4, 0, true),
            BidInvariantResult::SatisfiedWithoutQuorum {
                count: 4,
                quorum: 4,
                sway: 0
            }
        );
        assert_eq!(check_satisfaction(4, 4, 2, true), BidInvariantResult::Valid);
        assert_eq!(check_satisfaction(2, 4, 2, false), BidInvariantResult::Valid);
    }

    #[test]
    fn test_ids_start_at_one() {
        assert!(matches!(check_bid_id(0, 3), BidInvariantResult::IdOutOfRange { .. }));
        assert_eq!(check_bid_id(1, 3), BidInvariantResult::Valid);
        assert!(matches!(check_bid_id(4, 3), BidInvariantResult::IdOutOfRange { .. }));
    }
}
