//! Bid lifecycle transitions shared by the bid, accept, pin and validate
//! instructions.
//!
//! These functions operate on deserialized account structs only, so the same
//! logic runs on-chain and in the off-chain market simulation.

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::instructions::constants::*;
use crate::outcome::{reason, Outcome};
use crate::state::{Balance, Bid, BidLedger, BidStatus, MarketConfig, Quorum, QuorumKind, ValidationRecord};

/// Caller-supplied terms of a new bid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidTerms {
    pub file_hash: [u8; 32],
    pub file_size: u64,
    pub duration: i64,
    pub price: u64,
    pub validation_pool: u64,
    pub quorum: Option<Quorum>,
}

/// Quorum a bid will use; absent means validation with the market default.
pub fn resolve_quorum(market: &MarketConfig, quorum: Option<Quorum>) -> Quorum {
    quorum.unwrap_or(Quorum {
        kind: QuorumKind::Validation,
        value: market.default_min_validations,
    })
}

/// Returns the first rule the terms break, or `None` if the bid is valid.
///
/// `value` is the amount the bidder offers to transfer; it must equal
/// price plus pool exactly.
pub fn check_bid_terms(
    market: &MarketConfig,
    terms: &BidTerms,
    value: u64,
    banned: bool,
) -> Option<&'static str> {
    if banned {
        return Some(reason::BIDDER_BANNED);
    }
    match terms.price.checked_add(terms.validation_pool) {
        Some(total) if total == value => {}
        _ => return Some(reason::VALUE_MISMATCH),
    }
    if terms.file_hash == [0u8; 32] {
        return Some(reason::INVALID_FILE_HASH);
    }
    if terms.file_hash == EMPTY_FILE_HASH {
        return Some(reason::EMPTY_FILE_HASH);
    }
    if terms.file_size == 0 {
        return Some(reason::INVALID_FILE_SIZE);
    }
    if terms.price == 0 {
        return Some(reason::ZERO_PRICE);
    }
    if terms.price < market.min_bid {
        return Some(reason::BELOW_MIN_BID);
    }
    if terms.duration < market.min_duration {
        return Some(reason::BELOW_MIN_DURATION);
    }

    let quorum = resolve_quorum(market, terms.quorum);
    match quorum.kind {
        QuorumKind::Validation => {
            if quorum.value == 0 || quorum.value > MAX_VALIDATORS {
                return Some(reason::INVALID_QUORUM);
            }
            if terms.validation_pool > 0
                && quorum.value > 1
                && terms.validation_pool % u64::from(quorum.value) != 0
            {
                return Some(reason::INDIVISIBLE_POOL);
            }
        }
        QuorumKind::PinnerCount => {
            if !(MIN_PINNERS..=MAX_PINNERS).contains(&quorum.value) {
                return Some(reason::INVALID_QUORUM);
            }
            if terms.validation_pool > 0 {
                return Some(reason::POOL_NEEDS_VALIDATION);
            }
        }
    }
    None
}

/// Validate terms and, if they hold, record the bid and escrow its value.
///
/// Returns the outcome and, on success, the new bid record for the caller to
/// persist. A rejection leaves the ledger and market untouched.
#[allow(clippy::too_many_arguments)]
pub fn place_bid(
    market: &mut MarketConfig,
    coordinator: &Pubkey,
    ledger: &mut BidLedger,
    bidder: Pubkey,
    terms: &BidTerms,
    value: u64,
    banned: bool,
    now: i64,
    bump: u8,
) -> Result<(Outcome, Option<Bid>)> {
    if let Some(reason) = check_bid_terms(market, terms, value, banned) {
        return Ok((Outcome::BidInvalid { reason }, None));
    }

    let quorum = resolve_quorum(market, terms.quorum);
    let id = ledger.add_bid(coordinator)?;
    market.escrow(value)?;

    let bid = Bid {
        id,
        bidder,
        file_hash: terms.file_hash,
        file_size: terms.file_size,
        price: terms.price,
        validation_pool: terms.validation_pool,
        duration: terms.duration,
        quorum_kind: quorum.kind,
        quorum_value: quorum.value,
        created_at: now,
        escrow_remaining: value,
        bump,
        ..Bid::default()
    };
    Ok((Outcome::BidSuccessful { bid_id: id }, Some(bid)))
}

/// First come, first served candidacy with a hold window.
///
/// The sitting candidate can only be displaced once `accept_hold_duration`
/// has elapsed since its acceptance.
pub fn accept_bid(bid: &mut Bid, hoster: Pubkey, now: i64, hold: i64) -> Result<Outcome> {
    bid.require_kind(QuorumKind::Validation)?;
    require_keys_neq!(hoster, bid.bidder, MarketError::BidderCannotHost);

    match bid.status {
        BidStatus::Open | BidStatus::Accepted => {}
        BidStatus::Pinned | BidStatus::Satisfied => {
            return Ok(Outcome::AcceptRejected {
                bid_id: bid.id,
                reason: reason::ALREADY_PINNED,
            })
        }
        _ => {
            return Ok(Outcome::AcceptRejected {
                bid_id: bid.id,
                reason: reason::BID_CLOSED,
            })
        }
    }

    if bid.hoster != Pubkey::default() {
        let available_at = bid
            .accepted_at
            .checked_add(hold)
            .ok_or(MarketError::ArithmeticOverflow)?;
        if now < available_at {
            return Ok(Outcome::AcceptWait {
                bid_id: bid.id,
                candidate: bid.hoster,
                available_at,
            });
        }
    }

    if bid.status == BidStatus::Open {
        bid.set_status(BidStatus::Accepted)?;
    }
    bid.hoster = hoster;
    bid.accepted_at = now;

    Ok(Outcome::Accepted {
        bid_id: bid.id,
        hoster,
    })
}

/// Hoster declares a validation bid pinned.
///
/// The sitting candidate may always pin. Anyone else may pin only when no
/// candidate holds the bid.
pub fn confirm_pin(bid: &mut Bid, caller: Pubkey, now: i64, hold: i64) -> Result<Outcome> {
    bid.require_kind(QuorumKind::Validation)?;
    require_keys_neq!(caller, bid.bidder, MarketError::BidderCannotHost);

    match bid.status {
        BidStatus::Open | BidStatus::Accepted => {}
        BidStatus::Pinned | BidStatus::Satisfied => {
            return Ok(Outcome::PinRejected {
                bid_id: bid.id,
                reason: reason::ALREADY_PINNED,
            })
        }
        _ => {
            return Ok(Outcome::PinRejected {
                bid_id: bid.id,
                reason: reason::BID_CLOSED,
            })
        }
    }

    if bid.hoster != Pubkey::default() && bid.hoster != caller {
        let hold_ends = bid
            .accepted_at
            .checked_add(hold)
            .ok_or(MarketError::ArithmeticOverflow)?;
        require!(now >= hold_ends, MarketError::NotCandidateHoster);
    }

    bid.set_status(BidStatus::Pinned)?;
    bid.hoster = caller;
    bid.pinned_at = now;

    Ok(Outcome::Pinned {
        bid_id: bid.id,
        hoster: caller,
    })
}

/// Record one validator verdict, pay the validator's pool share and settle
/// the hoster on first satisfaction.
#[allow(clippy::too_many_arguments)]
pub fn record_validation(
    market: &mut MarketConfig,
    bid: &mut Bid,
    record: &mut ValidationRecord,
    validator_balance: &mut Balance,
    hoster_balance: &mut Balance,
    validator: Pubkey,
    is_valid: bool,
    now: i64,
    bump: u8,
) -> Result<Outcome> {
    bid.require_kind(QuorumKind::Validation)?;
    require_keys_neq!(validator, bid.bidder, MarketError::BidderCannotValidate);
    require!(bid.is_pinned(), MarketError::BidNotPinned);
    require_keys_neq!(validator, bid.hoster, MarketError::HosterCannotValidate);

    if record.is_recorded() {
        return Ok(Outcome::ValidationRejected {
            bid_id: bid.id,
            reason: reason::DUPLICATE_VALIDATION,
        });
    }

    let index = bid.validation_count;
    let paid = index < bid.quorum_value;
    let payment = if paid { bid.validator_share() } else { 0 };

    record.bid_id = bid.id;
    record.index = index;
    record.validator = validator;
    record.is_valid = is_valid;
    record.paid = paid;
    record.timestamp = now;
    record.bump = bump;

    bid.validation_count = index
        .checked_add(1)
        .ok_or(MarketError::ArithmeticOverflow)?;
    if is_valid {
        bid.true_votes = bid
            .true_votes
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
    } else {
        bid.false_votes = bid
            .false_votes
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
    }

    if payment > 0 {
        bid.take_escrow(payment)?;
        market.release_escrow(payment)?;
        validator_balance.credit(payment)?;
    }

    let satisfied_now = bid.is_newly_satisfied();
    if satisfied_now {
        bid.take_escrow(bid.price)?;
        market.release_escrow(bid.price)?;
        hoster_balance.credit(bid.price)?;
        bid.settled = true;
        bid.set_status(BidStatus::Satisfied)?;
    }

    Ok(Outcome::Validated {
        bid_id: bid.id,
        is_valid,
        sway: bid.validation_sway(),
        payment,
        satisfied_now,
    })
}
