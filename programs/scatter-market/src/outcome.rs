//! Results of market state transitions
//!
//! Helpers return `Result<Outcome>`. The `Err` branch aborts the whole
//! instruction; every `Outcome` commits, including the rejection variants,
//! which leave state untouched and are reported to clients as events.

use anchor_lang::prelude::*;

/// Rejection reasons carried by soft-failure events
pub mod reason {
    pub const BIDDER_BANNED: &str = "bidder banned";
    pub const VALUE_MISMATCH: &str = "value mismatch";
    pub const INVALID_FILE_HASH: &str = "invalid file hash";
    pub const EMPTY_FILE_HASH: &str = "empty file hash";
    pub const INVALID_FILE_SIZE: &str = "invalid file size";
    pub const ZERO_PRICE: &str = "zero price";
    pub const BELOW_MIN_BID: &str = "below minimum bid";
    pub const BELOW_MIN_DURATION: &str = "below minimum duration";
    pub const INVALID_QUORUM: &str = "invalid quorum";
    pub const POOL_NEEDS_VALIDATION: &str = "pool requires validation quorum";
    pub const INDIVISIBLE_POOL: &str = "indivisible validation pool";

    pub const ALREADY_PINNED: &str = "already pinned";
    pub const BID_CLOSED: &str = "bid closed";
    pub const FULLY_PINNED: &str = "fully pinned";

    pub const DUPLICATE_VALIDATION: &str = "duplicate validation";

    pub const ZERO_BALANCE: &str = "zero balance";
    pub const INVALID_WITHDRAWER: &str = "invalid withdrawer";
    pub const NOT_SATISFIED: &str = "bid not satisfied";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    BidSuccessful {
        bid_id: u64,
    },
    BidInvalid {
        reason: &'static str,
    },
    Accepted {
        bid_id: u64,
        hoster: Pubkey,
    },
    AcceptWait {
        bid_id: u64,
        candidate: Pubkey,
        available_at: i64,
    },
    AcceptRejected {
        bid_id: u64,
        reason: &'static str,
    },
    PinStake {
        bid_id: u64,
        value: u64,
        nonce: u64,
    },
    Pinned {
        bid_id: u64,
        hoster: Pubkey,
    },
    FilePinned {
        bid_id: u64,
        pinner_count: u16,
        /// Second pinner arrived; a challenge must be raised
        raises_challenge: bool,
    },
    NotOpenToPin {
        bid_id: u64,
    },
    PinRejected {
        bid_id: u64,
        reason: &'static str,
    },
    Validated {
        bid_id: u64,
        is_valid: bool,
        sway: i64,
        payment: u64,
        /// Quorum first satisfied by this vote; the hoster was credited
        satisfied_now: bool,
    },
    ValidationRejected {
        bid_id: u64,
        reason: &'static str,
    },
    Defended {
        bid_id: u64,
        /// Every pinner has now defended
        satisfied_now: bool,
    },
    DefenseFailed {
        bid_id: u64,
    },
    StakesBurned {
        bid_id: u64,
        stakes_burned: u16,
        value_burned: u64,
    },
    StakeReleased {
        bid_id: u64,
        value: u64,
        reward: u64,
    },
    Withdrawn {
        value: u64,
    },
    WithdrawFailed {
        reason: &'static str,
    },
}

impl Outcome {
    /// Soft failure: the call completed but nothing changed
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Outcome::BidInvalid { .. }
                | Outcome::AcceptWait { .. }
                | Outcome::AcceptRejected { .. }
                | Outcome::NotOpenToPin { .. }
                | Outcome::PinRejected { .. }
                | Outcome::ValidationRejected { .. }
                | Outcome::WithdrawFailed { .. }
        )
    }
}
