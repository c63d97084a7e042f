//! Events emitted by the Scatter storage marketplace
//!
//! Soft rejections are reported through events rather than errors, so
//! clients must inspect the emitted events to learn whether a call was honored.

use anchor_lang::prelude::*;

// ============================================================================
// Registry and config
// ============================================================================

/// Emitted when a router entry is created or replaced
#[event]
pub struct RouteSet {
    pub name_hash: [u8; 32],
    pub target: Pubkey,
    pub timestamp: i64,
}

/// Emitted when a config value is written
#[event]
pub struct EnvValueSet {
    pub key: [u8; 32],
    pub kind: u8,
    pub timestamp: i64,
}

/// Emitted when an account is banned or unbanned
#[event]
pub struct BanUpdated {
    pub account: Pubkey,
    pub banned: bool,
    pub timestamp: i64,
}

/// Emitted when an account registers its file
#[event]
pub struct UserRegistered {
    pub user: Pubkey,
    pub file_hash: [u8; 32],
    pub timestamp: i64,
}

// ============================================================================
// Ledgers and market wiring
// ============================================================================

/// Emitted when a fresh ledger set is created
#[event]
pub struct LedgersInitialized {
    pub generation: u8,
    pub owner: Pubkey,
    pub timestamp: i64,
}

/// Emitted when a ledger writer is granted or revoked
#[event]
pub struct WriterUpdated {
    pub ledger: Pubkey,
    pub kind: u8,
    pub writer: Pubkey,
    pub granted: bool,
    pub timestamp: i64,
}

/// Emitted when the market is created
#[event]
pub struct MarketInitialized {
    pub authority: Pubkey,
    pub router: Pubkey,
    pub timestamp: i64,
}

/// Emitted when ledger identities are re-resolved through the router
#[event]
pub struct ReferencesUpdated {
    pub bid_ledger: Pubkey,
    pub stake_ledger: Pubkey,
    pub challenge_ledger: Pubkey,
    pub defense_ledger: Pubkey,
    pub timestamp: i64,
}

/// Emitted when market parameters are copied from the config store
#[event]
pub struct ParamsSynced {
    pub min_bid: u64,
    pub min_duration: i64,
    pub accept_hold_duration: i64,
    pub default_min_validations: u16,
    pub defense_window: i64,
    pub timestamp: i64,
}

// ============================================================================
// Bids
// ============================================================================

/// Emitted when a bid is recorded and its value escrowed
#[event]
pub struct BidSuccessful {
    pub bid_id: u64,
    pub bidder: Pubkey,
    pub price: u64,
    pub validation_pool: u64,
    pub file_hash: [u8; 32],
    pub file_size: u64,
    pub timestamp: i64,
}

/// Emitted when a bid is rejected; no state changes
#[event]
pub struct BidInvalid {
    pub bidder: Pubkey,
    pub reason: String,
    pub timestamp: i64,
}

/// Emitted when a caller becomes the candidate hoster
#[event]
pub struct Accepted {
    pub bid_id: u64,
    pub hoster: Pubkey,
    pub timestamp: i64,
}

/// Emitted when another candidate still holds the bid
#[event]
pub struct AcceptWait {
    pub bid_id: u64,
    pub hoster: Pubkey,
    pub candidate: Pubkey,
    pub available_at: i64,
    pub timestamp: i64,
}

/// Emitted when a bid can no longer be accepted
#[event]
pub struct AcceptRejected {
    pub bid_id: u64,
    pub hoster: Pubkey,
    pub reason: String,
    pub timestamp: i64,
}

/// Emitted when a bid reaches its satisfaction condition
#[event]
pub struct BidSatisfied {
    pub bid_id: u64,
    pub hoster: Pubkey,
    pub price: u64,
    pub timestamp: i64,
}

// ============================================================================
// Stakes and pins
// ============================================================================

/// Emitted when collateral is added toward pinning a bid
#[event]
pub struct PinStake {
    pub bid_id: u64,
    pub staker: Pubkey,
    pub amount: u64,
    pub value: u64,
    pub nonce: u64,
    pub timestamp: i64,
}

/// Emitted when the accepted hoster pins a validation bid
#[event]
pub struct Pinned {
    pub bid_id: u64,
    pub hoster: Pubkey,
    pub timestamp: i64,
}

/// Emitted when a staked pinner pins a pinner-count bid
#[event]
pub struct FilePinned {
    pub bid_id: u64,
    pub pinner: Pubkey,
    pub pinner_count: u16,
    pub timestamp: i64,
}

/// Emitted when a caller without stake attempts to pin
#[event]
pub struct NotOpenToPin {
    pub bid_id: u64,
    pub pinner: Pubkey,
    pub timestamp: i64,
}

/// Emitted when a pin attempt is refused
#[event]
pub struct PinRejected {
    pub bid_id: u64,
    pub pinner: Pubkey,
    pub reason: String,
    pub timestamp: i64,
}

/// Emitted when stake is returned to a staker's balance
#[event]
pub struct StakeReleased {
    pub bid_id: u64,
    pub staker: Pubkey,
    pub value: u64,
    pub reward: u64,
    pub timestamp: i64,
}

// ============================================================================
// Validation
// ============================================================================

/// Emitted when a validator's verdict is recorded
#[event]
pub struct ValidationOccurred {
    pub bid_id: u64,
    pub validator: Pubkey,
    pub is_valid: bool,
    pub sway: i64,
    pub payment: u64,
    pub timestamp: i64,
}

/// Emitted when a verdict is refused
#[event]
pub struct ValidationRejected {
    pub bid_id: u64,
    pub validator: Pubkey,
    pub reason: String,
    pub timestamp: i64,
}

// ============================================================================
// Challenges and defenses
// ============================================================================

/// Emitted when a challenge is raised against a fully pinned bid
#[event]
pub struct Challenge {
    pub challenge_id: u64,
    pub bid_id: u64,
    pub issuer: Pubkey,
    pub deadline: i64,
    pub timestamp: i64,
}

/// Emitted when a pinner's defense reconstructs and verifies
#[event]
pub struct Defense {
    pub defense_id: u64,
    pub challenge_id: u64,
    pub bid_id: u64,
    pub pinner: Pubkey,
    pub nonce: u64,
    pub timestamp: i64,
}

/// Emitted when a challenge fails and the bid's escrow goes back to the bidder
#[event]
pub struct DefenseFail {
    pub challenge_id: u64,
    pub bid_id: u64,
    /// Pinner whose defense failed; default key when the window expired
    pub pinner: Pubkey,
    pub stakes_burned: u16,
    pub value_burned: u64,
    /// Non-zero stakes still waiting for `burn_stakes`
    pub stakes_outstanding: u16,
    pub refunded: u64,
    pub timestamp: i64,
}

/// Emitted when leftover stakes of a failed bid are burned
#[event]
pub struct StakesBurned {
    pub bid_id: u64,
    pub stakes_burned: u16,
    pub value_burned: u64,
    pub stakes_outstanding: u16,
    pub timestamp: i64,
}

/// Emitted when an undefended challenge is closed after its deadline
#[event]
pub struct ChallengeExpired {
    pub challenge_id: u64,
    pub bid_id: u64,
    pub defended: u16,
    pub pinners: u16,
    pub timestamp: i64,
}

/// Emitted when a writer appends a raw ledger record directly
#[event]
pub struct RecordAppended {
    pub ledger: Pubkey,
    pub record_id: u64,
    pub writer: Pubkey,
    pub timestamp: i64,
}

// ============================================================================
// Withdrawals
// ============================================================================

/// Emitted when an account withdraws its owed balance
#[event]
pub struct Withdraw {
    pub account: Pubkey,
    pub value: u64,
    pub timestamp: i64,
}

/// Emitted when a bid's hoster withdraws its payout
#[event]
pub struct WithdrawHoster {
    pub bid_id: u64,
    pub hoster: Pubkey,
    pub value: u64,
    pub timestamp: i64,
}

/// Emitted when a withdrawal is refused; no balances change
#[event]
pub struct WithdrawFailed {
    pub account: Pubkey,
    pub reason: String,
    pub timestamp: i64,
}
