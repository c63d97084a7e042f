//! Shared constants for instruction handlers

/// One day in seconds (86400)
pub const WINDOW_24H: i64 = 86_400;

// ============================================================================
// Market Parameter Defaults
// ============================================================================

/// Default minimum bid price in lamports
pub const DEFAULT_MIN_BID: u64 = 1;

/// Default minimum hosting duration in seconds (1 day)
pub const DEFAULT_MIN_DURATION: i64 = WINDOW_24H;

/// Default time a candidate hoster holds a bid before others may accept (1 hour)
pub const DEFAULT_ACCEPT_HOLD_DURATION: i64 = 3_600;

/// Default number of validators required when a bid does not specify a quorum
pub const DEFAULT_MIN_VALIDATIONS: u16 = 3;

/// Default time pinners have to defend a raised challenge (1 day)
pub const DEFAULT_DEFENSE_WINDOW: i64 = WINDOW_24H;

// ============================================================================
// Quorum Bounds
// ============================================================================

/// Largest validator quorum a bid may request
pub const MAX_VALIDATORS: u16 = 64;

/// Smallest pinner count for pinner-count bids; two pinners are needed to contest a claim
pub const MIN_PINNERS: u16 = 2;

/// Largest pinner count a bid may request
pub const MAX_PINNERS: u16 = 16;

// ============================================================================
// Account Capacity
// ============================================================================

/// Maximum identities in a ledger writer set
pub const MAX_WRITERS: usize = 4;

/// Maximum named routes held by the router
pub const MAX_ROUTES: usize = 8;

/// Maximum byte length of a string config value
pub const MAX_ENV_STR_LEN: usize = 64;

// ============================================================================
// Content Hashes
// ============================================================================

/// Content hash of a zero-length file. Bids for it are rejected.
pub const EMPTY_FILE_HASH: [u8; 32] = [
    0xbf, 0xcc, 0xda, 0x78, 0x7b, 0xab, 0xa3, 0x2b, 0x59, 0xc7, 0x84, 0x50, 0xac, 0x3d, 0x20, 0xb6,
    0x33, 0x36, 0x0b, 0x43, 0x99, 0x2c, 0x77, 0x28, 0x9f, 0x9e, 0xd4, 0x6d, 0x84, 0x35, 0x61, 0xe6,
];

/// Prefix applied by `eth_sign` before hashing a 32-byte message
pub const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

// ============================================================================
// Config and Router Names
// ============================================================================

/// Env key name for the minimum bid price
pub const ENV_MIN_BID: &str = "minBid";

/// Env key name for the minimum hosting duration
pub const ENV_MIN_DURATION: &str = "minDuration";

/// Env key name for the accept hold duration
pub const ENV_ACCEPT_HOLD_DURATION: &str = "acceptHoldDuration";

/// Env key name for the default validator quorum
pub const ENV_DEFAULT_MIN_VALIDATIONS: &str = "defaultMinValidations";

/// Env key name for the challenge defense window
pub const ENV_DEFENSE_WINDOW: &str = "defenseWindow";

pub const ROUTE_BID_STORE: &str = "BidStore";
pub const ROUTE_STAKE_STORE: &str = "StakeStore";
pub const ROUTE_CHALLENGE_STORE: &str = "ChallengeStore";
pub const ROUTE_DEFENSE_STORE: &str = "DefenseStore";
