//! Account state structures for the Scatter storage marketplace

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::instructions::constants::*;
use crate::utils::writers::{WriteGuarded, WriterSet};

// ============================================================================
// Size Constants
// ============================================================================

/// Size of content hashes and config keys
pub const HASH_SIZE: usize = 32;

/// Size of each half of a content hash revealed in a defense
pub const HALF_HASH_SIZE: usize = 16;

/// Size of an Ethereum-style secp256k1 address
pub const ETH_ADDRESS_SIZE: usize = 20;

/// Current market account layout version
pub const CURRENT_PROTOCOL_VERSION: u8 = 1;

/// Minimum supported market account layout version
pub const MIN_SUPPORTED_VERSION: u8 = 1;

// ============================================================================
// Enums
// ============================================================================

/// How a bid decides it has been honored
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Default, InitSpace, Debug)]
#[repr(u8)]
pub enum QuorumKind {
    /// One accepted hoster; validators vote on the result and share the pool
    #[default]
    Validation = 0,
    /// N staked pinners; contested by challenge and defense
    PinnerCount = 1,
}

/// Quorum requested at bid time
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct Quorum {
    pub kind: QuorumKind,
    pub value: u16,
}

/// Bid lifecycle status
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Default, InitSpace, Debug)]
#[repr(u8)]
pub enum BidStatus {
    #[default]
    Open = 0,
    Accepted = 1,
    Pinned = 2,
    PartiallyPinned = 3,
    Challenged = 4,
    Satisfied = 5,
    Failed = 6,
}

impl BidStatus {
    /// Validates whether a status transition is allowed.
    ///
    /// Validation bids:
    /// - Open → Accepted (first candidate hoster)
    /// - Open → Pinned, Accepted → Pinned (hoster confirms the pin)
    /// - Pinned → Satisfied (validator quorum reached with positive sway)
    ///
    /// Pinner-count bids:
    /// - Open → PartiallyPinned (first staked pin)
    /// - PartiallyPinned → Challenged (required pinner count reached)
    /// - Challenged → Satisfied (every pinner defended)
    /// - Challenged → Failed (a defense failed or the window expired)
    ///
    /// Terminal states (Satisfied, Failed) cannot transition to any other state.
    pub fn can_transition_to(&self, new_status: BidStatus) -> bool {
        use BidStatus::*;
        matches!(
            (self, new_status),
            (Open, Accepted) | (Open, Pinned) | (Accepted, Pinned) | (Pinned, Satisfied) |
            (Open, PartiallyPinned) | (PartiallyPinned, Challenged) |
            (Challenged, Satisfied) | (Challenged, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BidStatus::Satisfied | BidStatus::Failed)
    }
}

/// Ledger selector for writer management
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum LedgerKind {
    Bid = 0,
    Stake = 1,
    Challenge = 2,
    Defense = 3,
}

/// Typed slot of a config entry
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum EnvValueKind {
    Uint = 0,
    Str = 1,
    Bytes32 = 2,
}

// ============================================================================
// Service registry
// ============================================================================

/// One named route
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Default, InitSpace)]
pub struct RouteEntry {
    pub name_hash: [u8; 32],
    pub target: Pubkey,
}

/// Name → identity lookup used to wire the market to its ledgers
/// PDA seeds: ["router"]
#[account]
#[derive(Default, InitSpace)]
pub struct Router {
    /// Only the owner may set routes
    pub owner: Pubkey,
    /// Only the first `route_count` entries are valid
    pub routes: [RouteEntry; MAX_ROUTES],
    pub route_count: u8,
    pub bump: u8,
}

impl Router {
    pub const SIZE: usize = 8 + // discriminator
        32 + // owner
        ((32 + 32) * MAX_ROUTES) + // routes
        1 +  // route_count
        1; // bump

    /// Resolve a name hash. Returns the default key when no route exists.
    pub fn get(&self, name_hash: &[u8; 32]) -> Pubkey {
        self.routes[..self.route_count as usize]
            .iter()
            .find(|r| &r.name_hash == name_hash)
            .map(|r| r.target)
            .unwrap_or_default()
    }

    /// Insert or replace a route. Owner checks happen in the handler.
    pub fn set(&mut self, name_hash: [u8; 32], target: Pubkey) -> Result<()> {
        let count = self.route_count as usize;
        if let Some(entry) = self.routes[..count]
            .iter_mut()
            .find(|r| r.name_hash == name_hash)
        {
            entry.target = target;
            return Ok(());
        }
        require!(count < MAX_ROUTES, MarketError::RouterFull);
        self.routes[count] = RouteEntry { name_hash, target };
        self.route_count += 1;
        Ok(())
    }
}

// ============================================================================
// Config store
// ============================================================================

/// Config store root
/// PDA seeds: ["env"]
#[account]
#[derive(Default, InitSpace)]
pub struct EnvRegistry {
    pub owner: Pubkey,
    pub entry_count: u64,
    pub ban_count: u64,
    pub bump: u8,
}

impl EnvRegistry {
    pub const SIZE: usize = 8 + // discriminator
        32 + // owner
        8 +  // entry_count
        8 +  // ban_count
        1; // bump
}

/// Typed values stored under one key
/// PDA seeds: ["env_entry", key]
#[account]
#[derive(Default, InitSpace)]
pub struct EnvEntry {
    pub key: [u8; 32],
    pub uint_value: u64,
    #[max_len(64)]
    pub str_value: String,
    pub bytes32_value: [u8; 32],
    pub updated_at: i64,
    pub bump: u8,
}

impl EnvEntry {
    pub const SIZE: usize = 8 + // discriminator
        32 + // key
        8 +  // uint_value
        (4 + MAX_ENV_STR_LEN) + // str_value
        32 + // bytes32_value
        8 +  // updated_at
        1; // bump
}

/// Presence marks an account as banned; unban closes it
/// PDA seeds: ["ban", account]
#[account]
#[derive(Default, InitSpace)]
pub struct BanRecord {
    pub account: Pubkey,
    pub banned_at: i64,
    pub bump: u8,
}

impl BanRecord {
    pub const SIZE: usize = 8 + // discriminator
        32 + // account
        8 +  // banned_at
        1; // bump
}

/// Registered file for an account
/// PDA seeds: ["user", authority]
#[account]
#[derive(Default, InitSpace)]
pub struct UserRecord {
    pub authority: Pubkey,
    pub file_hash: [u8; 32],
    pub registered_at: i64,
    pub bump: u8,
}

impl UserRecord {
    pub const SIZE: usize = 8 + // discriminator
        32 + // authority
        32 + // file_hash
        8 +  // registered_at
        1; // bump

    /// Zero hash means unregistered
    pub fn file(&self) -> [u8; 32] {
        self.file_hash
    }
}

// ============================================================================
// Market
// ============================================================================

/// Marketplace coordinator state and value vault
/// PDA seeds: ["market"]
#[account]
#[derive(InitSpace)]
pub struct MarketConfig {
    /// May refresh references
    pub authority: Pubkey,
    /// Router used to resolve ledger identities
    pub router: Pubkey,
    pub bid_ledger: Pubkey,
    pub stake_ledger: Pubkey,
    pub challenge_ledger: Pubkey,
    pub defense_ledger: Pubkey,
    /// Minimum bid price in lamports
    pub min_bid: u64,
    /// Minimum hosting duration in seconds
    pub min_duration: i64,
    /// Seconds a candidate hoster holds a bid
    pub accept_hold_duration: i64,
    /// Quorum used when a bid does not name one
    pub default_min_validations: u16,
    /// Seconds pinners have to answer a challenge
    pub defense_window: i64,
    /// Price and pool held for open bids
    pub total_escrowed: u64,
    /// Collateral held for pinners
    pub total_staked: u64,
    /// Collateral destroyed by failed challenges; never leaves the vault
    pub total_burned: u64,
    /// Credited to balances and awaiting withdrawal
    pub total_owed: u64,
    pub protocol_version: u8,
    pub min_supported_version: u8,
    pub bump: u8,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            authority: Pubkey::default(),
            router: Pubkey::default(),
            bid_ledger: Pubkey::default(),
            stake_ledger: Pubkey::default(),
            challenge_ledger: Pubkey::default(),
            defense_ledger: Pubkey::default(),
            min_bid: DEFAULT_MIN_BID,
            min_duration: DEFAULT_MIN_DURATION,
            accept_hold_duration: DEFAULT_ACCEPT_HOLD_DURATION,
            default_min_validations: DEFAULT_MIN_VALIDATIONS,
            defense_window: DEFAULT_DEFENSE_WINDOW,
            total_escrowed: 0,
            total_staked: 0,
            total_burned: 0,
            total_owed: 0,
            protocol_version: CURRENT_PROTOCOL_VERSION,
            min_supported_version: MIN_SUPPORTED_VERSION,
            bump: 0,
        }
    }
}

impl MarketConfig {
    pub const SIZE: usize = 8 + // discriminator
        32 + // authority
        32 + // router
        32 + // bid_ledger
        32 + // stake_ledger
        32 + // challenge_ledger
        32 + // defense_ledger
        8 +  // min_bid
        8 +  // min_duration
        8 +  // accept_hold_duration
        2 +  // default_min_validations
        8 +  // defense_window
        8 +  // total_escrowed
        8 +  // total_staked
        8 +  // total_burned
        8 +  // total_owed
        1 +  // protocol_version
        1 +  // min_supported_version
        1; // bump

    /// Sum of value the vault must hold above its rent reserve
    pub fn total_held(&self) -> Option<u64> {
        self.total_escrowed
            .checked_add(self.total_staked)?
            .checked_add(self.total_burned)?
            .checked_add(self.total_owed)
    }

    pub fn escrow(&mut self, amount: u64) -> Result<()> {
        self.total_escrowed = self
            .total_escrowed
            .checked_add(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Move escrowed value to balances owed
    pub fn release_escrow(&mut self, amount: u64) -> Result<()> {
        self.total_escrowed = self
            .total_escrowed
            .checked_sub(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        self.owe(amount)
    }

    pub fn lock_stake(&mut self, amount: u64) -> Result<()> {
        self.total_staked = self
            .total_staked
            .checked_add(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Move staked value to balances owed
    pub fn release_stake(&mut self, amount: u64) -> Result<()> {
        self.total_staked = self
            .total_staked
            .checked_sub(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        self.owe(amount)
    }

    pub fn burn_stake(&mut self, amount: u64) -> Result<()> {
        self.total_staked = self
            .total_staked
            .checked_sub(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        self.total_burned = self
            .total_burned
            .checked_add(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(())
    }

    fn owe(&mut self, amount: u64) -> Result<()> {
        self.total_owed = self
            .total_owed
            .checked_add(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Value leaves the vault
    pub fn pay_out(&mut self, amount: u64) -> Result<()> {
        self.total_owed = self
            .total_owed
            .checked_sub(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(())
    }
}

// ============================================================================
// Ledgers
// ============================================================================

/// Authoritative store of bids
/// PDA seeds: ["bid_ledger", generation]
#[account]
#[derive(Default, InitSpace)]
pub struct BidLedger {
    pub writers: WriterSet,
    pub generation: u8,
    /// Ids run 1..=bid_count; 0 is never assigned
    pub bid_count: u64,
    pub bump: u8,
}

impl BidLedger {
    pub const SIZE: usize = 8 + // discriminator
        WriterSet::SIZE + // writers
        1 +  // generation
        8 +  // bid_count
        1; // bump

    pub fn next_id(&self) -> u64 {
        self.bid_count.saturating_add(1)
    }

    pub fn bid_exists(&self, id: u64) -> bool {
        id != 0 && id <= self.bid_count
    }

    /// Reserve the next bid id
    pub fn add_bid(&mut self, caller: &Pubkey) -> Result<u64> {
        self.require_writer(caller)?;
        self.bid_count = self
            .bid_count
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(self.bid_count)
    }
}

impl WriteGuarded for BidLedger {
    fn writer_set(&self) -> &WriterSet {
        &self.writers
    }

    fn writer_set_mut(&mut self) -> &mut WriterSet {
        &mut self.writers
    }
}

/// Per-bid, per-account pinning collateral
/// PDA seeds: ["stake_ledger", generation]
#[account]
#[derive(Default, InitSpace)]
pub struct StakeLedger {
    pub writers: WriterSet,
    pub generation: u8,
    /// Sum of all non-zero stake values
    pub total_staked: u64,
    pub bump: u8,
}

impl StakeLedger {
    pub const SIZE: usize = 8 + // discriminator
        WriterSet::SIZE + // writers
        1 +  // generation
        8 +  // total_staked
        1; // bump

    /// Add `value` to a stake and bump its nonce
    pub fn add_stake(
        &mut self,
        caller: &Pubkey,
        record: &mut StakeRecord,
        tally: &mut StakeTally,
        value: u64,
    ) -> Result<()> {
        self.require_writer(caller)?;
        require!(value > 0, MarketError::InvalidStakeAmount);

        if record.value == 0 {
            tally.stake_count = tally
                .stake_count
                .checked_add(1)
                .ok_or(MarketError::ArithmeticOverflow)?;
        }
        record.value = record
            .value
            .checked_add(value)
            .ok_or(MarketError::ArithmeticOverflow)?;
        record.nonce = record
            .nonce
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
        tally.total_value = tally
            .total_value
            .checked_add(value)
            .ok_or(MarketError::ArithmeticOverflow)?;
        self.total_staked = self
            .total_staked
            .checked_add(value)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Zero a stake, returning the value it held. The nonce is untouched.
    pub fn zero(
        &mut self,
        caller: &Pubkey,
        record: &mut StakeRecord,
        tally: &mut StakeTally,
    ) -> Result<u64> {
        self.require_writer(caller)?;
        let value = record.value;
        if value == 0 {
            return Ok(0);
        }
        record.value = 0;
        tally.stake_count = tally
            .stake_count
            .checked_sub(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
        tally.total_value = tally
            .total_value
            .checked_sub(value)
            .ok_or(MarketError::ArithmeticOverflow)?;
        self.total_staked = self
            .total_staked
            .checked_sub(value)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(value)
    }
}

impl WriteGuarded for StakeLedger {
    fn writer_set(&self) -> &WriterSet {
        &self.writers
    }

    fn writer_set_mut(&mut self) -> &mut WriterSet {
        &mut self.writers
    }
}

/// Append-only log of challenges
/// PDA seeds: ["challenge_ledger", generation]
#[account]
#[derive(Default, InitSpace)]
pub struct ChallengeLedger {
    pub writers: WriterSet,
    pub generation: u8,
    pub challenge_count: u64,
    pub bump: u8,
}

impl ChallengeLedger {
    pub const SIZE: usize = 8 + // discriminator
        WriterSet::SIZE + // writers
        1 +  // generation
        8 +  // challenge_count
        1; // bump

    pub fn next_id(&self) -> u64 {
        self.challenge_count.saturating_add(1)
    }

    pub fn challenge_exists(&self, id: u64) -> bool {
        id != 0 && id <= self.challenge_count
    }

    pub fn add_challenge(&mut self, caller: &Pubkey) -> Result<u64> {
        self.require_writer(caller)?;
        self.challenge_count = self
            .challenge_count
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(self.challenge_count)
    }
}

impl WriteGuarded for ChallengeLedger {
    fn writer_set(&self) -> &WriterSet {
        &self.writers
    }

    fn writer_set_mut(&mut self) -> &mut WriterSet {
        &mut self.writers
    }
}

/// Append-only log of defenses
/// PDA seeds: ["defense_ledger", generation]
#[account]
#[derive(Default, InitSpace)]
pub struct DefenseLedger {
    pub writers: WriterSet,
    pub generation: u8,
    pub defense_count: u64,
    pub bump: u8,
}

impl DefenseLedger {
    pub const SIZE: usize = 8 + // discriminator
        WriterSet::SIZE + // writers
        1 +  // generation
        8 +  // defense_count
        1; // bump

    pub fn next_id(&self) -> u64 {
        self.defense_count.saturating_add(1)
    }

    pub fn defense_exists(&self, id: u64) -> bool {
        id != 0 && id <= self.defense_count
    }

    pub fn add_defense(&mut self, caller: &Pubkey) -> Result<u64> {
        self.require_writer(caller)?;
        self.defense_count = self
            .defense_count
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(self.defense_count)
    }
}

impl WriteGuarded for DefenseLedger {
    fn writer_set(&self) -> &WriterSet {
        &self.writers
    }

    fn writer_set_mut(&mut self) -> &mut WriterSet {
        &mut self.writers
    }
}

// ============================================================================
// Records
// ============================================================================

/// A request, with escrowed payment, to host a file
/// PDA seeds: ["bid", bid_ledger, id]
#[account]
#[derive(InitSpace)]
pub struct Bid {
    pub id: u64,
    pub bidder: Pubkey,
    pub file_hash: [u8; 32],
    /// File size in bytes
    pub file_size: u64,
    pub price: u64,
    /// Shared among the first `quorum_value` validators
    pub validation_pool: u64,
    /// Requested hosting duration in seconds
    pub duration: i64,
    pub quorum_kind: QuorumKind,
    /// Validators required (Validation) or pinners required (PinnerCount)
    pub quorum_value: u16,
    pub created_at: i64,
    pub status: BidStatus,
    /// Candidate hoster, then confirmed hoster once pinned (Validation)
    pub hoster: Pubkey,
    pub accepted_at: i64,
    pub pinned_at: i64,
    /// Price plus pool not yet credited to anyone
    pub escrow_remaining: u64,
    pub validation_count: u16,
    pub true_votes: u16,
    pub false_votes: u16,
    /// Staked accounts that have pinned (PinnerCount)
    pub pinner_count: u16,
    pub challenge_id: u64,
    pub challenge_deadline: i64,
    pub valid_defenses: u16,
    /// Pinners paid out after satisfaction
    pub released_count: u16,
    /// Set once the bid's payout has been credited
    pub settled: bool,
    /// Hoster took the payout through `withdraw_bid`
    pub payout_withdrawn: bool,
    pub bump: u8,
}

impl Default for Bid {
    fn default() -> Self {
        Self {
            id: 0,
            bidder: Pubkey::default(),
            file_hash: [0u8; 32],
            file_size: 0,
            price: 0,
            validation_pool: 0,
            duration: 0,
            quorum_kind: QuorumKind::Validation,
            quorum_value: 0,
            created_at: 0,
            status: BidStatus::Open,
            hoster: Pubkey::default(),
            accepted_at: 0,
            pinned_at: 0,
            escrow_remaining: 0,
            validation_count: 0,
            true_votes: 0,
            false_votes: 0,
            pinner_count: 0,
            challenge_id: 0,
            challenge_deadline: 0,
            valid_defenses: 0,
            released_count: 0,
            settled: false,
            payout_withdrawn: false,
            bump: 0,
        }
    }
}

impl Bid {
    pub const SIZE: usize = 8 + // discriminator
        8 +  // id
        32 + // bidder
        32 + // file_hash
        8 +  // file_size
        8 +  // price
        8 +  // validation_pool
        8 +  // duration
        1 +  // quorum_kind
        2 +  // quorum_value
        8 +  // created_at
        1 +  // status
        32 + // hoster
        8 +  // accepted_at
        8 +  // pinned_at
        8 +  // escrow_remaining
        2 +  // validation_count
        2 +  // true_votes
        2 +  // false_votes
        2 +  // pinner_count
        8 +  // challenge_id
        8 +  // challenge_deadline
        2 +  // valid_defenses
        2 +  // released_count
        1 +  // settled
        1 +  // payout_withdrawn
        1; // bump

    pub fn set_status(&mut self, new_status: BidStatus) -> Result<()> {
        require!(
            self.status.can_transition_to(new_status),
            MarketError::InvalidStatusTransition
        );
        self.status = new_status;
        Ok(())
    }

    pub fn require_kind(&self, kind: QuorumKind) -> Result<()> {
        require!(self.quorum_kind == kind, MarketError::QuorumKindMismatch);
        Ok(())
    }

    /// Net validator consensus: true votes minus false votes
    pub fn validation_sway(&self) -> i64 {
        i64::from(self.true_votes) - i64::from(self.false_votes)
    }

    /// Quorum reached and true votes strictly outnumber false votes
    pub fn satisfied(&self) -> bool {
        match self.quorum_kind {
            QuorumKind::Validation => {
                self.validation_count >= self.quorum_value && self.validation_sway() > 0
            }
            QuorumKind::PinnerCount => self.status == BidStatus::Satisfied,
        }
    }

    /// Pinned by a validation hoster or fully pinned by stakers
    pub fn is_pinned(&self) -> bool {
        match self.quorum_kind {
            QuorumKind::Validation => matches!(self.status, BidStatus::Pinned | BidStatus::Satisfied),
            QuorumKind::PinnerCount => self.pinner_count >= self.quorum_value,
        }
    }

    /// First-satisfaction check for validation bids
    pub fn is_newly_satisfied(&self) -> bool {
        !self.settled && self.quorum_kind == QuorumKind::Validation && self.satisfied()
    }

    /// Per-validator share of the pool
    pub fn validator_share(&self) -> u64 {
        if self.quorum_value == 0 {
            return 0;
        }
        self.validation_pool / u64::from(self.quorum_value)
    }

    pub fn take_escrow(&mut self, amount: u64) -> Result<()> {
        self.escrow_remaining = self
            .escrow_remaining
            .checked_sub(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(())
    }
}

/// One validator's verdict on a bid
/// PDA seeds: ["validation", bid, validator]
#[account]
#[derive(Default, InitSpace)]
pub struct ValidationRecord {
    pub bid_id: u64,
    /// Position in the bid's validation sequence, starting at 0
    pub index: u16,
    pub validator: Pubkey,
    pub is_valid: bool,
    /// Whether this validator received a pool share
    pub paid: bool,
    pub timestamp: i64,
    pub bump: u8,
}

impl ValidationRecord {
    pub const SIZE: usize = 8 + // discriminator
        8 +  // bid_id
        2 +  // index
        32 + // validator
        1 +  // is_valid
        1 +  // paid
        8 +  // timestamp
        1; // bump

    /// An initialized record names its validator
    pub fn is_recorded(&self) -> bool {
        self.validator != Pubkey::default()
    }
}

/// Collateral posted by one account toward pinning one bid
/// PDA seeds: ["stake", stake_ledger, bid_id, account]
#[account]
#[derive(Default, InitSpace)]
pub struct StakeRecord {
    pub bid_id: u64,
    pub account: Pubkey,
    pub value: u64,
    /// Incremented on every add; selects defense half ordering
    pub nonce: u64,
    /// secp256k1 address that signs this staker's defenses
    pub proof_signer: [u8; 20],
    pub pinned: bool,
    pub pinned_at: i64,
    pub defended: bool,
    pub bump: u8,
}

impl StakeRecord {
    pub const SIZE: usize = 8 + // discriminator
        8 +  // bid_id
        32 + // account
        8 +  // value
        8 +  // nonce
        20 + // proof_signer
        1 +  // pinned
        8 +  // pinned_at
        1 +  // defended
        1; // bump
}

/// Per-bid stake aggregate
/// PDA seeds: ["stake_tally", stake_ledger, bid_id]
#[account]
#[derive(Default, InitSpace)]
pub struct StakeTally {
    pub bid_id: u64,
    /// Number of non-zero stake records for the bid
    pub stake_count: u16,
    pub total_value: u64,
    pub bump: u8,
}

impl StakeTally {
    pub const SIZE: usize = 8 + // discriminator
        8 +  // bid_id
        2 +  // stake_count
        8 +  // total_value
        1; // bump
}

/// A protocol-raised demand for pinners to prove possession
/// PDA seeds: ["challenge", challenge_ledger, id]
#[account]
#[derive(Default, InitSpace)]
pub struct ChallengeRecord {
    pub id: u64,
    pub bid_id: u64,
    pub issuer: Pubkey,
    pub created_at: i64,
    pub bump: u8,
}

impl ChallengeRecord {
    pub const SIZE: usize = 8 + // discriminator
        8 +  // id
        8 +  // bid_id
        32 + // issuer
        8 +  // created_at
        1; // bump
}

/// A signed half-hash reveal answering a challenge
/// PDA seeds: ["defense", defense_ledger, id]
#[account]
#[derive(Default, InitSpace)]
pub struct DefenseRecord {
    pub id: u64,
    pub bid_id: u64,
    pub challenge_id: u64,
    pub nonce: u64,
    pub defender: Pubkey,
    pub half_hash_a: [u8; 16],
    pub half_hash_b: [u8; 16],
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub timestamp: i64,
    pub bump: u8,
}

impl DefenseRecord {
    pub const SIZE: usize = 8 + // discriminator
        8 +  // id
        8 +  // bid_id
        8 +  // challenge_id
        8 +  // nonce
        32 + // defender
        16 + // half_hash_a
        16 + // half_hash_b
        1 +  // v
        32 + // r
        32 + // s
        8 +  // timestamp
        1; // bump
}

/// Value owed to an account
/// PDA seeds: ["balance", account]
#[account]
#[derive(Default, InitSpace)]
pub struct Balance {
    pub account: Pubkey,
    pub owed: u64,
    pub total_withdrawn: u64,
    pub bump: u8,
}

impl Balance {
    pub const SIZE: usize = 8 + // discriminator
        32 + // account
        8 +  // owed
        8 +  // total_withdrawn
        1; // bump

    pub fn credit(&mut self, amount: u64) -> Result<()> {
        self.owed = self
            .owed
            .checked_add(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Zero the balance, returning what was owed
    pub fn drain(&mut self) -> Result<u64> {
        let amount = self.owed;
        self.debit(amount)
    }

    /// Take up to `amount` from the balance, returning what was taken
    pub fn debit(&mut self, amount: u64) -> Result<u64> {
        let amount = amount.min(self.owed);
        self.owed -= amount;
        self.total_withdrawn = self
            .total_withdrawn
            .checked_add(amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: SIZE should equal INIT_SPACE (borsh serialized) + 8-byte discriminator.
    macro_rules! test_size_constant {
        ($struct:ty) => {
            assert_eq!(
                <$struct>::SIZE,
                <$struct as anchor_lang::Space>::INIT_SPACE + 8,
                concat!(stringify!($struct), "::SIZE mismatch with INIT_SPACE")
            );
        };
    }

    mod sizes {
        use super::*;

        #[test]
        fn test_router_size() {
            test_size_constant!(Router);
        }

        #[test]
        fn test_env_sizes() {
            test_size_constant!(EnvRegistry);
            test_size_constant!(EnvEntry);
            test_size_constant!(BanRecord);
            test_size_constant!(UserRecord);
        }

        #[test]
        fn test_market_config_size() {
            test_size_constant!(MarketConfig);
        }

        #[test]
        fn test_ledger_sizes() {
            test_size_constant!(BidLedger);
            test_size_constant!(StakeLedger);
            test_size_constant!(ChallengeLedger);
            test_size_constant!(DefenseLedger);
        }

        #[test]
        fn test_record_sizes() {
            test_size_constant!(Bid);
            test_size_constant!(ValidationRecord);
            test_size_constant!(StakeRecord);
            test_size_constant!(StakeTally);
            test_size_constant!(ChallengeRecord);
            test_size_constant!(DefenseRecord);
            test_size_constant!(Balance);
        }
    }

    mod status {
        use super::*;

        #[test]
        fn test_validation_path() {
            assert!(BidStatus::Open.can_transition_to(BidStatus::Accepted));
            assert!(BidStatus::Accepted.can_transition_to(BidStatus::Pinned));
            assert!(BidStatus::Open.can_transition_to(BidStatus::Pinned));
            assert!(BidStatus::Pinned.can_transition_to(BidStatus::Satisfied));
        }

        #[test]
        fn test_pinner_path() {
            assert!(BidStatus::Open.can_transition_to(BidStatus::PartiallyPinned));
            assert!(BidStatus::PartiallyPinned.can_transition_to(BidStatus::Challenged));
            assert!(BidStatus::Challenged.can_transition_to(BidStatus::Satisfied));
            assert!(BidStatus::Challenged.can_transition_to(BidStatus::Failed));
        }

        #[test]
        fn test_terminal_states_are_final() {
            use BidStatus::*;
            assert!(Satisfied.is_terminal() && Failed.is_terminal());
            assert!(!Challenged.is_terminal());
            for to in [Open, Accepted, Pinned, PartiallyPinned, Challenged, Satisfied, Failed] {
                assert!(!Satisfied.can_transition_to(to));
                assert!(!Failed.can_transition_to(to));
            }
        }

        #[test]
        fn test_no_skipping_challenge() {
            assert!(!BidStatus::PartiallyPinned.can_transition_to(BidStatus::Satisfied));
            assert!(!BidStatus::Open.can_transition_to(BidStatus::Challenged));
            assert!(!BidStatus::Pinned.can_transition_to(BidStatus::Failed));
        }

        #[test]
        fn test_set_status_rejects_invalid_edge() {
            let mut bid = Bid::default();
            assert!(bid.set_status(BidStatus::Satisfied).is_err());
            assert_eq!(bid.status, BidStatus::Open);
        }
    }

    mod ledgers {
        use super::*;

        fn writable<T: WriteGuarded>(ledger: &mut T, owner: Pubkey, writer: Pubkey) {
            ledger.writer_set_mut().owner = owner;
            ledger.grant(&owner, writer).unwrap();
        }

        #[test]
        fn test_bid_ids_start_at_one() {
            let owner = Pubkey::new_unique();
            let writer = Pubkey::new_unique();
            let mut ledger = BidLedger::default();
            writable(&mut ledger, owner, writer);

            assert!(!ledger.bid_exists(0));
            assert!(!ledger.bid_exists(1));
            assert_eq!(ledger.next_id(), 1);
            assert_eq!(ledger.add_bid(&writer).unwrap(), 1);
            assert_eq!(ledger.add_bid(&writer).unwrap(), 2);
            assert!(ledger.bid_exists(1));
            assert!(ledger.bid_exists(2));
            assert!(!ledger.bid_exists(0));
            assert!(!ledger.bid_exists(3));
        }

        #[test]
        fn test_unauthorized_writer_rejected() {
            let mut ledger = BidLedger::default();
            writable(&mut ledger, Pubkey::new_unique(), Pubkey::new_unique());

            assert!(ledger.add_bid(&Pubkey::new_unique()).is_err());
            assert_eq!(ledger.bid_count, 0);
        }

        #[test]
        fn test_challenge_and_defense_ids_start_at_one() {
            let owner = Pubkey::new_unique();
            let writer = Pubkey::new_unique();
            let mut challenges = ChallengeLedger::default();
            let mut defenses = DefenseLedger::default();
            writable(&mut challenges, owner, writer);
            writable(&mut defenses, owner, writer);

            assert!(!challenges.challenge_exists(0));
            assert!(!defenses.defense_exists(0));
            assert_eq!(challenges.add_challenge(&writer).unwrap(), 1);
            assert_eq!(defenses.add_defense(&writer).unwrap(), 1);
            assert!(challenges.challenge_exists(1));
            assert!(defenses.defense_exists(1));
        }

        #[test]
        fn test_stake_nonce_and_count() {
            let owner = Pubkey::new_unique();
            let writer = Pubkey::new_unique();
            let mut ledger = StakeLedger::default();
            writable(&mut ledger, owner, writer);
            let mut first = StakeRecord::default();
            let mut second = StakeRecord::default();
            let mut tally = StakeTally::default();

            ledger.add_stake(&writer, &mut first, &mut tally, 50).unwrap();
            assert_eq!(first.nonce, 1);
            assert_eq!(tally.stake_count, 1);

            ledger.add_stake(&writer, &mut first, &mut tally, 25).unwrap();
            assert_eq!(first.value, 75);
            assert_eq!(first.nonce, 2);
            assert_eq!(tally.stake_count, 1);

            ledger.add_stake(&writer, &mut second, &mut tally, 10).unwrap();
            assert_eq!(tally.stake_count, 2);
            assert_eq!(tally.total_value, 85);
            assert_eq!(ledger.total_staked, 85);
        }

        #[test]
        fn test_zero_keeps_nonce() {
            let owner = Pubkey::new_unique();
            let writer = Pubkey::new_unique();
            let mut ledger = StakeLedger::default();
            writable(&mut ledger, owner, writer);
            let mut record = StakeRecord::default();
            let mut tally = StakeTally::default();
            ledger.add_stake(&writer, &mut record, &mut tally, 40).unwrap();

            assert_eq!(ledger.zero(&writer, &mut record, &mut tally).unwrap(), 40);
            assert_eq!(record.value, 0);
            assert_eq!(record.nonce, 1);
            assert_eq!(tally.stake_count, 0);
            assert_eq!(tally.total_value, 0);
            // Zeroing again is a no-op
            assert_eq!(ledger.zero(&writer, &mut record, &mut tally).unwrap(), 0);
            assert_eq!(tally.stake_count, 0);
        }

        #[test]
        fn test_zero_stake_add_rejected() {
            let owner = Pubkey::new_unique();
            let writer = Pubkey::new_unique();
            let mut ledger = StakeLedger::default();
            writable(&mut ledger, owner, writer);
            let mut record = StakeRecord::default();
            let mut tally = StakeTally::default();

            assert!(ledger.add_stake(&writer, &mut record, &mut tally, 0).is_err());
            assert_eq!(record.nonce, 0);
        }
    }

    mod router {
        use super::*;

        #[test]
        fn test_missing_route_is_default() {
            let router = Router::default();
            assert_eq!(router.get(&[7u8; 32]), Pubkey::default());
        }

        #[test]
        fn test_set_then_replace() {
            let mut router = Router::default();
            let first = Pubkey::new_unique();
            let second = Pubkey::new_unique();

            router.set([1u8; 32], first).unwrap();
            assert_eq!(router.get(&[1u8; 32]), first);
            router.set([1u8; 32], second).unwrap();
            assert_eq!(router.get(&[1u8; 32]), second);
            assert_eq!(router.route_count, 1);
        }

        #[test]
        fn test_router_full() {
            let mut router = Router::default();
            for i in 0..MAX_ROUTES {
                router.set([i as u8; 32], Pubkey::new_unique()).unwrap();
            }
            assert!(router.set([0xffu8; 32], Pubkey::new_unique()).is_err());
            // Replacing an existing route still works when full
            assert!(router.set([0u8; 32], Pubkey::new_unique()).is_ok());
        }
    }

    mod registry {
        use super::*;

        #[test]
        fn test_unregistered_user_has_zero_file() {
            assert_eq!(UserRecord::default().file(), [0u8; 32]);
            let user = UserRecord {
                file_hash: [9u8; 32],
                ..UserRecord::default()
            };
            assert_eq!(user.file(), [9u8; 32]);
        }

        #[test]
        fn test_unset_env_slots_read_empty() {
            let entry = EnvEntry::default();
            assert_eq!(entry.uint_value, 0);
            assert!(entry.str_value.is_empty());
            assert_eq!(entry.bytes32_value, [0u8; 32]);
        }
    }

    mod market {
        use super::*;

        #[test]
        fn test_value_moves_preserve_total() {
            let mut market = MarketConfig::default();
            market.escrow(100).unwrap();
            market.lock_stake(40).unwrap();
            let held = market.total_held().unwrap();

            market.release_escrow(30).unwrap();
            market.burn_stake(15).unwrap();
            market.release_stake(25).unwrap();
            assert_eq!(market.total_held().unwrap(), held);

            market.pay_out(55).unwrap();
            assert_eq!(market.total_held().unwrap(), held - 55);
            assert_eq!(market.total_owed, 0);
        }

        #[test]
        fn test_over_release_fails() {
            let mut market = MarketConfig::default();
            market.escrow(10).unwrap();
            assert!(market.release_escrow(11).is_err());
            assert!(market.pay_out(1).is_err());
        }

        #[test]
        fn test_balance_drain() {
            let mut balance = Balance::default();
            balance.credit(9).unwrap();
            balance.credit(1).unwrap();
            assert_eq!(balance.drain().unwrap(), 10);
            assert_eq!(balance.owed, 0);
            assert_eq!(balance.total_withdrawn, 10);
            assert_eq!(balance.drain().unwrap(), 0);
        }
    }
}
