//! Market simulation over the program's real state-transition helpers
//!
//! `SimulatedMarket` holds every account the program would touch in memory
//! and runs the same helpers the instruction handlers call. Each operation
//! is atomic: a hard failure restores the state from before the call, the
//! way a failed transaction leaves accounts untouched.

use std::collections::{BTreeMap, BTreeSet};

use anchor_lang::prelude::*;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use scatter_market::errors::MarketError;
use scatter_market::instructions::constants::MIN_PINNERS;
use scatter_market::instructions::bid_helpers::{
    accept_bid, confirm_pin, place_bid, record_validation, BidTerms,
};
use scatter_market::instructions::defense_helpers::{
    check_expired, eth_address, eth_signed_digest, raise_challenge, record_defense,
    submit_defense, verify_defense, DefenseProof,
};
use scatter_market::instructions::stake_helpers::{
    burn_stakes, fail_bid, pin_with_stake, release_stake, stake_on_bid,
};
use scatter_market::instructions::withdraw_helpers::{withdraw_balance, withdraw_for_bid};
use scatter_market::outcome::Outcome;
use scatter_market::state::{
    Balance, Bid, BidLedger, ChallengeLedger, ChallengeRecord, DefenseLedger, DefenseRecord,
    MarketConfig, QuorumKind, StakeLedger, StakeRecord, StakeTally, ValidationRecord,
};
use scatter_market::utils::writers::WriteGuarded;

use crate::arbitrary::{MarketOp, PinnerInput, StakerPlan, ONE_SOL};
use crate::invariants::*;

/// Deterministic account key for simulation actors
pub fn actor(seed: u8) -> Pubkey {
    let mut bytes = [0u8; 32];
    bytes[0] = 0xA5;
    bytes[31] = seed;
    Pubkey::new_from_array(bytes)
}

/// A staker that can sign defenses with a secp256k1 key
#[derive(Clone)]
pub struct SimulatedPinner {
    pub key: Pubkey,
    signing_key: SigningKey,
}

impl SimulatedPinner {
    pub fn new(seed: u8) -> Self {
        let mut secret = [0x42u8; 32];
        secret[31] = seed.max(1);
        let signing_key =
            SigningKey::from_bytes(&secret.into()).expect("fixed secret is a valid scalar");
        Self {
            key: actor(0x80 | seed),
            signing_key,
        }
    }

    /// Ethereum-style address bound as the stake's proof signer
    pub fn address(&self) -> [u8; 20] {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let mut pubkey = [0u8; 64];
        pubkey.copy_from_slice(&point.as_bytes()[1..]);
        eth_address(&pubkey)
    }

    /// Reveal `hash` in the order `nonce` selects and sign it.
    pub fn prove(&self, hash: &[u8; 32], nonce: u64, eth_v: bool) -> DefenseProof {
        let mut first = [0u8; 16];
        let mut second = [0u8; 16];
        first.copy_from_slice(&hash[..16]);
        second.copy_from_slice(&hash[16..]);
        let (half_hash_a, half_hash_b) = if nonce % 2 == 1 {
            (first, second)
        } else {
            (second, first)
        };

        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&eth_signed_digest(hash))
            .expect("32-byte prehash always signs");
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        let v = if eth_v {
            recovery_id.to_byte() + 27
        } else {
            recovery_id.to_byte()
        };

        DefenseProof {
            half_hash_a,
            half_hash_b,
            v,
            r,
            s,
        }
    }

    /// A proof for a hash the pinner does not hold
    pub fn forge(&self, hash: &[u8; 32], nonce: u64, eth_v: bool) -> DefenseProof {
        let mut wrong = *hash;
        wrong[0] ^= 0xFF;
        self.prove(&wrong, nonce, eth_v)
    }
}

/// Result of a simulated instruction execution
#[derive(Debug, Clone)]
pub enum SimulationResult {
    Success(Outcome),
    Error(String),
    InvariantViolation(String),
}

impl SimulationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SimulationResult::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SimulationResult::Error(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, SimulationResult::InvariantViolation(_))
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            SimulationResult::Success(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// In-memory copy of every account the market program owns
#[derive(Clone)]
pub struct SimulatedMarket {
    /// Writer identity of the coordinator (the market PDA on-chain)
    pub coordinator: Pubkey,
    pub market: MarketConfig,
    pub bid_ledger: BidLedger,
    pub stake_ledger: StakeLedger,
    pub challenge_ledger: ChallengeLedger,
    pub defense_ledger: DefenseLedger,
    pub bids: BTreeMap<u64, Bid>,
    pub stakes: BTreeMap<(u64, Pubkey), StakeRecord>,
    pub tallies: BTreeMap<u64, StakeTally>,
    pub validations: BTreeMap<(u64, Pubkey), ValidationRecord>,
    pub challenges: BTreeMap<u64, ChallengeRecord>,
    pub defenses: BTreeMap<u64, DefenseRecord>,
    pub balances: BTreeMap<Pubkey, Balance>,
    pub banned: BTreeSet<Pubkey>,
    /// Lamports paid out of the vault, per recipient
    pub wallets: BTreeMap<Pubkey, u64>,
    /// Vault lamports above its rent reserve
    pub vault: u64,
    pub now: i64,
}

impl Default for SimulatedMarket {
    fn default() -> Self {
        Self::new(1_700_000_000)
    }
}

impl SimulatedMarket {
    /// Fresh market with the coordinator granted on all four ledgers.
    pub fn new(now: i64) -> Self {
        let owner = actor(0);
        let coordinator = actor(1);

        let mut sim = Self {
            coordinator,
            market: MarketConfig::default(),
            bid_ledger: BidLedger::default(),
            stake_ledger: StakeLedger::default(),
            challenge_ledger: ChallengeLedger::default(),
            defense_ledger: DefenseLedger::default(),
            bids: BTreeMap::new(),
            stakes: BTreeMap::new(),
            tallies: BTreeMap::new(),
            validations: BTreeMap::new(),
            challenges: BTreeMap::new(),
            defenses: BTreeMap::new(),
            balances: BTreeMap::new(),
            banned: BTreeSet::new(),
            wallets: BTreeMap::new(),
            vault: 0,
            now,
        };
        sim.bid_ledger.writers.owner = owner;
        sim.stake_ledger.writers.owner = owner;
        sim.challenge_ledger.writers.owner = owner;
        sim.defense_ledger.writers.owner = owner;
        for granted in [
            sim.bid_ledger.grant(&owner, coordinator),
            sim.stake_ledger.grant(&owner, coordinator),
            sim.challenge_ledger.grant(&owner, coordinator),
            sim.defense_ledger.grant(&owner, coordinator),
        ] {
            granted.expect("fresh writer set has room");
        }
        sim
    }

    pub fn advance(&mut self, seconds: i64) {
        self.now = self.now.saturating_add(seconds);
    }

    pub fn bid(&self, id: u64) -> Option<&Bid> {
        self.bids.get(&id)
    }

    pub fn owed(&self, account: &Pubkey) -> u64 {
        self.balances.get(account).map(|b| b.owed).unwrap_or(0)
    }

    pub fn paid_out(&self, account: &Pubkey) -> u64 {
        self.wallets.get(account).copied().unwrap_or(0)
    }

    /// Run `op` as one transaction: on `Err` every account reverts.
    fn atomic<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = self.clone();
        let result = op(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }

    fn load_bid(&self, id: u64) -> Result<Bid> {
        self.bids
            .get(&id)
            .cloned()
            .ok_or_else(|| error!(MarketError::BidNotFound))
    }

    /// Balance account as `init_if_needed` would hand it over
    fn load_balance(&self, account: Pubkey) -> Balance {
        self.balances.get(&account).cloned().unwrap_or(Balance {
            account,
            ..Balance::default()
        })
    }

    // ------------------------------------------------------------------------
    // Instructions
    // ------------------------------------------------------------------------

    pub fn place_bid(&mut self, bidder: Pubkey, terms: BidTerms, value: u64) -> Result<Outcome> {
        self.atomic(|sim| {
            let banned = sim.banned.contains(&bidder);
            let (outcome, bid) = place_bid(
                &mut sim.market,
                &sim.coordinator,
                &mut sim.bid_ledger,
                bidder,
                &terms,
                value,
                banned,
                sim.now,
                0,
            )?;
            if let Some(bid) = bid {
                sim.vault = sim
                    .vault
                    .checked_add(value)
                    .ok_or(MarketError::ArithmeticOverflow)?;
                sim.bids.insert(bid.id, bid);
            }
            Ok(outcome)
        })
    }

    pub fn accept(&mut self, bid_id: u64, hoster: Pubkey) -> Result<Outcome> {
        self.atomic(|sim| {
            let mut bid = sim.load_bid(bid_id)?;
            let outcome = accept_bid(&mut bid, hoster, sim.now, sim.market.accept_hold_duration)?;
            sim.bids.insert(bid_id, bid);
            Ok(outcome)
        })
    }

    pub fn stake(&mut self, bid_id: u64, pinner: &SimulatedPinner, amount: u64) -> Result<Outcome> {
        let staker = pinner.key;
        let proof_signer = pinner.address();
        self.atomic(|sim| {
            let bid = sim.load_bid(bid_id)?;
            let mut record = sim.stakes.get(&(bid_id, staker)).cloned().unwrap_or_default();
            let mut tally = sim.tallies.get(&bid_id).cloned().unwrap_or_default();
            let outcome = stake_on_bid(
                &mut sim.market,
                &sim.coordinator,
                &mut sim.stake_ledger,
                &bid,
                &mut record,
                &mut tally,
                staker,
                amount,
                proof_signer,
            )?;
            sim.vault = sim
                .vault
                .checked_add(amount)
                .ok_or(MarketError::ArithmeticOverflow)?;
            sim.stakes.insert((bid_id, staker), record);
            sim.tallies.insert(bid_id, tally);
            Ok(outcome)
        })
    }

    /// `pinned` for either quorum kind; raises the challenge on the second
    /// staked pin.
    pub fn pin(&mut self, bid_id: u64, caller: Pubkey) -> Result<Outcome> {
        self.atomic(|sim| {
            let mut bid = sim.load_bid(bid_id)?;
            let outcome = match bid.quorum_kind {
                QuorumKind::Validation => {
                    confirm_pin(&mut bid, caller, sim.now, sim.market.accept_hold_duration)?
                }
                QuorumKind::PinnerCount => {
                    let mut stake = sim.stakes.get(&(bid_id, caller)).cloned();
                    let outcome = pin_with_stake(&mut bid, stake.as_mut(), caller, sim.now)?;
                    if let Some(stake) = stake {
                        sim.stakes.insert((bid_id, caller), stake);
                    }
                    outcome
                }
            };

            if let Outcome::FilePinned {
                raises_challenge: true,
                ..
            } = outcome
            {
                let challenge = raise_challenge(
                    &mut bid,
                    &mut sim.challenge_ledger,
                    sim.coordinator,
                    sim.now,
                    sim.market.defense_window,
                    0,
                )?;
                sim.challenges.insert(challenge.id, challenge);
            }
            sim.bids.insert(bid_id, bid);
            Ok(outcome)
        })
    }

    pub fn validate(&mut self, bid_id: u64, validator: Pubkey, is_valid: bool) -> Result<Outcome> {
        self.atomic(|sim| {
            let mut bid = sim.load_bid(bid_id)?;
            let mut record = sim
                .validations
                .get(&(bid_id, validator))
                .cloned()
                .unwrap_or_default();
            let mut validator_balance = sim.load_balance(validator);
            let mut hoster_balance = sim.load_balance(bid.hoster);

            let outcome = record_validation(
                &mut sim.market,
                &mut bid,
                &mut record,
                &mut validator_balance,
                &mut hoster_balance,
                validator,
                is_valid,
                sim.now,
                0,
            )?;

            sim.balances.insert(bid.hoster, hoster_balance);
            sim.balances.insert(validator, validator_balance);
            sim.validations.insert((bid_id, validator), record);
            sim.bids.insert(bid_id, bid);
            Ok(outcome)
        })
    }

    pub fn defend(&mut self, bid_id: u64, defender: Pubkey, proof: &DefenseProof) -> Result<Outcome> {
        self.defend_with(bid_id, defender, proof, None)
    }

    /// Defend, passing only the `supplied` stakes (every stake when `None`)
    /// besides the defender's own.
    pub fn defend_with(
        &mut self,
        bid_id: u64,
        defender: Pubkey,
        proof: &DefenseProof,
        supplied: Option<&[Pubkey]>,
    ) -> Result<Outcome> {
        self.atomic(|sim| {
            let mut bid = sim.load_bid(bid_id)?;
            let mut stake = sim
                .stakes
                .get(&(bid_id, defender))
                .cloned()
                .ok_or_else(|| error!(MarketError::NotAChallengedPinner))?;
            let challenge = sim
                .challenges
                .get(&bid.challenge_id)
                .cloned()
                .ok_or_else(|| error!(MarketError::ChallengeNotActive))?;

            let nonce = stake.nonce;
            let valid = verify_defense(&bid.file_hash, nonce, proof, &stake.proof_signer)?;
            let record = record_defense(
                &mut sim.defense_ledger,
                &sim.coordinator,
                bid_id,
                challenge.id,
                nonce,
                defender,
                proof,
                sim.now,
                0,
            )?;
            sim.defenses.insert(record.id, record);

            let outcome = submit_defense(&mut bid, &mut stake, &challenge, defender, valid, sim.now)?;
            sim.stakes.insert((bid_id, defender), stake);
            if let Outcome::DefenseFailed { .. } = outcome {
                sim.fail(&mut bid)?;
                let mut burned: Vec<Pubkey> = vec![defender];
                burned.extend(supplied.map_or_else(|| sim.stakers_of(bid_id), <[Pubkey]>::to_vec));
                sim.burn(&bid, &burned)?;
            }
            sim.bids.insert(bid_id, bid);
            Ok(outcome)
        })
    }

    pub fn expire_challenge(&mut self, bid_id: u64) -> Result<Outcome> {
        self.expire_challenge_with(bid_id, None)
    }

    /// Expire, passing only the `supplied` stakes (every stake when `None`).
    pub fn expire_challenge_with(
        &mut self,
        bid_id: u64,
        supplied: Option<&[Pubkey]>,
    ) -> Result<Outcome> {
        self.atomic(|sim| {
            let mut bid = sim.load_bid(bid_id)?;
            check_expired(&bid, sim.now)?;
            sim.fail(&mut bid)?;
            let burned = supplied.map_or_else(|| sim.stakers_of(bid_id), <[Pubkey]>::to_vec);
            sim.burn(&bid, &burned)?;
            sim.bids.insert(bid_id, bid);
            Ok(Outcome::DefenseFailed { bid_id })
        })
    }

    /// `burn_stakes` over the `supplied` stakes (every stake when `None`).
    pub fn burn_stakes(&mut self, bid_id: u64, supplied: Option<&[Pubkey]>) -> Result<Outcome> {
        self.atomic(|sim| {
            let bid = sim.load_bid(bid_id)?;
            let burned = supplied.map_or_else(|| sim.stakers_of(bid_id), <[Pubkey]>::to_vec);
            let (stakes_burned, value_burned) = sim.burn(&bid, &burned)?;
            Ok(Outcome::StakesBurned {
                bid_id,
                stakes_burned,
                value_burned,
            })
        })
    }

    /// Accounts holding a stake record on `bid_id`
    pub fn stakers_of(&self, bid_id: u64) -> Vec<Pubkey> {
        self.stakes
            .keys()
            .filter(|(id, _)| *id == bid_id)
            .map(|(_, account)| *account)
            .collect()
    }

    fn fail(&mut self, bid: &mut Bid) -> Result<u64> {
        let mut bidder_balance = self.load_balance(bid.bidder);
        let refund = fail_bid(&mut self.market, bid, &mut bidder_balance)?;
        self.balances.insert(bid.bidder, bidder_balance);
        Ok(refund)
    }

    /// Burn the listed stake records, as the handlers do with the remaining
    /// accounts they are given.
    fn burn(&mut self, bid: &Bid, accounts: &[Pubkey]) -> Result<(u16, u64)> {
        let bid_id = bid.id;
        let mut tally = self.tallies.get(&bid_id).cloned().unwrap_or_default();
        let stakes = self
            .stakes
            .iter_mut()
            .filter(|((id, account), _)| *id == bid_id && accounts.contains(account))
            .map(|(_, stake)| stake);
        let burned = burn_stakes(
            &mut self.market,
            &self.coordinator,
            &mut self.stake_ledger,
            bid,
            &mut tally,
            stakes,
        )?;
        self.tallies.insert(bid_id, tally);
        Ok(burned)
    }

    pub fn release_stake(&mut self, bid_id: u64, staker: Pubkey) -> Result<Outcome> {
        self.atomic(|sim| {
            let mut bid = sim.load_bid(bid_id)?;
            let mut record = sim
                .stakes
                .get(&(bid_id, staker))
                .cloned()
                .ok_or_else(|| error!(MarketError::StakeEmpty))?;
            let mut tally = sim.tallies.get(&bid_id).cloned().unwrap_or_default();
            let mut balance = sim.load_balance(staker);

            let outcome = release_stake(
                &mut sim.market,
                &sim.coordinator,
                &mut sim.stake_ledger,
                &mut bid,
                &mut record,
                &mut tally,
                &mut balance,
            )?;

            sim.balances.insert(staker, balance);
            sim.stakes.insert((bid_id, staker), record);
            sim.tallies.insert(bid_id, tally);
            sim.bids.insert(bid_id, bid);
            Ok(outcome)
        })
    }

    pub fn withdraw(&mut self, caller: Pubkey) -> Result<Outcome> {
        self.atomic(|sim| {
            let outcome = withdraw_balance(&mut sim.market, sim.balances.get_mut(&caller))?;
            sim.pay(caller, &outcome)?;
            Ok(outcome)
        })
    }

    pub fn withdraw_bid(&mut self, bid_id: u64, caller: Pubkey) -> Result<Outcome> {
        self.atomic(|sim| {
            let mut bid = sim.load_bid(bid_id)?;
            let outcome =
                withdraw_for_bid(&mut sim.market, &mut bid, caller, sim.balances.get_mut(&caller))?;
            sim.pay(caller, &outcome)?;
            sim.bids.insert(bid_id, bid);
            Ok(outcome)
        })
    }

    fn pay(&mut self, to: Pubkey, outcome: &Outcome) -> Result<()> {
        if let Outcome::Withdrawn { value } = outcome {
            self.vault = self
                .vault
                .checked_sub(*value)
                .ok_or(MarketError::InsufficientVaultBalance)?;
            let wallet = self.wallets.entry(to).or_insert(0);
            *wallet = wallet
                .checked_add(*value)
                .ok_or(MarketError::ArithmeticOverflow)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------------

    /// Check every market-wide invariant against the current state.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let conservation = check_value_conservation(&self.market, self.vault);
        if conservation != ValueInvariantResult::Valid {
            return Err(format!("value conservation: {:?}", conservation));
        }
        if self.stake_ledger.total_staked != self.market.total_staked {
            return Err(format!(
                "stake ledger holds {} but market books {}",
                self.stake_ledger.total_staked, self.market.total_staked
            ));
        }

        for (id, bid) in &self.bids {
            let checks = [
                check_bid_id(*id, self.bid_ledger.bid_count),
                check_votes(bid),
                check_pinner_count(bid),
            ];
            if let Some(bad) = checks.iter().find(|r| **r != BidInvariantResult::Valid) {
                return Err(format!("bid {}: {:?}", id, bad));
            }
            let escrow = check_escrow_bounded(bid);
            if escrow != ValueInvariantResult::Valid {
                return Err(format!("bid {}: {:?}", id, escrow));
            }

            if bid.quorum_kind == QuorumKind::PinnerCount {
                let stakes: Vec<&StakeRecord> = self
                    .stakes
                    .iter()
                    .filter(|((bid_id, _), _)| bid_id == id)
                    .map(|(_, stake)| stake)
                    .collect();
                if let Some(tally) = self.tallies.get(id) {
                    let result = check_tally(tally, stakes.iter().copied());
                    if result != StakeInvariantResult::Valid {
                        return Err(format!("bid {}: {:?}", id, result));
                    }
                }
                for stake in stakes {
                    let result = check_stake_after_resolution(bid, stake);
                    if result != StakeInvariantResult::Valid {
                        return Err(format!("bid {}: {:?}", id, result));
                    }
                }
            }
        }
        Ok(())
    }

    /// Run `op`, classify its result and re-check invariants.
    pub fn step<F>(&mut self, op: F) -> SimulationResult
    where
        F: FnOnce(&mut Self) -> Result<Outcome>,
    {
        let result = op(self);
        if let Err(violation) = self.check_invariants() {
            return SimulationResult::InvariantViolation(violation);
        }
        match result {
            Ok(outcome) => SimulationResult::Success(outcome),
            Err(e) => SimulationResult::Error(e.to_string()),
        }
    }
}

// ============================================================================
// Scenario builders
// ============================================================================

/// Terms for a validation bid that passes every check under default params.
pub fn validation_terms(file_hash: [u8; 32], price: u64, pool: u64, quorum: u16) -> BidTerms {
    BidTerms {
        file_hash,
        file_size: 1024,
        duration: 14 * 86_400,
        price,
        validation_pool: pool,
        quorum: Some(scatter_market::state::Quorum {
            kind: QuorumKind::Validation,
            value: quorum,
        }),
    }
}

/// Terms for a pinner-count bid requiring `pinners` pinners.
pub fn pinner_terms(file_hash: [u8; 32], price: u64, pinners: u16) -> BidTerms {
    BidTerms {
        file_hash,
        file_size: 1024,
        duration: 14 * 86_400,
        price,
        validation_pool: 0,
        quorum: Some(scatter_market::state::Quorum {
            kind: QuorumKind::PinnerCount,
            value: pinners,
        }),
    }
}

/// Place a bid that must succeed and return its id.
pub fn must_place(sim: &mut SimulatedMarket, bidder: Pubkey, terms: BidTerms) -> Option<u64> {
    let value = terms.price.checked_add(terms.validation_pool)?;
    match sim.place_bid(bidder, terms, value) {
        Ok(Outcome::BidSuccessful { bid_id }) => Some(bid_id),
        _ => None,
    }
}

/// Place a pinner-count bid and have every pinner stake and pin it.
///
/// Returns the bid id once the challenge is raised.
pub fn challenged_bid(
    sim: &mut SimulatedMarket,
    bidder: Pubkey,
    file_hash: [u8; 32],
    price: u64,
    pinners: &[SimulatedPinner],
    stake: u64,
) -> Option<u64> {
    let required = u16::try_from(pinners.len()).ok()?;
    let bid_id = must_place(sim, bidder, pinner_terms(file_hash, price, required))?;
    for pinner in pinners {
        sim.stake(bid_id, pinner, stake).ok()?;
    }
    for pinner in pinners {
        sim.pin(bid_id, pinner.key).ok()?;
    }
    Some(bid_id)
}

// ============================================================================
// Drivers shared by the fuzz targets and the runner
// ============================================================================

/// File hash used by the end-to-end scenarios
pub const SCENARIO_HASH: [u8; 32] = [
    0x16, 0xc5, 0x5d, 0x9e, 0x9c, 0xa5, 0xb6, 0x73, 0xca, 0xfa, 0xa1, 0x12, 0x19, 0x5a, 0x5a, 0xd7,
    0x8c, 0xeb, 0x10, 0x4e, 0x61, 0x2f, 0xf2, 0xaf, 0xbf, 0x34, 0xc2, 0x33, 0xd6, 0xe7, 0x48, 0x2b,
];

/// Actors shared by every role in a random session
const SESSION_ACTORS: u8 = 6;

/// Distinct non-sentinel file hash per bid
fn session_hash(n: u64) -> [u8; 32] {
    let mut hash = [0xC3u8; 32];
    hash[..8].copy_from_slice(&n.to_le_bytes());
    hash
}

/// Apply `ops` to a fresh market, checking invariants after each one.
///
/// Returns the number of operations that committed. Hard failures are
/// expected; an invariant violation, an unpayable withdrawal or an
/// accounting underflow is not.
pub fn run_operations(ops: &[MarketOp]) -> std::result::Result<usize, String> {
    let mut sim = SimulatedMarket::default();
    let actors: Vec<SimulatedPinner> = (1..=SESSION_ACTORS).map(SimulatedPinner::new).collect();
    let who = |i: u8| &actors[usize::from(i % SESSION_ACTORS)];
    let mut applied = 0;

    for op in ops {
        let bid_count = sim.bid_ledger.bid_count;
        let bid_of = |b: u8| u64::from(b) % bid_count.max(1) + 1;

        let result = match *op {
            MarketOp::Bid {
                bidder,
                pinner_mode,
                price,
                pool_share,
                quorum,
            } => {
                let hash = session_hash(bid_count + 1);
                let terms = if pinner_mode {
                    pinner_terms(hash, price, quorum.max(MIN_PINNERS))
                } else {
                    validation_terms(hash, price, pool_share * u64::from(quorum), quorum)
                };
                let value = terms.price.saturating_add(terms.validation_pool);
                sim.step(|s| s.place_bid(who(bidder).key, terms, value))
            }
            MarketOp::Accept { bid, hoster } => sim.step(|s| s.accept(bid_of(bid), who(hoster).key)),
            MarketOp::Stake { bid, pinner, amount } => {
                sim.step(|s| s.stake(bid_of(bid), who(pinner), amount))
            }
            MarketOp::Pin { bid, caller } => sim.step(|s| s.pin(bid_of(bid), who(caller).key)),
            MarketOp::Validate {
                bid,
                validator,
                is_valid,
            } => sim.step(|s| s.validate(bid_of(bid), who(validator).key, is_valid)),
            MarketOp::Defend { bid, pinner, honest } => {
                let id = bid_of(bid);
                let pinner = who(pinner);
                let nonce = sim
                    .stakes
                    .get(&(id, pinner.key))
                    .map(|stake| stake.nonce)
                    .unwrap_or(1);
                let hash = sim.bid(id).map(|b| b.file_hash).unwrap_or(SCENARIO_HASH);
                let proof = if honest {
                    pinner.prove(&hash, nonce, true)
                } else {
                    pinner.forge(&hash, nonce, true)
                };
                // Leftover stakes of a failed defense wait for `Burn`
                sim.step(|s| s.defend_with(id, pinner.key, &proof, Some(&[])))
            }
            MarketOp::Expire { bid } => sim.step(|s| s.expire_challenge(bid_of(bid))),
            MarketOp::Burn { bid } => sim.step(|s| s.burn_stakes(bid_of(bid), None)),
            MarketOp::Release { bid, pinner } => {
                sim.step(|s| s.release_stake(bid_of(bid), who(pinner).key))
            }
            MarketOp::Withdraw { account } => sim.step(|s| s.withdraw(who(account).key)),
            MarketOp::WithdrawBid { bid, account } => {
                sim.step(|s| s.withdraw_bid(bid_of(bid), who(account).key))
            }
            MarketOp::Advance { seconds } => {
                sim.advance(seconds);
                continue;
            }
        };

        match result {
            SimulationResult::InvariantViolation(violation) => {
                return Err(format!("{:?}: {}", op, violation))
            }
            SimulationResult::Error(e)
                if e.contains("InsufficientVaultBalance") || e.contains("ArithmeticOverflow") =>
            {
                return Err(format!("{:?}: {}", op, e))
            }
            SimulationResult::Success(_) => applied += 1,
            SimulationResult::Error(_) => {}
        }
    }
    Ok(applied)
}

/// Accept-hold walkthrough: A accepts, B is told to wait, then B displaces A
/// once the hold has elapsed. Returns the three outcomes in order.
pub fn scenario_accept_hold() -> std::result::Result<Vec<Outcome>, String> {
    let mut sim = SimulatedMarket::default();
    let (bidder, a, b) = (actor(10), actor(20), actor(21));
    let bid_id = must_place(&mut sim, bidder, validation_terms(SCENARIO_HASH, ONE_SOL, 0, 3))
        .ok_or("bid rejected")?;

    let mut outcomes = Vec::with_capacity(3);
    outcomes.push(sim.accept(bid_id, a).map_err(|e| e.to_string())?);
    sim.advance(1);
    outcomes.push(sim.accept(bid_id, b).map_err(|e| e.to_string())?);
    sim.advance(sim.market.accept_hold_duration);
    outcomes.push(sim.accept(bid_id, b).map_err(|e| e.to_string())?);
    Ok(outcomes)
}

/// Result of the four-validator walkthrough
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumReport {
    pub sway: i64,
    pub satisfied: bool,
    /// Lamports the hoster received from `withdraw_bid`
    pub hoster_paid: u64,
    /// Pool share credited to each validator
    pub validator_owed: Vec<u64>,
}

/// Pool of 0.1 SOL, quorum 4, votes true/false/true/true; the hoster then
/// withdraws.
pub fn scenario_validation_quorum() -> std::result::Result<QuorumReport, String> {
    let mut sim = SimulatedMarket::default();
    let (bidder, hoster) = (actor(10), actor(20));
    let bid_id = must_place(
        &mut sim,
        bidder,
        validation_terms(SCENARIO_HASH, ONE_SOL, ONE_SOL / 10, 4),
    )
    .ok_or("bid rejected")?;

    sim.accept(bid_id, hoster).map_err(|e| e.to_string())?;
    sim.pin(bid_id, hoster).map_err(|e| e.to_string())?;
    let validators = [actor(30), actor(31), actor(32), actor(33)];
    for (validator, verdict) in validators.iter().zip([true, false, true, true]) {
        sim.validate(bid_id, *validator, verdict)
            .map_err(|e| e.to_string())?;
    }

    let bid = sim.bid(bid_id).ok_or("bid missing")?;
    let (sway, satisfied) = (bid.validation_sway(), bid.satisfied());
    let withdrawn = sim.withdraw_bid(bid_id, hoster).map_err(|e| e.to_string())?;
    let hoster_paid = match withdrawn {
        Outcome::Withdrawn { value } => value,
        other => return Err(format!("hoster withdraw: {:?}", other)),
    };
    sim.check_invariants()?;

    Ok(QuorumReport {
        sway,
        satisfied,
        hoster_paid,
        validator_owed: validators.iter().map(|v| sim.owed(v)).collect(),
    })
}

/// Final state of a challenged pinner-count bid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefenseReport {
    pub status: scatter_market::state::BidStatus,
    /// Some defense failed or the window expired
    pub mad: bool,
    pub staked: u64,
    pub burned: u64,
    pub remaining_stake: u64,
    pub bidder_owed: u64,
    pub defenses_recorded: u64,
}

fn expect_success(result: SimulationResult) -> std::result::Result<Outcome, String> {
    match result {
        SimulationResult::Success(outcome) => Ok(outcome),
        other => Err(format!("{:?}", other)),
    }
}

/// Stake, pin and defend a pinner-count bid according to `input`, expiring
/// the challenge if some pinner stays silent.
pub fn run_defense_round(input: &PinnerInput) -> std::result::Result<DefenseReport, String> {
    let mut sim = SimulatedMarket::default();
    let bidder = actor(10);
    let count = u8::try_from(input.required).map_err(|e| e.to_string())?;
    let pinners: Vec<SimulatedPinner> = (1..=count).map(SimulatedPinner::new).collect();
    let plans: Vec<&StakerPlan> = input.stakers.iter().cycle().take(pinners.len()).collect();

    let bid_id = must_place(
        &mut sim,
        bidder,
        pinner_terms(input.file_hash, input.price, input.required),
    )
    .ok_or("bid rejected")?;

    let mut staked = 0u64;
    for (pinner, plan) in pinners.iter().zip(&plans) {
        let mut amounts: Vec<u64> = plan.stakes.iter().copied().filter(|a| *a > 0).collect();
        if amounts.is_empty() {
            amounts.push(1);
        }
        for amount in amounts {
            expect_success(sim.step(|s| s.stake(bid_id, pinner, amount)))?;
            staked += amount;
        }
    }
    for pinner in &pinners {
        expect_success(sim.step(|s| s.pin(bid_id, pinner.key)))?;
    }

    let mut mad = false;
    let mut silent = false;
    for (pinner, plan) in pinners.iter().zip(&plans) {
        if !plan.defends {
            silent = true;
            continue;
        }
        let nonce = sim
            .stakes
            .get(&(bid_id, pinner.key))
            .map(|stake| stake.nonce)
            .ok_or("missing stake")?;
        let proof = if plan.dishonest {
            pinner.forge(&input.file_hash, nonce, plan.eth_v)
        } else {
            pinner.prove(&input.file_hash, nonce, plan.eth_v)
        };

        let result = sim.step(|s| s.defend(bid_id, pinner.key, &proof));
        match (&result, mad, plan.dishonest) {
            (SimulationResult::Error(_), true, _) => {}
            (SimulationResult::Success(Outcome::DefenseFailed { .. }), false, true) => mad = true,
            (SimulationResult::Success(Outcome::Defended { .. }), false, false) => {}
            _ => return Err(format!("unexpected defense result {:?}", result)),
        }
    }

    if !mad && silent {
        sim.advance(sim.market.defense_window + 1);
        expect_success(sim.step(|s| s.expire_challenge(bid_id)))?;
        mad = true;
    }

    let bid = sim.bid(bid_id).ok_or("bid missing")?;
    Ok(DefenseReport {
        status: bid.status,
        mad,
        staked,
        burned: sim.market.total_burned,
        remaining_stake: sim.stake_ledger.total_staked,
        bidder_owed: sim.owed(&bidder),
        defenses_recorded: sim.defense_ledger.defense_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scatter_market::state::BidStatus;

    const HASH: [u8; 32] = [7u8; 32];

    #[test]
    fn test_hard_failure_rolls_back() {
        let mut sim = SimulatedMarket::default();
        let bidder = actor(10);
        let bid_id = must_place(&mut sim, bidder, pinner_terms(HASH, 1_000, 2)).unwrap();
        let before_vault = sim.vault;

        let bidder_as_pinner = SimulatedPinner {
            key: bidder,
            ..SimulatedPinner::new(1)
        };
        assert!(sim.stake(bid_id, &bidder_as_pinner, 50).is_err());
        assert_eq!(sim.vault, before_vault);
        assert!(sim.stakes.is_empty());
        assert!(sim.check_invariants().is_ok());
    }

    #[test]
    fn test_challenge_raised_on_second_pin() {
        let mut sim = SimulatedMarket::default();
        let pinners = [SimulatedPinner::new(1), SimulatedPinner::new(2)];
        let bid_id = challenged_bid(&mut sim, actor(10), HASH, 1_000, &pinners, 500).unwrap();

        let bid = sim.bid(bid_id).unwrap();
        assert_eq!(bid.status, BidStatus::Challenged);
        assert_eq!(sim.challenges.len(), 1);
        assert_eq!(bid.challenge_id, 1);
        assert_eq!(sim.vault, 2_000);
        assert!(sim.check_invariants().is_ok());
    }

    #[test]
    fn test_two_of_three_pinners_raise_challenge() {
        let mut sim = SimulatedMarket::default();
        let bid_id = must_place(&mut sim, actor(10), pinner_terms(HASH, 1_000, 3)).unwrap();
        let pinners: Vec<SimulatedPinner> = (1..=3).map(SimulatedPinner::new).collect();
        for pinner in &pinners[..2] {
            sim.stake(bid_id, pinner, 100).unwrap();
            sim.pin(bid_id, pinner.key).unwrap();
        }

        let bid = sim.bid(bid_id).unwrap();
        assert_eq!(bid.status, BidStatus::Challenged);
        assert_eq!(bid.pinner_count, 2);
        assert_eq!(sim.challenges.len(), 1);

        // Both defend and the bid settles without a third pinner
        for pinner in &pinners[..2] {
            let nonce = sim.stakes[&(bid_id, pinner.key)].nonce;
            sim.defend(bid_id, pinner.key, &pinner.prove(&HASH, nonce, true))
                .unwrap();
        }
        assert_eq!(sim.bid(bid_id).unwrap().status, BidStatus::Satisfied);
        assert!(sim.check_invariants().is_ok());
    }

    #[test]
    fn test_late_pinner_joins_running_challenge() {
        let mut sim = SimulatedMarket::default();
        let bid_id = must_place(&mut sim, actor(10), pinner_terms(HASH, 900, 3)).unwrap();
        let pinners: Vec<SimulatedPinner> = (1..=3).map(SimulatedPinner::new).collect();
        for pinner in &pinners {
            sim.stake(bid_id, pinner, 100).unwrap();
        }
        sim.pin(bid_id, pinners[0].key).unwrap();
        sim.pin(bid_id, pinners[1].key).unwrap();
        sim.advance(60);

        assert_eq!(
            sim.pin(bid_id, pinners[2].key).unwrap(),
            Outcome::FilePinned {
                bid_id,
                pinner_count: 3,
                raises_challenge: false
            }
        );
        assert_eq!(sim.challenges.len(), 1);

        // The late pinner must defend too before the bid settles
        for (i, pinner) in pinners.iter().enumerate() {
            let nonce = sim.stakes[&(bid_id, pinner.key)].nonce;
            let outcome = sim
                .defend(bid_id, pinner.key, &pinner.prove(&HASH, nonce, true))
                .unwrap();
            assert_eq!(
                outcome,
                Outcome::Defended {
                    bid_id,
                    satisfied_now: i == 2
                }
            );
        }
        assert!(sim.check_invariants().is_ok());
    }

    #[test]
    fn test_failed_defense_commits_without_other_stakes() {
        let mut sim = SimulatedMarket::default();
        let bidder = actor(10);
        let pinners = [SimulatedPinner::new(1), SimulatedPinner::new(2)];
        let bid_id = challenged_bid(&mut sim, bidder, HASH, 1_000, &pinners, 500).unwrap();

        let cheat = &pinners[0];
        let nonce = sim.stakes[&(bid_id, cheat.key)].nonce;
        let outcome = sim
            .defend_with(bid_id, cheat.key, &cheat.forge(&HASH, nonce, true), Some(&[]))
            .unwrap();
        assert_eq!(outcome, Outcome::DefenseFailed { bid_id });

        let bid = sim.bid(bid_id).unwrap();
        assert_eq!(bid.status, BidStatus::Failed);
        assert_eq!(sim.owed(&bidder), 1_000);
        assert_eq!(sim.defense_ledger.defense_count, 1);
        assert_eq!(sim.stakes[&(bid_id, cheat.key)].value, 0);
        assert_eq!(sim.stakes[&(bid_id, pinners[1].key)].value, 500);
        assert!(sim.check_invariants().is_ok());

        // No retry, and the other stake cannot be released
        let retry = cheat.prove(&HASH, nonce, true);
        assert!(sim.defend(bid_id, cheat.key, &retry).is_err());
        assert!(sim.release_stake(bid_id, pinners[1].key).is_err());

        assert_eq!(
            sim.burn_stakes(bid_id, None).unwrap(),
            Outcome::StakesBurned {
                bid_id,
                stakes_burned: 1,
                value_burned: 500
            }
        );
        assert_eq!(sim.market.total_burned, 1_000);
        assert_eq!(sim.tallies[&bid_id].stake_count, 0);
        assert!(sim.check_invariants().is_ok());
    }

    #[test]
    fn test_pinner_proof_verifies() {
        let pinner = SimulatedPinner::new(3);
        let proof = pinner.prove(&HASH, 2, true);
        assert!(verify_defense(&HASH, 2, &proof, &pinner.address()).unwrap());
        let forged = pinner.forge(&HASH, 2, true);
        assert!(!verify_defense(&HASH, 2, &forged, &pinner.address()).unwrap());
    }
}
