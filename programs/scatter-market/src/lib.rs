#![allow(unexpected_cfgs)]
//! Scatter Storage Market
//!
//! A decentralized marketplace for file storage. Bidders escrow payment for a
//! file to be kept; hosters accept and pin it; validators or staked pinners
//! vouch that it is kept. Pinners answer challenges with signed half-hash
//! reveals, and a failed defense burns every stake on the bid.

use anchor_lang::prelude::*;

declare_id!("6vKFz6tFgxkKETAY7Y1u1bhxMLVZmVedmV1wrwbfgN5k");

pub mod errors;
pub mod events;
pub mod instructions;
pub mod outcome;
pub mod state;
pub mod utils;

use instructions::defense_helpers::DefenseProof;
use instructions::*;
use state::{LedgerKind, Quorum};

#[program]
pub mod scatter_market {
    use super::*;

    // ------------------------------------------------------------------------
    // Registry and configuration
    // ------------------------------------------------------------------------

    /// Create the name registry. The signer becomes its owner.
    pub fn initialize_router(ctx: Context<InitializeRouter>) -> Result<()> {
        instructions::initialize_router::handler(ctx)
    }

    /// Point a registry name at a new identity (owner only).
    ///
    /// # Arguments
    /// * `name_hash` - keccak256 of the service name, e.g. `BidStore`
    /// * `target` - Identity the name resolves to
    pub fn set_route(ctx: Context<SetRoute>, name_hash: [u8; 32], target: Pubkey) -> Result<()> {
        instructions::set_route::handler(ctx, name_hash, target)
    }

    /// Create the configuration store. The signer becomes its owner.
    pub fn initialize_env(ctx: Context<InitializeEnv>) -> Result<()> {
        instructions::initialize_env::handler(ctx)
    }

    /// Set the unsigned slot of a configuration key (owner only).
    pub fn set_env_uint(ctx: Context<SetEnv>, key: [u8; 32], value: u64) -> Result<()> {
        instructions::set_env::handle_uint(ctx, key, value)
    }

    /// Set the string slot of a configuration key (owner only).
    pub fn set_env_str(ctx: Context<SetEnv>, key: [u8; 32], value: String) -> Result<()> {
        instructions::set_env::handle_str(ctx, key, value)
    }

    /// Set the 32-byte slot of a configuration key (owner only).
    pub fn set_env_bytes32(ctx: Context<SetEnv>, key: [u8; 32], value: [u8; 32]) -> Result<()> {
        instructions::set_env::handle_bytes32(ctx, key, value)
    }

    /// Ban an account from bidding (owner only).
    pub fn ban(ctx: Context<BanAccount>, account: Pubkey) -> Result<()> {
        instructions::ban_account::handler(ctx, account)
    }

    /// Lift a ban and reclaim its rent (owner only).
    pub fn unban(ctx: Context<UnbanAccount>, account: Pubkey) -> Result<()> {
        instructions::unban_account::handler(ctx, account)
    }

    /// Record the caller's file hash, replacing any earlier one.
    pub fn register(ctx: Context<RegisterUser>, file_hash: [u8; 32]) -> Result<()> {
        instructions::register_user::handler(ctx, file_hash)
    }

    // ------------------------------------------------------------------------
    // Ledgers
    // ------------------------------------------------------------------------

    /// Create a fresh set of the four ledgers under `generation`.
    pub fn initialize_ledgers(ctx: Context<InitializeLedgers>, generation: u8) -> Result<()> {
        instructions::initialize_ledgers::handler(ctx, generation)
    }

    /// Allow `writer` to append to a ledger (owner only).
    pub fn grant_writer(ctx: Context<UpdateWriters>, kind: LedgerKind, writer: Pubkey) -> Result<()> {
        instructions::update_writers::handler(ctx, kind, writer, true)
    }

    /// Remove `writer` from a ledger's writer set (owner only).
    pub fn revoke_writer(ctx: Context<UpdateWriters>, kind: LedgerKind, writer: Pubkey) -> Result<()> {
        instructions::update_writers::handler(ctx, kind, writer, false)
    }

    /// Append a raw challenge record. The signer must be a granted writer.
    pub fn append_challenge(ctx: Context<AppendChallenge>, bid_id: u64) -> Result<()> {
        instructions::append_records::handle_challenge(ctx, bid_id)
    }

    /// Append a raw defense record. The signer must be a granted writer.
    #[allow(clippy::too_many_arguments)]
    pub fn append_defense(
        ctx: Context<AppendDefense>,
        bid_id: u64,
        challenge_id: u64,
        nonce: u64,
        defender: Pubkey,
        half_hash_a: [u8; 16],
        half_hash_b: [u8; 16],
        v: u8,
        r: [u8; 32],
        s: [u8; 32],
    ) -> Result<()> {
        let proof = DefenseProof {
            half_hash_a,
            half_hash_b,
            v,
            r,
            s,
        };
        instructions::append_records::handle_defense(ctx, bid_id, challenge_id, nonce, defender, proof)
    }

    // ------------------------------------------------------------------------
    // Market
    // ------------------------------------------------------------------------

    /// Create the market with default parameters and resolve its ledgers
    /// through the router. The signer becomes the market authority.
    pub fn initialize_market(ctx: Context<InitializeMarket>) -> Result<()> {
        instructions::initialize_market::handler(ctx)
    }

    /// Re-resolve ledger identities after the router was re-pointed.
    pub fn update_references(ctx: Context<UpdateReferences>) -> Result<()> {
        instructions::update_references::handler(ctx)
    }

    /// Copy configured parameters into the market. Permissionless.
    pub fn sync_params(ctx: Context<SyncParams>) -> Result<()> {
        instructions::sync_params::handler(ctx)
    }

    /// Place a storage bid, escrowing `value` lamports on success.
    ///
    /// # Arguments
    /// * `file_hash` - Content hash of the file to store
    /// * `file_size` - Size of the file in bytes
    /// * `duration` - Seconds the file must be kept
    /// * `price` - Lamports paid to the hoster or pinners
    /// * `validation_pool` - Lamports shared among validators
    /// * `quorum` - Satisfaction rule; `None` uses the default validation quorum
    /// * `value` - Lamports transferred; must equal `price + validation_pool`
    #[allow(clippy::too_many_arguments)]
    pub fn bid(
        ctx: Context<PlaceBid>,
        file_hash: [u8; 32],
        file_size: u64,
        duration: i64,
        price: u64,
        validation_pool: u64,
        quorum: Option<Quorum>,
        value: u64,
    ) -> Result<()> {
        instructions::place_bid::handler(
            ctx,
            file_hash,
            file_size,
            duration,
            price,
            validation_pool,
            quorum,
            value,
        )
    }

    /// Offer to host a validation-mode bid.
    pub fn accept(ctx: Context<AcceptBid>, bid_id: u64) -> Result<()> {
        instructions::accept_bid::handler(ctx, bid_id)
    }

    /// Stake lamports on a pinner-count bid.
    ///
    /// # Arguments
    /// * `amount` - Lamports added to the caller's stake
    /// * `proof_signer` - secp256k1 address that signs this staker's defenses
    pub fn stake(
        ctx: Context<StakeBid>,
        bid_id: u64,
        amount: u64,
        proof_signer: [u8; 20],
    ) -> Result<()> {
        instructions::stake_bid::handler(ctx, bid_id, amount, proof_signer)
    }

    /// Report the file as pinned by the caller.
    pub fn pinned(ctx: Context<PinBid>, bid_id: u64) -> Result<()> {
        instructions::pin_bid::handler(ctx, bid_id)
    }

    /// Vouch that the hoster keeps the file.
    pub fn validate(ctx: Context<ValidateBid>, bid_id: u64) -> Result<()> {
        instructions::validate_bid::handler(ctx, bid_id, true)
    }

    /// Report that the hoster does not keep the file.
    pub fn invalidate(ctx: Context<ValidateBid>, bid_id: u64) -> Result<()> {
        instructions::validate_bid::handler(ctx, bid_id, false)
    }

    /// Answer a challenge with the file hash halves and a secp256k1
    /// signature over the reconstructed hash.
    #[allow(clippy::too_many_arguments)]
    pub fn defend<'info>(
        ctx: Context<'_, '_, 'info, 'info, Defend<'info>>,
        bid_id: u64,
        challenge_id: u64,
        half_hash_a: [u8; 16],
        half_hash_b: [u8; 16],
        v: u8,
        r: [u8; 32],
        s: [u8; 32],
    ) -> Result<()> {
        let proof = DefenseProof {
            half_hash_a,
            half_hash_b,
            v,
            r,
            s,
        };
        instructions::defend::handler(ctx, bid_id, challenge_id, proof)
    }

    /// Fail a challenge whose defense window closed and burn the stakes supplied.
    pub fn expire_challenge<'info>(
        ctx: Context<'_, '_, 'info, 'info, ExpireChallenge<'info>>,
        bid_id: u64,
    ) -> Result<()> {
        instructions::expire_challenge::handler(ctx, bid_id)
    }

    /// Burn stakes still held by a failed bid.
    pub fn burn_stakes<'info>(
        ctx: Context<'_, '_, 'info, 'info, BurnStakes<'info>>,
        bid_id: u64,
    ) -> Result<()> {
        instructions::burn_stakes::handler(ctx, bid_id)
    }

    /// Move the caller's stake, and any pinner reward, to their balance.
    pub fn release_stake(ctx: Context<ReleaseStake>, bid_id: u64) -> Result<()> {
        instructions::release_stake::handler(ctx, bid_id)
    }

    /// Withdraw the caller's whole balance.
    pub fn withdraw(ctx: Context<WithdrawBalance>) -> Result<()> {
        instructions::withdraw::handler(ctx)
    }

    /// Withdraw as the hoster of a settled bid.
    pub fn withdraw_bid(ctx: Context<WithdrawBid>, bid_id: u64) -> Result<()> {
        instructions::withdraw_bid::handler(ctx, bid_id)
    }
}
