//! Answer a challenge with a signed half-hash reveal
//!
//! Every defense is appended to the defense ledger. A failing defense always
//! commits: the bid fails, its escrow is refunded to the bidder and the
//! defender's stake is burned together with any other stakes passed as
//! remaining accounts. Stakes left out are burned later by `burn_stakes`.

use anchor_lang::prelude::*;

use super::account_helpers::{load_stake_set, store_stake_set};
use super::defense_helpers::{record_defense, submit_defense, verify_defense, DefenseProof};
use super::stake_helpers::{burn_stakes, fail_bid};
use super::validate_bid::init_balance;
use crate::errors::MarketError;
use crate::events::{Defense, DefenseFail};
use crate::outcome::Outcome;
use crate::state::{
    Balance, Bid, BidLedger, ChallengeLedger, ChallengeRecord, DefenseLedger, DefenseRecord,
    MarketConfig, StakeLedger, StakeRecord, StakeTally,
};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
#[instruction(bid_id: u64, challenge_id: u64)]
pub struct Defend<'info> {
    #[account(mut, seeds = [b"market"], bump = market.bump)]
    pub market: Account<'info, MarketConfig>,

    #[account(address = market.bid_ledger @ MarketError::StaleReference)]
    pub bid_ledger: Account<'info, BidLedger>,

    #[account(
        mut,
        seeds = [b"bid", bid_ledger.key().as_ref(), &bid_id.to_le_bytes()],
        bump = bid.bump
    )]
    pub bid: Account<'info, Bid>,

    #[account(
        mut,
        address = market.stake_ledger @ MarketError::StaleReference
    )]
    pub stake_ledger: Account<'info, StakeLedger>,

    #[account(
        mut,
        seeds = [b"stake", stake_ledger.key().as_ref(), &bid_id.to_le_bytes(), defender.key().as_ref()],
        bump = stake.bump
    )]
    pub stake: Account<'info, StakeRecord>,

    #[account(
        mut,
        seeds = [b"stake_tally", stake_ledger.key().as_ref(), &bid_id.to_le_bytes()],
        bump = tally.bump
    )]
    pub tally: Account<'info, StakeTally>,

    #[account(address = market.challenge_ledger @ MarketError::StaleReference)]
    pub challenge_ledger: Account<'info, ChallengeLedger>,

    #[account(
        seeds = [b"challenge", challenge_ledger.key().as_ref(), &challenge_id.to_le_bytes()],
        bump = challenge.bump
    )]
    pub challenge: Account<'info, ChallengeRecord>,

    #[account(
        mut,
        address = market.defense_ledger @ MarketError::StaleReference
    )]
    pub defense_ledger: Account<'info, DefenseLedger>,

    #[account(
        init,
        payer = defender,
        space = DefenseRecord::SIZE,
        seeds = [b"defense", defense_ledger.key().as_ref(), &defense_ledger.next_id().to_le_bytes()],
        bump
    )]
    pub defense: Account<'info, DefenseRecord>,

    /// Receives the refunded escrow if the defense fails
    #[account(
        init_if_needed,
        payer = defender,
        space = Balance::SIZE,
        seeds = [b"balance", bid.bidder.as_ref()],
        bump
    )]
    pub bidder_balance: Account<'info, Balance>,

    #[account(mut)]
    pub defender: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler<'info>(
    mut ctx: Context<'_, '_, 'info, 'info, Defend<'info>>,
    bid_id: u64,
    challenge_id: u64,
    proof: DefenseProof,
) -> Result<()> {
    let clock = Clock::get()?;
    let now = clock.unix_timestamp;
    check_version_compatible(&ctx.accounts.market)?;

    let coordinator = ctx.accounts.market.key();
    let defender = ctx.accounts.defender.key();
    let stake_key = ctx.accounts.stake.key();
    let defense_bump = ctx.bumps.defense;
    let balance_bump = ctx.bumps.bidder_balance;

    let accounts = &mut ctx.accounts;
    let bidder = accounts.bid.bidder;
    init_balance(&mut accounts.bidder_balance, bidder, balance_bump);

    let nonce = accounts.stake.nonce;
    let valid = verify_defense(
        &accounts.bid.file_hash,
        nonce,
        &proof,
        &accounts.stake.proof_signer,
    )?;

    let record = record_defense(
        &mut accounts.defense_ledger,
        &coordinator,
        bid_id,
        challenge_id,
        nonce,
        defender,
        &proof,
        now,
        defense_bump,
    )?;
    let defense_id = record.id;
    accounts.defense.set_inner(record);

    let outcome = submit_defense(
        &mut accounts.bid,
        &mut accounts.stake,
        &accounts.challenge,
        defender,
        valid,
        now,
    )?;

    match outcome {
        Outcome::Defended { satisfied_now, .. } => {
            emit!(Defense {
                defense_id,
                challenge_id,
                bid_id,
                pinner: defender,
                nonce,
                timestamp: now,
            });
            if satisfied_now {
                msg!("Bid {} satisfied: all {} pinners defended", bid_id, accounts.bid.pinner_count);
            }
        }
        Outcome::DefenseFailed { .. } => {
            let refunded = fail_bid(
                &mut accounts.market,
                &mut accounts.bid,
                &mut accounts.bidder_balance,
            )?;
            let mut others = load_stake_set(
                ctx.remaining_accounts,
                &accounts.stake_ledger.key(),
                bid_id,
                &stake_key,
                ctx.program_id,
            )?;
            let stakes = std::iter::once(&mut *accounts.stake).chain(others.iter_mut());
            let (stakes_burned, value_burned) = burn_stakes(
                &mut accounts.market,
                &coordinator,
                &mut accounts.stake_ledger,
                &accounts.bid,
                &mut accounts.tally,
                stakes,
            )?;
            store_stake_set(ctx.remaining_accounts, &others)?;

            msg!(
                "Defense failed on bid {}: burned {} stakes ({} lamports)",
                bid_id,
                stakes_burned,
                value_burned
            );
            emit!(DefenseFail {
                challenge_id,
                bid_id,
                pinner: defender,
                stakes_burned,
                value_burned,
                stakes_outstanding: accounts.tally.stake_count,
                refunded,
                timestamp: now,
            });
        }
        _ => {}
    }

    Ok(())
}
