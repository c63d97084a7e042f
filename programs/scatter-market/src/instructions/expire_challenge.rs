//! Resolve a challenge whose defense window closed with defenses missing
//!
//! Anyone may call once the deadline has passed. The bid fails, its escrow is
//! refunded to the bidder and the stakes passed as remaining accounts are
//! burned. Stakes left out are burned later by `burn_stakes`.

use anchor_lang::prelude::*;

use super::account_helpers::{load_stake_set, store_stake_set};
use super::defense_helpers::check_expired;
use super::stake_helpers::{burn_stakes, fail_bid};
use super::validate_bid::init_balance;
use crate::errors::MarketError;
use crate::events::{ChallengeExpired, DefenseFail};
use crate::state::{Balance, Bid, BidLedger, MarketConfig, StakeLedger, StakeTally};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct ExpireChallenge<'info> {
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
        seeds = [b"stake_tally", stake_ledger.key().as_ref(), &bid_id.to_le_bytes()],
        bump = tally.bump
    )]
    pub tally: Account<'info, StakeTally>,

    #[account(
        init_if_needed,
        payer = caller,
        space = Balance::SIZE,
        seeds = [b"balance", bid.bidder.as_ref()],
        bump
    )]
    pub bidder_balance: Account<'info, Balance>,

    #[account(mut)]
    pub caller: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler<'info>(
    mut ctx: Context<'_, '_, 'info, 'info, ExpireChallenge<'info>>,
    bid_id: u64,
) -> Result<()> {
    let clock = Clock::get()?;
    check_version_compatible(&ctx.accounts.market)?;
    check_expired(&ctx.accounts.bid, clock.unix_timestamp)?;

    let coordinator = ctx.accounts.market.key();
    let balance_bump = ctx.bumps.bidder_balance;
    let accounts = &mut ctx.accounts;
    let bidder = accounts.bid.bidder;
    init_balance(&mut accounts.bidder_balance, bidder, balance_bump);

    let challenge_id = accounts.bid.challenge_id;
    let defended = accounts.bid.valid_defenses;
    let pinners = accounts.bid.pinner_count;

    let refunded = fail_bid(
        &mut accounts.market,
        &mut accounts.bid,
        &mut accounts.bidder_balance,
    )?;
    let mut stakes = load_stake_set(
        ctx.remaining_accounts,
        &accounts.stake_ledger.key(),
        bid_id,
        &Pubkey::default(),
        ctx.program_id,
    )?;
    let (stakes_burned, value_burned) = burn_stakes(
        &mut accounts.market,
        &coordinator,
        &mut accounts.stake_ledger,
        &accounts.bid,
        &mut accounts.tally,
        stakes.iter_mut(),
    )?;
    store_stake_set(ctx.remaining_accounts, &stakes)?;

    msg!(
        "Challenge {} expired with {}/{} defenses",
        challenge_id,
        defended,
        pinners
    );
    emit!(ChallengeExpired {
        challenge_id,
        bid_id,
        defended,
        pinners,
        timestamp: clock.unix_timestamp,
    });
    emit!(DefenseFail {
        challenge_id,
        bid_id,
        pinner: Pubkey::default(),
        stakes_burned,
        value_burned,
        stakes_outstanding: accounts.tally.stake_count,
        refunded,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
