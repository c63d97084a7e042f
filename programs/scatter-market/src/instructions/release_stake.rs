//! Return a stake, plus any pinner reward, to the staker's balance

use anchor_lang::prelude::*;

use super::stake_helpers;
use super::validate_bid::init_balance;
use crate::errors::MarketError;
use crate::events::StakeReleased;
use crate::outcome::Outcome;
use crate::state::{Balance, Bid, BidLedger, MarketConfig, StakeLedger, StakeRecord, StakeTally};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct ReleaseStake<'info> {
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
        seeds = [b"stake", stake_ledger.key().as_ref(), &bid_id.to_le_bytes(), staker.key().as_ref()],
        bump = stake.bump
    )]
    pub stake: Account<'info, StakeRecord>,

    #[account(
        mut,
        seeds = [b"stake_tally", stake_ledger.key().as_ref(), &bid_id.to_le_bytes()],
        bump = tally.bump
    )]
    pub tally: Account<'info, StakeTally>,

    #[account(
        init_if_needed,
        payer = staker,
        space = Balance::SIZE,
        seeds = [b"balance", staker.key().as_ref()],
        bump
    )]
    pub balance: Account<'info, Balance>,

    #[account(mut)]
    pub staker: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(mut ctx: Context<ReleaseStake>, _bid_id: u64) -> Result<()> {
    let clock = Clock::get()?;
    check_version_compatible(&ctx.accounts.market)?;

    let coordinator = ctx.accounts.market.key();
    let staker = ctx.accounts.staker.key();
    let balance_bump = ctx.bumps.balance;
    let accounts = &mut ctx.accounts;
    init_balance(&mut accounts.balance, staker, balance_bump);

    let outcome = stake_helpers::release_stake(
        &mut accounts.market,
        &coordinator,
        &mut accounts.stake_ledger,
        &mut accounts.bid,
        &mut accounts.stake,
        &mut accounts.tally,
        &mut accounts.balance,
    )?;

    if let Outcome::StakeReleased {
        bid_id,
        value,
        reward,
    } = outcome
    {
        emit!(StakeReleased {
            bid_id,
            staker,
            value,
            reward,
            timestamp: clock.unix_timestamp,
        });
    }

    Ok(())
}
