//! Burn stakes left on a failed bid
//!
//! Permissionless. The stakes to burn are passed as remaining accounts; any
//! subset may be supplied and the call may be repeated until the bid's stake
//! tally reaches zero.

use anchor_lang::prelude::*;

use super::account_helpers::{load_stake_set, store_stake_set};
use super::stake_helpers;
use crate::errors::MarketError;
use crate::events::StakesBurned;
use crate::state::{Bid, BidLedger, MarketConfig, StakeLedger, StakeTally};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct BurnStakes<'info> {
    #[account(mut, seeds = [b"market"], bump = market.bump)]
    pub market: Account<'info, MarketConfig>,

    #[account(address = market.bid_ledger @ MarketError::StaleReference)]
    pub bid_ledger: Account<'info, BidLedger>,

    #[account(
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

    pub caller: Signer<'info>,
}

pub fn handler<'info>(
    mut ctx: Context<'_, '_, 'info, 'info, BurnStakes<'info>>,
    bid_id: u64,
) -> Result<()> {
    let clock = Clock::get()?;
    check_version_compatible(&ctx.accounts.market)?;

    let coordinator = ctx.accounts.market.key();
    let accounts = &mut ctx.accounts;

    let mut stakes = load_stake_set(
        ctx.remaining_accounts,
        &accounts.stake_ledger.key(),
        bid_id,
        &Pubkey::default(),
        ctx.program_id,
    )?;
    let (stakes_burned, value_burned) = stake_helpers::burn_stakes(
        &mut accounts.market,
        &coordinator,
        &mut accounts.stake_ledger,
        &accounts.bid,
        &mut accounts.tally,
        stakes.iter_mut(),
    )?;
    store_stake_set(ctx.remaining_accounts, &stakes)?;

    emit!(StakesBurned {
        bid_id,
        stakes_burned,
        value_burned,
        stakes_outstanding: accounts.tally.stake_count,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
