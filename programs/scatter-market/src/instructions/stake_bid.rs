//! Post collateral toward pinning a pinner-count bid

use anchor_lang::prelude::*;
use anchor_lang::system_program;

use super::stake_helpers::stake_on_bid;
use crate::errors::MarketError;
use crate::events::PinStake;
use crate::outcome::Outcome;
use crate::state::{Bid, BidLedger, MarketConfig, StakeLedger, StakeRecord, StakeTally};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct StakeBid<'info> {
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
        init_if_needed,
        payer = staker,
        space = StakeRecord::SIZE,
        seeds = [b"stake", stake_ledger.key().as_ref(), &bid_id.to_le_bytes(), staker.key().as_ref()],
        bump
    )]
    pub stake: Account<'info, StakeRecord>,

    #[account(
        init_if_needed,
        payer = staker,
        space = StakeTally::SIZE,
        seeds = [b"stake_tally", stake_ledger.key().as_ref(), &bid_id.to_le_bytes()],
        bump
    )]
    pub tally: Account<'info, StakeTally>,

    #[account(mut)]
    pub staker: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// `proof_signer` is the secp256k1 address that will sign this staker's
/// defenses.
pub fn handler(
    mut ctx: Context<StakeBid>,
    bid_id: u64,
    amount: u64,
    proof_signer: [u8; 20],
) -> Result<()> {
    let clock = Clock::get()?;
    check_version_compatible(&ctx.accounts.market)?;

    let coordinator = ctx.accounts.market.key();
    let staker = ctx.accounts.staker.key();
    let stake_bump = ctx.bumps.stake;
    let tally_bump = ctx.bumps.tally;

    let accounts = &mut ctx.accounts;
    let outcome = stake_on_bid(
        &mut accounts.market,
        &coordinator,
        &mut accounts.stake_ledger,
        &accounts.bid,
        &mut accounts.stake,
        &mut accounts.tally,
        staker,
        amount,
        proof_signer,
    )?;
    accounts.stake.bump = stake_bump;
    accounts.tally.bump = tally_bump;

    system_program::transfer(
        CpiContext::new(
            accounts.system_program.to_account_info(),
            system_program::Transfer {
                from: accounts.staker.to_account_info(),
                to: accounts.market.to_account_info(),
            },
        ),
        amount,
    )?;

    if let Outcome::PinStake { bid_id, value, nonce } = outcome {
        emit!(PinStake {
            bid_id,
            staker,
            amount,
            value,
            nonce,
            timestamp: clock.unix_timestamp,
        });
    }

    Ok(())
}
