//! Hoster withdrawal of a settled bid's payout

use anchor_lang::prelude::*;

use super::lamport_transfer::pay_from_vault;
use super::withdraw_helpers::withdraw_for_bid;
use crate::errors::MarketError;
use crate::events::{WithdrawFailed, WithdrawHoster};
use crate::outcome::Outcome;
use crate::state::{Balance, Bid, BidLedger, MarketConfig};

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct WithdrawBid<'info> {
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
        seeds = [b"balance", caller.key().as_ref()],
        bump = balance.bump
    )]
    pub balance: Option<Account<'info, Balance>>,

    #[account(mut)]
    pub caller: Signer<'info>,
}

pub fn handler(mut ctx: Context<WithdrawBid>, bid_id: u64) -> Result<()> {
    let clock = Clock::get()?;
    let caller = ctx.accounts.caller.key();

    let accounts = &mut ctx.accounts;
    let outcome = withdraw_for_bid(
        &mut accounts.market,
        &mut accounts.bid,
        caller,
        accounts.balance.as_deref_mut(),
    )?;

    match outcome {
        Outcome::Withdrawn { value } => {
            pay_from_vault(
                &accounts.market.to_account_info(),
                &accounts.caller.to_account_info(),
                value,
            )?;
            emit!(WithdrawHoster {
                bid_id,
                hoster: caller,
                value,
                timestamp: clock.unix_timestamp,
            });
        }
        Outcome::WithdrawFailed { reason } => emit!(WithdrawFailed {
            account: caller,
            reason: reason.to_string(),
            timestamp: clock.unix_timestamp,
        }),
        _ => {}
    }

    Ok(())
}
