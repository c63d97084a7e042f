//! Withdraw the caller's accumulated balance from the market vault

use anchor_lang::prelude::*;

use super::lamport_transfer::{expected_holdings, pay_from_vault};
use super::withdraw_helpers::withdraw_balance;
use crate::errors::MarketError;
use crate::events::{Withdraw, WithdrawFailed};
use crate::outcome::Outcome;
use crate::state::{Balance, MarketConfig};

#[derive(Accounts)]
pub struct WithdrawBalance<'info> {
    #[account(mut, seeds = [b"market"], bump = market.bump)]
    pub market: Account<'info, MarketConfig>,

    /// Absent for accounts that were never credited
    #[account(
        mut,
        seeds = [b"balance", caller.key().as_ref()],
        bump = balance.bump
    )]
    pub balance: Option<Account<'info, Balance>>,

    #[account(mut)]
    pub caller: Signer<'info>,
}

pub fn handler(ctx: Context<WithdrawBalance>) -> Result<()> {
    let clock = Clock::get()?;
    let caller = ctx.accounts.caller.key();

    if let Some(balance) = ctx.accounts.balance.as_ref() {
        require_keys_eq!(balance.account, caller, MarketError::Unauthorized);
    }

    let outcome = withdraw_balance(
        &mut ctx.accounts.market,
        ctx.accounts.balance.as_deref_mut(),
    )?;

    match outcome {
        Outcome::Withdrawn { value } => {
            pay_from_vault(
                &ctx.accounts.market.to_account_info(),
                &ctx.accounts.caller.to_account_info(),
                value,
            )?;
            msg!(
                "Withdrew {} lamports; vault now backs {}",
                value,
                expected_holdings(&ctx.accounts.market)?
            );
            emit!(Withdraw {
                account: caller,
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
