//! Cast a verdict on a pinned validation bid

use anchor_lang::prelude::*;

use super::bid_helpers::record_validation;
use crate::errors::MarketError;
use crate::events::{BidSatisfied, ValidationOccurred, ValidationRejected};
use crate::outcome::Outcome;
use crate::state::{Balance, Bid, BidLedger, MarketConfig, ValidationRecord};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct ValidateBid<'info> {
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

    /// One record per (bid, validator); an existing record means a duplicate vote
    #[account(
        init_if_needed,
        payer = validator,
        space = ValidationRecord::SIZE,
        seeds = [b"validation", bid.key().as_ref(), validator.key().as_ref()],
        bump
    )]
    pub validation: Account<'info, ValidationRecord>,

    #[account(
        init_if_needed,
        payer = validator,
        space = Balance::SIZE,
        seeds = [b"balance", validator.key().as_ref()],
        bump
    )]
    pub validator_balance: Account<'info, Balance>,

    #[account(
        init_if_needed,
        payer = validator,
        space = Balance::SIZE,
        seeds = [b"balance", bid.hoster.as_ref()],
        bump
    )]
    pub hoster_balance: Account<'info, Balance>,

    #[account(mut)]
    pub validator: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(mut ctx: Context<ValidateBid>, _bid_id: u64, is_valid: bool) -> Result<()> {
    let clock = Clock::get()?;
    check_version_compatible(&ctx.accounts.market)?;

    let validator = ctx.accounts.validator.key();
    let validation_bump = ctx.bumps.validation;
    let validator_balance_bump = ctx.bumps.validator_balance;
    let hoster_balance_bump = ctx.bumps.hoster_balance;

    let accounts = &mut ctx.accounts;
    init_balance(&mut accounts.validator_balance, validator, validator_balance_bump);
    let hoster = accounts.bid.hoster;
    init_balance(&mut accounts.hoster_balance, hoster, hoster_balance_bump);

    let outcome = record_validation(
        &mut accounts.market,
        &mut accounts.bid,
        &mut accounts.validation,
        &mut accounts.validator_balance,
        &mut accounts.hoster_balance,
        validator,
        is_valid,
        clock.unix_timestamp,
        validation_bump,
    )?;

    match outcome {
        Outcome::Validated {
            bid_id,
            is_valid,
            sway,
            payment,
            satisfied_now,
        } => {
            emit!(ValidationOccurred {
                bid_id,
                validator,
                is_valid,
                sway,
                payment,
                timestamp: clock.unix_timestamp,
            });
            if satisfied_now {
                emit!(BidSatisfied {
                    bid_id,
                    hoster,
                    price: accounts.bid.price,
                    timestamp: clock.unix_timestamp,
                });
            }
        }
        Outcome::ValidationRejected { bid_id, reason } => emit!(ValidationRejected {
            bid_id,
            validator,
            reason: reason.to_string(),
            timestamp: clock.unix_timestamp,
        }),
        _ => {}
    }

    Ok(())
}

/// Stamp a balance created by `init_if_needed`.
pub fn init_balance(balance: &mut Balance, account: Pubkey, bump: u8) {
    if balance.account == Pubkey::default() {
        balance.account = account;
        balance.bump = bump;
    }
}
