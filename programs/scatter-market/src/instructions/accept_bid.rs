//! Become the candidate hoster of a validation bid

use anchor_lang::prelude::*;

use super::bid_helpers;
use crate::errors::MarketError;
use crate::events::{AcceptRejected, AcceptWait, Accepted};
use crate::outcome::Outcome;
use crate::state::{Bid, BidLedger, MarketConfig};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct AcceptBid<'info> {
    #[account(seeds = [b"market"], bump = market.bump)]
    pub market: Account<'info, MarketConfig>,

    #[account(address = market.bid_ledger @ MarketError::StaleReference)]
    pub bid_ledger: Account<'info, BidLedger>,

    #[account(
        mut,
        seeds = [b"bid", bid_ledger.key().as_ref(), &bid_id.to_le_bytes()],
        bump = bid.bump
    )]
    pub bid: Account<'info, Bid>,

    pub hoster: Signer<'info>,
}

pub fn handler(ctx: Context<AcceptBid>, bid_id: u64) -> Result<()> {
    let clock = Clock::get()?;
    check_version_compatible(&ctx.accounts.market)?;
    require!(
        ctx.accounts.bid_ledger.bid_exists(bid_id),
        MarketError::BidNotFound
    );

    let hoster = ctx.accounts.hoster.key();
    let hold = ctx.accounts.market.accept_hold_duration;
    let outcome = bid_helpers::accept_bid(&mut ctx.accounts.bid, hoster, clock.unix_timestamp, hold)?;

    match outcome {
        Outcome::Accepted { bid_id, hoster } => emit!(Accepted {
            bid_id,
            hoster,
            timestamp: clock.unix_timestamp,
        }),
        Outcome::AcceptWait {
            bid_id,
            candidate,
            available_at,
        } => emit!(AcceptWait {
            bid_id,
            hoster,
            candidate,
            available_at,
            timestamp: clock.unix_timestamp,
        }),
        Outcome::AcceptRejected { bid_id, reason } => emit!(AcceptRejected {
            bid_id,
            hoster,
            reason: reason.to_string(),
            timestamp: clock.unix_timestamp,
        }),
        _ => {}
    }

    Ok(())
}
