//! Submit a bid to host a file, escrowing price plus validation pool

use anchor_lang::prelude::*;
use anchor_lang::system_program;

use super::account_helpers::{create_pda_account, is_banned, write_account};
use super::bid_helpers::{self, BidTerms};
use crate::errors::MarketError;
use crate::events::{BidInvalid, BidSuccessful};
use crate::outcome::Outcome;
use crate::state::{Bid, BidLedger, MarketConfig, Quorum};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
pub struct PlaceBid<'info> {
    #[account(mut, seeds = [b"market"], bump = market.bump)]
    pub market: Account<'info, MarketConfig>,

    #[account(
        mut,
        address = market.bid_ledger @ MarketError::StaleReference
    )]
    pub bid_ledger: Account<'info, BidLedger>,

    /// CHECK: Created in the handler only when the bid is valid.
    /// Address is the PDA of the next bid id.
    #[account(
        mut,
        seeds = [b"bid", bid_ledger.key().as_ref(), &bid_ledger.next_id().to_le_bytes()],
        bump
    )]
    pub bid: UncheckedAccount<'info>,

    /// CHECK: Ban list entry for the bidder; banned when it exists
    #[account(seeds = [b"ban", bidder.key().as_ref()], bump)]
    pub ban_record: UncheckedAccount<'info>,

    #[account(mut)]
    pub bidder: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// Invalid terms are reported with `BidInvalid` and change nothing; no value
/// moves and no bid account is created.
#[allow(clippy::too_many_arguments)]
pub fn handler(
    mut ctx: Context<PlaceBid>,
    file_hash: [u8; 32],
    file_size: u64,
    duration: i64,
    price: u64,
    validation_pool: u64,
    quorum: Option<Quorum>,
    value: u64,
) -> Result<()> {
    let clock = Clock::get()?;
    check_version_compatible(&ctx.accounts.market)?;

    let terms = BidTerms {
        file_hash,
        file_size,
        duration,
        price,
        validation_pool,
        quorum,
    };
    let banned = is_banned(&ctx.accounts.ban_record, ctx.program_id);
    let coordinator = ctx.accounts.market.key();
    let bidder = ctx.accounts.bidder.key();
    let bid_bump = ctx.bumps.bid;

    let accounts = &mut ctx.accounts;
    let (outcome, bid) = bid_helpers::place_bid(
        &mut accounts.market,
        &coordinator,
        &mut accounts.bid_ledger,
        bidder,
        &terms,
        value,
        banned,
        clock.unix_timestamp,
        bid_bump,
    )?;

    match (outcome, bid) {
        (Outcome::BidSuccessful { bid_id }, Some(bid)) => {
            system_program::transfer(
                CpiContext::new(
                    accounts.system_program.to_account_info(),
                    system_program::Transfer {
                        from: accounts.bidder.to_account_info(),
                        to: accounts.market.to_account_info(),
                    },
                ),
                value,
            )?;

            let ledger_key = accounts.bid_ledger.key();
            let id_bytes = bid_id.to_le_bytes();
            let seeds: &[&[u8]] = &[b"bid", ledger_key.as_ref(), &id_bytes, &[bid_bump]];
            let bid_info = accounts.bid.to_account_info();
            create_pda_account(
                &accounts.bidder.to_account_info(),
                &bid_info,
                &accounts.system_program.to_account_info(),
                Bid::SIZE,
                seeds,
            )?;
            write_account(&bid_info, &bid)?;

            emit!(BidSuccessful {
                bid_id,
                bidder,
                price,
                validation_pool,
                file_hash,
                file_size,
                timestamp: clock.unix_timestamp,
            });
        }
        (Outcome::BidInvalid { reason }, _) => {
            msg!("Bid rejected: {}", reason);
            emit!(BidInvalid {
                bidder,
                reason: reason.to_string(),
                timestamp: clock.unix_timestamp,
            });
        }
        _ => return err!(MarketError::BidNotFound),
    }

    Ok(())
}
