//! Declare a bid pinned
//!
//! Validation bids: the hoster confirms the pin. Pinner-count bids: a staked
//! account pins, and the second pin raises the bid's challenge.

use anchor_lang::prelude::*;

use super::account_helpers::{create_pda_account, stake_address, write_account};
use super::bid_helpers::confirm_pin;
use super::defense_helpers::raise_challenge;
use super::stake_helpers::pin_with_stake;
use crate::errors::MarketError;
use crate::events::{Challenge, FilePinned, NotOpenToPin, PinRejected, Pinned};
use crate::outcome::Outcome;
use crate::state::{Bid, BidLedger, ChallengeLedger, ChallengeRecord, MarketConfig, QuorumKind, StakeRecord};
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
#[instruction(bid_id: u64)]
pub struct PinBid<'info> {
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

    /// Pinner's stake (pinner-count bids); address checked in the handler
    #[account(mut)]
    pub stake: Option<Account<'info, StakeRecord>>,

    /// Required when this pin raises the challenge
    #[account(
        mut,
        address = market.challenge_ledger @ MarketError::StaleReference
    )]
    pub challenge_ledger: Option<Account<'info, ChallengeLedger>>,

    /// CHECK: Created in the handler when this pin raises the challenge; address
    /// checked against the next challenge id
    #[account(mut)]
    pub challenge: Option<UncheckedAccount<'info>>,

    #[account(mut)]
    pub pinner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(mut ctx: Context<PinBid>, bid_id: u64) -> Result<()> {
    let clock = Clock::get()?;
    let now = clock.unix_timestamp;
    check_version_compatible(&ctx.accounts.market)?;

    let pinner = ctx.accounts.pinner.key();
    let accounts = &mut ctx.accounts;

    let outcome = match accounts.bid.quorum_kind {
        QuorumKind::Validation => confirm_pin(
            &mut accounts.bid,
            pinner,
            now,
            accounts.market.accept_hold_duration,
        )?,
        QuorumKind::PinnerCount => {
            if let Some(stake) = accounts.stake.as_ref() {
                let expected = stake_address(
                    &accounts.market.stake_ledger,
                    bid_id,
                    &pinner,
                    stake.bump,
                    ctx.program_id,
                )?;
                require_keys_eq!(expected, stake.key(), MarketError::StaleReference);
            }
            pin_with_stake(&mut accounts.bid, accounts.stake.as_deref_mut(), pinner, now)?
        }
    };

    match outcome {
        Outcome::Pinned { bid_id, hoster } => emit!(Pinned {
            bid_id,
            hoster,
            timestamp: now,
        }),
        Outcome::FilePinned {
            bid_id,
            pinner_count,
            raises_challenge,
        } => {
            emit!(FilePinned {
                bid_id,
                pinner,
                pinner_count,
                timestamp: now,
            });
            if raises_challenge {
                let record = open_challenge(accounts, ctx.program_id, now)?;
                emit!(Challenge {
                    challenge_id: record.id,
                    bid_id,
                    issuer: record.issuer,
                    deadline: accounts.bid.challenge_deadline,
                    timestamp: now,
                });
            }
        }
        Outcome::NotOpenToPin { bid_id } => emit!(NotOpenToPin {
            bid_id,
            pinner,
            timestamp: now,
        }),
        Outcome::PinRejected { bid_id, reason } => emit!(PinRejected {
            bid_id,
            pinner,
            reason: reason.to_string(),
            timestamp: now,
        }),
        _ => {}
    }

    Ok(())
}

/// Append the bid's challenge and create its record account.
fn open_challenge(accounts: &mut PinBid, program_id: &Pubkey, now: i64) -> Result<ChallengeRecord> {
    let ledger = accounts
        .challenge_ledger
        .as_mut()
        .ok_or(MarketError::MissingChallengeAccount)?;
    let challenge = accounts
        .challenge
        .as_ref()
        .ok_or(MarketError::MissingChallengeAccount)?;

    let ledger_key = ledger.key();
    let id_bytes = ledger.next_id().to_le_bytes();
    let (expected, bump) =
        Pubkey::find_program_address(&[b"challenge", ledger_key.as_ref(), &id_bytes], program_id);
    require_keys_eq!(expected, challenge.key(), MarketError::StaleReference);

    let issuer = accounts.market.key();
    let record = raise_challenge(
        &mut accounts.bid,
        ledger,
        issuer,
        now,
        accounts.market.defense_window,
        bump,
    )?;

    let seeds: &[&[u8]] = &[b"challenge", ledger_key.as_ref(), &id_bytes, &[bump]];
    let info = challenge.to_account_info();
    create_pda_account(
        &accounts.pinner.to_account_info(),
        &info,
        &accounts.system_program.to_account_info(),
        ChallengeRecord::SIZE,
        seeds,
    )?;
    write_account(&info, &record)?;

    Ok(record)
}
