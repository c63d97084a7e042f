//! Direct appends to the challenge and defense ledgers by granted writers
//!
//! These bypass the market's bid state: the ledgers only check that the signer
//! holds write permission. The market itself writes through the same ledgers
//! when pinning and defending.

use anchor_lang::prelude::*;

use super::defense_helpers::{record_defense, DefenseProof};
use crate::events::RecordAppended;
use crate::state::{ChallengeLedger, ChallengeRecord, DefenseLedger, DefenseRecord};

#[derive(Accounts)]
pub struct AppendChallenge<'info> {
    #[account(mut)]
    pub ledger: Account<'info, ChallengeLedger>,

    #[account(
        init,
        payer = writer,
        space = ChallengeRecord::SIZE,
        seeds = [b"challenge", ledger.key().as_ref(), &ledger.next_id().to_le_bytes()],
        bump
    )]
    pub record: Account<'info, ChallengeRecord>,

    #[account(mut)]
    pub writer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handle_challenge(ctx: Context<AppendChallenge>, bid_id: u64) -> Result<()> {
    let clock = Clock::get()?;
    let writer = ctx.accounts.writer.key();

    let id = ctx.accounts.ledger.add_challenge(&writer)?;
    ctx.accounts.record.set_inner(ChallengeRecord {
        id,
        bid_id,
        issuer: writer,
        created_at: clock.unix_timestamp,
        bump: ctx.bumps.record,
    });

    emit!(RecordAppended {
        ledger: ctx.accounts.ledger.key(),
        record_id: id,
        writer,
        timestamp: clock.unix_timestamp,
    });
    Ok(())
}

#[derive(Accounts)]
pub struct AppendDefense<'info> {
    #[account(mut)]
    pub ledger: Account<'info, DefenseLedger>,

    #[account(
        init,
        payer = writer,
        space = DefenseRecord::SIZE,
        seeds = [b"defense", ledger.key().as_ref(), &ledger.next_id().to_le_bytes()],
        bump
    )]
    pub record: Account<'info, DefenseRecord>,

    #[account(mut)]
    pub writer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handle_defense(
    ctx: Context<AppendDefense>,
    bid_id: u64,
    challenge_id: u64,
    nonce: u64,
    defender: Pubkey,
    proof: DefenseProof,
) -> Result<()> {
    let clock = Clock::get()?;
    let writer = ctx.accounts.writer.key();

    let record = record_defense(
        &mut ctx.accounts.ledger,
        &writer,
        bid_id,
        challenge_id,
        nonce,
        defender,
        &proof,
        clock.unix_timestamp,
        ctx.bumps.record,
    )?;
    let id = record.id;
    ctx.accounts.record.set_inner(record);

    emit!(RecordAppended {
        ledger: ctx.accounts.ledger.key(),
        record_id: id,
        writer,
        timestamp: clock.unix_timestamp,
    });
    Ok(())
}
