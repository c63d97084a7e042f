//! Create a generation of the four ledgers

use anchor_lang::prelude::*;

use crate::events::LedgersInitialized;
use crate::state::{BidLedger, ChallengeLedger, DefenseLedger, StakeLedger};
use crate::utils::writers::WriterSet;

#[derive(Accounts)]
#[instruction(generation: u8)]
pub struct InitializeLedgers<'info> {
    #[account(
        init,
        payer = owner,
        space = BidLedger::SIZE,
        seeds = [b"bid_ledger".as_ref(), &[generation]],
        bump
    )]
    pub bid_ledger: Account<'info, BidLedger>,

    #[account(
        init,
        payer = owner,
        space = StakeLedger::SIZE,
        seeds = [b"stake_ledger".as_ref(), &[generation]],
        bump
    )]
    pub stake_ledger: Account<'info, StakeLedger>,

    #[account(
        init,
        payer = owner,
        space = ChallengeLedger::SIZE,
        seeds = [b"challenge_ledger".as_ref(), &[generation]],
        bump
    )]
    pub challenge_ledger: Account<'info, ChallengeLedger>,

    #[account(
        init,
        payer = owner,
        space = DefenseLedger::SIZE,
        seeds = [b"defense_ledger".as_ref(), &[generation]],
        bump
    )]
    pub defense_ledger: Account<'info, DefenseLedger>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// Ledgers start with an empty writer set; the owner grants the market
/// afterwards.
pub fn handler(ctx: Context<InitializeLedgers>, generation: u8) -> Result<()> {
    let owner = ctx.accounts.owner.key();
    let writers = WriterSet::new(owner);

    let bid_ledger = &mut ctx.accounts.bid_ledger;
    bid_ledger.writers = writers;
    bid_ledger.generation = generation;
    bid_ledger.bid_count = 0;
    bid_ledger.bump = ctx.bumps.bid_ledger;

    let stake_ledger = &mut ctx.accounts.stake_ledger;
    stake_ledger.writers = writers;
    stake_ledger.generation = generation;
    stake_ledger.total_staked = 0;
    stake_ledger.bump = ctx.bumps.stake_ledger;

    let challenge_ledger = &mut ctx.accounts.challenge_ledger;
    challenge_ledger.writers = writers;
    challenge_ledger.generation = generation;
    challenge_ledger.challenge_count = 0;
    challenge_ledger.bump = ctx.bumps.challenge_ledger;

    let defense_ledger = &mut ctx.accounts.defense_ledger;
    defense_ledger.writers = writers;
    defense_ledger.generation = generation;
    defense_ledger.defense_count = 0;
    defense_ledger.bump = ctx.bumps.defense_ledger;

    emit!(LedgersInitialized {
        generation,
        owner,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
