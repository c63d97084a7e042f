//! Add an account to the ban list (owner only)

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::events::BanUpdated;
use crate::state::{BanRecord, EnvRegistry};

#[derive(Accounts)]
#[instruction(account: Pubkey)]
pub struct BanAccount<'info> {
    #[account(
        mut,
        seeds = [b"env"],
        bump = env.bump,
        has_one = owner @ MarketError::Unauthorized
    )]
    pub env: Account<'info, EnvRegistry>,

    #[account(
        init_if_needed,
        payer = owner,
        space = BanRecord::SIZE,
        seeds = [b"ban", account.as_ref()],
        bump
    )]
    pub ban_record: Account<'info, BanRecord>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<BanAccount>, account: Pubkey) -> Result<()> {
    let clock = Clock::get()?;
    let record = &mut ctx.accounts.ban_record;

    // Banning twice keeps the original record
    if record.account == Pubkey::default() {
        record.account = account;
        record.banned_at = clock.unix_timestamp;
        record.bump = ctx.bumps.ban_record;
        ctx.accounts.env.ban_count = ctx
            .accounts
            .env
            .ban_count
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
    }

    emit!(BanUpdated {
        account,
        banned: true,
        timestamp: clock.unix_timestamp,
    });
    Ok(())
}
