//! Record the caller's file

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::events::UserRegistered;
use crate::state::UserRecord;

#[derive(Accounts)]
pub struct RegisterUser<'info> {
    #[account(
        init_if_needed,
        payer = authority,
        space = UserRecord::SIZE,
        seeds = [b"user", authority.key().as_ref()],
        bump
    )]
    pub user: Account<'info, UserRecord>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// Exactly one file per account; registering again overwrites.
pub fn handler(ctx: Context<RegisterUser>, file_hash: [u8; 32]) -> Result<()> {
    require!(file_hash != [0u8; 32], MarketError::InvalidFileHash);
    let clock = Clock::get()?;

    let user = &mut ctx.accounts.user;
    user.authority = ctx.accounts.authority.key();
    user.file_hash = file_hash;
    user.registered_at = clock.unix_timestamp;
    user.bump = ctx.bumps.user;

    emit!(UserRegistered {
        user: user.authority,
        file_hash,
        timestamp: clock.unix_timestamp,
    });
    Ok(())
}
