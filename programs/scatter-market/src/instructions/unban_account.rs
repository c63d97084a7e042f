//! Remove an account from the ban list (owner only)

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::events::BanUpdated;
use crate::state::{BanRecord, EnvRegistry};

#[derive(Accounts)]
#[instruction(account: Pubkey)]
pub struct UnbanAccount<'info> {
    #[account(
        mut,
        seeds = [b"env"],
        bump = env.bump,
        has_one = owner @ MarketError::Unauthorized
    )]
    pub env: Account<'info, EnvRegistry>,

    #[account(
        mut,
        close = owner,
        seeds = [b"ban", account.as_ref()],
        bump = ban_record.bump
    )]
    pub ban_record: Account<'info, BanRecord>,

    #[account(mut)]
    pub owner: Signer<'info>,
}

pub fn handler(ctx: Context<UnbanAccount>, account: Pubkey) -> Result<()> {
    let env = &mut ctx.accounts.env;
    env.ban_count = env
        .ban_count
        .checked_sub(1)
        .ok_or(MarketError::ArithmeticOverflow)?;

    // Record is closed automatically via `close = owner`
    emit!(BanUpdated {
        account,
        banned: false,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
