//! Point a route name at an identity (owner only)

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::events::RouteSet;
use crate::state::Router;

#[derive(Accounts)]
pub struct SetRoute<'info> {
    #[account(
        mut,
        seeds = [b"router"],
        bump = router.bump,
        has_one = owner @ MarketError::Unauthorized
    )]
    pub router: Account<'info, Router>,

    pub owner: Signer<'info>,
}

pub fn handler(ctx: Context<SetRoute>, name_hash: [u8; 32], target: Pubkey) -> Result<()> {
    ctx.accounts.router.set(name_hash, target)?;

    emit!(RouteSet {
        name_hash,
        target,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
