//! Create the marketplace coordinator and resolve its ledgers

use anchor_lang::prelude::*;

use super::update_references::resolve_references;
use crate::events::MarketInitialized;
use crate::state::{MarketConfig, Router};

#[derive(Accounts)]
pub struct InitializeMarket<'info> {
    #[account(
        init,
        payer = authority,
        space = MarketConfig::SIZE,
        seeds = [b"market"],
        bump
    )]
    pub market: Account<'info, MarketConfig>,

    #[account(seeds = [b"router"], bump = router.bump)]
    pub router: Account<'info, Router>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// Parameters start at their compile-time defaults until `sync_params`.
pub fn handler(ctx: Context<InitializeMarket>) -> Result<()> {
    let authority = ctx.accounts.authority.key();
    let router_key = ctx.accounts.router.key();

    let market = &mut ctx.accounts.market;
    market.set_inner(MarketConfig {
        authority,
        router: router_key,
        bump: ctx.bumps.market,
        ..MarketConfig::default()
    });
    resolve_references(market, &ctx.accounts.router);

    emit!(MarketInitialized {
        authority,
        router: router_key,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
