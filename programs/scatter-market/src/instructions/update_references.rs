//! Re-resolve ledger identities through the router (authority only)

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::events::ReferencesUpdated;
use crate::instructions::constants::{
    ROUTE_BID_STORE, ROUTE_CHALLENGE_STORE, ROUTE_DEFENSE_STORE, ROUTE_STAKE_STORE,
};
use crate::state::{MarketConfig, Router};
use crate::utils::keys::name_hash;
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
pub struct UpdateReferences<'info> {
    #[account(
        mut,
        seeds = [b"market"],
        bump = market.bump,
        has_one = authority @ MarketError::Unauthorized,
        has_one = router @ MarketError::StaleReference
    )]
    pub market: Account<'info, MarketConfig>,

    #[account(seeds = [b"router"], bump = router.bump)]
    pub router: Account<'info, Router>,

    pub authority: Signer<'info>,
}

/// Copy the four ledger routes into the market. Unset routes resolve to the
/// default key, which no ledger account can match.
pub fn resolve_references(market: &mut MarketConfig, router: &Router) {
    market.bid_ledger = router.get(&name_hash(ROUTE_BID_STORE));
    market.stake_ledger = router.get(&name_hash(ROUTE_STAKE_STORE));
    market.challenge_ledger = router.get(&name_hash(ROUTE_CHALLENGE_STORE));
    market.defense_ledger = router.get(&name_hash(ROUTE_DEFENSE_STORE));

    for (name, target) in [
        (ROUTE_BID_STORE, market.bid_ledger),
        (ROUTE_STAKE_STORE, market.stake_ledger),
        (ROUTE_CHALLENGE_STORE, market.challenge_ledger),
        (ROUTE_DEFENSE_STORE, market.defense_ledger),
    ] {
        if target == Pubkey::default() {
            msg!("Route {} is not set", name);
        }
    }
}

pub fn handler(ctx: Context<UpdateReferences>) -> Result<()> {
    check_version_compatible(&ctx.accounts.market)?;

    let market = &mut ctx.accounts.market;
    resolve_references(market, &ctx.accounts.router);

    emit!(ReferencesUpdated {
        bid_ledger: market.bid_ledger,
        stake_ledger: market.stake_ledger,
        challenge_ledger: market.challenge_ledger,
        defense_ledger: market.defense_ledger,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
