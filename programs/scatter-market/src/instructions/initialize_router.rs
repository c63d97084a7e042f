//! Create the service registry

use anchor_lang::prelude::*;

use crate::state::Router;

#[derive(Accounts)]
pub struct InitializeRouter<'info> {
    #[account(
        init,
        payer = owner,
        space = Router::SIZE,
        seeds = [b"router"],
        bump
    )]
    pub router: Account<'info, Router>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<InitializeRouter>) -> Result<()> {
    let router = &mut ctx.accounts.router;
    router.owner = ctx.accounts.owner.key();
    router.route_count = 0;
    router.bump = ctx.bumps.router;

    msg!("Router initialized, owner {}", router.owner);
    Ok(())
}
