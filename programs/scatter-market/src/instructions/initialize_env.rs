//! Create the config store

use anchor_lang::prelude::*;

use crate::state::EnvRegistry;

#[derive(Accounts)]
pub struct InitializeEnv<'info> {
    #[account(
        init,
        payer = owner,
        space = EnvRegistry::SIZE,
        seeds = [b"env"],
        bump
    )]
    pub env: Account<'info, EnvRegistry>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<InitializeEnv>) -> Result<()> {
    let env = &mut ctx.accounts.env;
    env.owner = ctx.accounts.owner.key();
    env.entry_count = 0;
    env.ban_count = 0;
    env.bump = ctx.bumps.env;

    msg!("Env registry initialized, owner {}", env.owner);
    Ok(())
}
