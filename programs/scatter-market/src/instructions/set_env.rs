//! Typed config writes (owner only)
//!
//! One entry per key carries an unsigned, a string and a 32-byte slot.
//! Unset slots read as zero, empty or all-zero bytes.

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::events::EnvValueSet;
use crate::state::{EnvEntry, EnvRegistry, EnvValueKind};
use crate::utils::validation::validate_env_string;

#[derive(Accounts)]
#[instruction(key: [u8; 32])]
pub struct SetEnv<'info> {
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
        space = EnvEntry::SIZE,
        seeds = [b"env_entry", key.as_ref()],
        bump
    )]
    pub entry: Account<'info, EnvEntry>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// First write to a key stamps it and counts it.
fn prepare_entry(accounts: &mut SetEnv, bump: u8, key: [u8; 32]) -> Result<i64> {
    require!(key != [0u8; 32], MarketError::InvalidParameter);
    let timestamp = Clock::get()?.unix_timestamp;

    if accounts.entry.key == [0u8; 32] {
        accounts.entry.key = key;
        accounts.entry.bump = bump;
        accounts.env.entry_count = accounts
            .env
            .entry_count
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
    }
    accounts.entry.updated_at = timestamp;
    Ok(timestamp)
}

pub fn handle_uint(ctx: Context<SetEnv>, key: [u8; 32], value: u64) -> Result<()> {
    let timestamp = prepare_entry(ctx.accounts, ctx.bumps.entry, key)?;
    ctx.accounts.entry.uint_value = value;

    emit!(EnvValueSet {
        key,
        kind: EnvValueKind::Uint as u8,
        timestamp,
    });
    Ok(())
}

pub fn handle_str(ctx: Context<SetEnv>, key: [u8; 32], value: String) -> Result<()> {
    validate_env_string(&value)?;
    let timestamp = prepare_entry(ctx.accounts, ctx.bumps.entry, key)?;
    ctx.accounts.entry.str_value = value;

    emit!(EnvValueSet {
        key,
        kind: EnvValueKind::Str as u8,
        timestamp,
    });
    Ok(())
}

pub fn handle_bytes32(ctx: Context<SetEnv>, key: [u8; 32], value: [u8; 32]) -> Result<()> {
    let timestamp = prepare_entry(ctx.accounts, ctx.bumps.entry, key)?;
    ctx.accounts.entry.bytes32_value = value;

    emit!(EnvValueSet {
        key,
        kind: EnvValueKind::Bytes32 as u8,
        timestamp,
    });
    Ok(())
}
