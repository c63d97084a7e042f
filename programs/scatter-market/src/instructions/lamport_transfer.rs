//! Vault payouts with checked arithmetic.
//!
//! Value enters the vault by system transfer; it leaves by direct lamport
//! moves, which the runtime permits because the market PDA is program-owned.

use crate::errors::MarketError;
use crate::state::MarketConfig;
use anchor_lang::prelude::*;

/// Move `amount` lamports between accounts. No-op for zero.
pub fn transfer_lamports<'info>(
    from: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    amount: u64,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    **from.try_borrow_mut_lamports()? = from
        .lamports()
        .checked_sub(amount)
        .ok_or(MarketError::ArithmeticOverflow)?;
    **to.try_borrow_mut_lamports()? = to
        .lamports()
        .checked_add(amount)
        .ok_or(MarketError::ArithmeticOverflow)?;
    Ok(())
}

/// Lamports in the vault above its rent-exempt reserve
pub fn vault_available(vault: &AccountInfo, rent: &Rent) -> u64 {
    vault
        .lamports()
        .saturating_sub(rent.minimum_balance(vault.data_len()))
}

/// Pay `amount` out of the market vault, never dipping into rent.
pub fn pay_from_vault<'info>(
    vault: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    amount: u64,
) -> Result<()> {
    let rent = Rent::get()?;
    require!(
        vault_available(vault, &rent) >= amount,
        MarketError::InsufficientVaultBalance
    );
    transfer_lamports(vault, to, amount)
}

/// Vault holdings the accounting expects, for diagnostics
pub fn expected_holdings(market: &MarketConfig) -> Result<u64> {
    market
        .total_held()
        .ok_or_else(|| error!(MarketError::ArithmeticOverflow))
}
