//! Snapshot config entries into the market parameters (permissionless)

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::events::ParamsSynced;
use crate::instructions::constants::*;
use crate::state::{EnvEntry, MarketConfig};
use crate::utils::keys::name_hash;
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
pub struct SyncParams<'info> {
    #[account(mut, seeds = [b"market"], bump = market.bump)]
    pub market: Account<'info, MarketConfig>,

    pub min_bid: Option<Account<'info, EnvEntry>>,

    pub min_duration: Option<Account<'info, EnvEntry>>,

    pub accept_hold_duration: Option<Account<'info, EnvEntry>>,

    pub default_min_validations: Option<Account<'info, EnvEntry>>,

    pub defense_window: Option<Account<'info, EnvEntry>>,
}

/// Unsigned value of an entry, checked against the expected key name.
fn entry_value(entry: &Option<Account<EnvEntry>>, name: &str) -> Result<Option<u64>> {
    match entry {
        Some(entry) => {
            require!(entry.key == name_hash(name), MarketError::EnvKeyMismatch);
            Ok(Some(entry.uint_value))
        }
        None => Ok(None),
    }
}

fn to_seconds(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| error!(MarketError::InvalidParameter))
}

/// Absent entries keep the current parameter.
pub fn apply_params(
    market: &mut MarketConfig,
    min_bid: Option<u64>,
    min_duration: Option<u64>,
    accept_hold_duration: Option<u64>,
    default_min_validations: Option<u64>,
    defense_window: Option<u64>,
) -> Result<()> {
    if let Some(value) = min_bid {
        market.min_bid = value;
    }
    if let Some(value) = min_duration {
        market.min_duration = to_seconds(value)?;
    }
    if let Some(value) = accept_hold_duration {
        require!(value > 0, MarketError::InvalidParameter);
        market.accept_hold_duration = to_seconds(value)?;
    }
    if let Some(value) = default_min_validations {
        require!(
            value > 0 && value <= u64::from(MAX_VALIDATORS),
            MarketError::InvalidParameter
        );
        market.default_min_validations =
            u16::try_from(value).map_err(|_| error!(MarketError::InvalidParameter))?;
    }
    if let Some(value) = defense_window {
        require!(value > 0, MarketError::InvalidParameter);
        market.defense_window = to_seconds(value)?;
    }
    Ok(())
}

pub fn handler(mut ctx: Context<SyncParams>) -> Result<()> {
    check_version_compatible(&ctx.accounts.market)?;

    let accounts = &mut ctx.accounts;
    let min_bid = entry_value(&accounts.min_bid, ENV_MIN_BID)?;
    let min_duration = entry_value(&accounts.min_duration, ENV_MIN_DURATION)?;
    let accept_hold = entry_value(&accounts.accept_hold_duration, ENV_ACCEPT_HOLD_DURATION)?;
    let quorum = entry_value(&accounts.default_min_validations, ENV_DEFAULT_MIN_VALIDATIONS)?;
    let window = entry_value(&accounts.defense_window, ENV_DEFENSE_WINDOW)?;

    let market = &mut accounts.market;
    apply_params(market, min_bid, min_duration, accept_hold, quorum, window)?;

    msg!(
        "Params synced: min_bid={} min_duration={} hold={} quorum={} window={}",
        market.min_bid,
        market.min_duration,
        market.accept_hold_duration,
        market.default_min_validations,
        market.defense_window
    );

    emit!(ParamsSynced {
        min_bid: market.min_bid,
        min_duration: market.min_duration,
        accept_hold_duration: market.accept_hold_duration,
        default_min_validations: market.default_min_validations,
        defense_window: market.defense_window,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_entries_keep_values() {
        let mut market = MarketConfig::default();
        apply_params(&mut market, Some(500), None, None, None, None).unwrap();
        assert_eq!(market.min_bid, 500);
        assert_eq!(market.min_duration, DEFAULT_MIN_DURATION);
        assert_eq!(market.accept_hold_duration, DEFAULT_ACCEPT_HOLD_DURATION);
        assert_eq!(market.default_min_validations, DEFAULT_MIN_VALIDATIONS);
        assert_eq!(market.defense_window, DEFAULT_DEFENSE_WINDOW);
    }

    #[test]
    fn test_all_entries_applied() {
        let mut market = MarketConfig::default();
        apply_params(&mut market, Some(1), Some(2), Some(3), Some(4), Some(5)).unwrap();
        assert_eq!(market.min_bid, 1);
        assert_eq!(market.min_duration, 2);
        assert_eq!(market.accept_hold_duration, 3);
        assert_eq!(market.default_min_validations, 4);
        assert_eq!(market.defense_window, 5);
    }

    #[test]
    fn test_zero_quorum_and_windows_rejected() {
        let mut market = MarketConfig::default();
        assert!(apply_params(&mut market, None, None, Some(0), None, None).is_err());
        assert!(apply_params(&mut market, None, None, None, Some(0), None).is_err());
        assert!(apply_params(&mut market, None, None, None, None, Some(0)).is_err());
        assert!(apply_params(
            &mut market,
            None,
            None,
            None,
            Some(u64::from(MAX_VALIDATORS) + 1),
            None
        )
        .is_err());
    }

    #[test]
    fn test_oversized_duration_rejected() {
        let mut market = MarketConfig::default();
        assert!(apply_params(&mut market, None, Some(u64::MAX), None, None, None).is_err());
    }
}
