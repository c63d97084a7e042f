//! Version checking for market account upgrades

use crate::errors::MarketError;
use crate::state::{MarketConfig, CURRENT_PROTOCOL_VERSION, MIN_SUPPORTED_VERSION};
use anchor_lang::prelude::*;

/// Check that the market account version is compatible with the current program
///
/// # Returns
/// * `Ok(())` if version is compatible
/// * `Err(MarketError::AccountVersionTooOld)` if the account needs migration
/// * `Err(MarketError::AccountVersionTooNew)` if the program needs an upgrade
/// * `Err(MarketError::VersionMismatchProtocol)` if the account is inconsistent
pub fn check_version_compatible(market: &MarketConfig) -> Result<()> {
    if market.protocol_version < market.min_supported_version {
        msg!(
            "Market version {} is below its minimum supported {}",
            market.protocol_version,
            market.min_supported_version
        );
        return Err(MarketError::AccountVersionTooOld.into());
    }

    if market.protocol_version > CURRENT_PROTOCOL_VERSION {
        msg!(
            "Market version {} is newer than program version {}",
            market.protocol_version,
            CURRENT_PROTOCOL_VERSION
        );
        return Err(MarketError::AccountVersionTooNew.into());
    }

    if market.min_supported_version < MIN_SUPPORTED_VERSION
        || market.min_supported_version > CURRENT_PROTOCOL_VERSION
    {
        msg!(
            "Market min_supported_version {} is outside supported range {}-{}",
            market.min_supported_version,
            MIN_SUPPORTED_VERSION,
            CURRENT_PROTOCOL_VERSION
        );
        return Err(MarketError::VersionMismatchProtocol.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_market_is_compatible() {
        assert!(check_version_compatible(&MarketConfig::default()).is_ok());
    }

    #[test]
    fn test_future_version_rejected() {
        let market = MarketConfig {
            protocol_version: CURRENT_PROTOCOL_VERSION + 1,
            ..MarketConfig::default()
        };
        assert!(check_version_compatible(&market).is_err());
    }

    #[test]
    fn test_version_below_minimum_rejected() {
        let market = MarketConfig {
            protocol_version: 0,
            min_supported_version: MIN_SUPPORTED_VERSION,
            ..MarketConfig::default()
        };
        assert!(check_version_compatible(&market).is_err());
    }
}
