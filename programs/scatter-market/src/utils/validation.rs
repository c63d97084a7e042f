//! Input validation utilities for the Scatter storage marketplace

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::instructions::constants::MAX_ENV_STR_LEN;

/// Validates that a string contains only printable ASCII characters (including space).
///
/// # Examples
/// ```
/// use scatter_market::utils::validation::validate_string_input;
///
/// assert!(validate_string_input("ipfs gateway"));
/// assert!(!validate_string_input("hello\x00world")); // null byte
/// assert!(!validate_string_input("hello\nworld"));   // newline
/// ```
pub fn validate_string_input(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_graphic() || c == ' ')
}

/// Validates a string config value before it is stored.
pub fn validate_env_string(value: &str) -> Result<()> {
    require!(value.len() <= MAX_ENV_STR_LEN, MarketError::StringTooLong);
    require!(validate_string_input(value), MarketError::InvalidString);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_values() {
        assert!(validate_string_input("oneTwo three"));
        assert!(validate_string_input("https://gateway.example/ipfs/"));
        assert!(validate_string_input(""));
    }

    #[test]
    fn test_control_characters_rejected() {
        assert!(!validate_string_input("tab\there"));
        assert!(!validate_string_input("bell\x07"));
        assert!(!validate_string_input("del\x7f"));
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert!(!validate_string_input("caf\u{e9}"));
    }

    #[test]
    fn test_env_string_length_bound() {
        assert!(validate_env_string(&"a".repeat(MAX_ENV_STR_LEN)).is_ok());
        assert!(validate_env_string(&"a".repeat(MAX_ENV_STR_LEN + 1)).is_err());
    }

    #[test]
    fn test_env_string_rejects_newline() {
        assert!(validate_env_string("line\nbreak").is_err());
    }
}
