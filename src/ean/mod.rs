//! EAN codes identify a utility connection point: exactly 18 digits.
//! Codes starting with `87` belong to Dutch grid operators and can be looked up.

pub mod lookup;

pub use lookup::{DisabledLookup, EanDetails, EanLookup, EanLookupError, HttpEanLookup};

use serde::Serialize;
use thiserror::Error;

pub const EAN_LENGTH: usize = 18;
pub const DUTCH_PREFIX: &str = "87";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EanError {
    #[error("EAN code is required")]
    Empty,

    #[error("EAN code must be exactly 18 digits (got {0})")]
    WrongLength(usize),

    #[error("EAN code may only contain digits")]
    NotNumeric,
}

/// Validate and normalize (trim) an EAN code
pub fn validate_ean(input: &str) -> Result<&str, EanError> {
    let code = input.trim();
    if code.is_empty() {
        return Err(EanError::Empty);
    }
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(EanError::NotNumeric);
    }
    if code.len() != EAN_LENGTH {
        return Err(EanError::WrongLength(code.len()));
    }
    Ok(code)
}

/// True exactly when the code is valid and carries the Dutch prefix
pub fn should_auto_lookup(input: &str) -> bool {
    validate_ean(input).is_ok_and(|code| code.starts_with(DUTCH_PREFIX))
}

/// Result body of the validation endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EanCheck {
    pub ean: String,
    pub valid: bool,
    pub auto_lookup: bool,
    pub message: Option<String>,
}

impl EanCheck {
    pub fn of(input: &str) -> Self {
        match validate_ean(input) {
            Ok(code) => EanCheck {
                ean: code.to_string(),
                valid: true,
                auto_lookup: code.starts_with(DUTCH_PREFIX),
                message: None,
            },
            Err(err) => EanCheck {
                ean: input.trim().to_string(),
                valid: false,
                auto_lookup: false,
                message: Some(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_eighteen_digits() {
        assert_eq!(validate_ean("871685900012345678"), Ok("871685900012345678"));
        assert_eq!(validate_ean("  541234567890123456 "), Ok("541234567890123456"));
    }

    #[test]
    fn rejects_wrong_length_with_count() {
        assert_eq!(validate_ean("87168590001234567"), Err(EanError::WrongLength(17)));
        assert_eq!(validate_ean("8716859000123456789"), Err(EanError::WrongLength(19)));
        assert_eq!(
            EanError::WrongLength(17).to_string(),
            "EAN code must be exactly 18 digits (got 17)"
        );
    }

    #[test]
    fn rejects_non_numeric_and_empty() {
        assert_eq!(validate_ean("87168590001234567A"), Err(EanError::NotNumeric));
        assert_eq!(validate_ean("8716 8590 0012 3456"), Err(EanError::NotNumeric));
        assert_eq!(validate_ean(""), Err(EanError::Empty));
        assert_eq!(validate_ean("   "), Err(EanError::Empty));
    }

    #[test]
    fn auto_lookup_needs_valid_dutch_code() {
        assert!(should_auto_lookup("871685900012345678"));
        assert!(!should_auto_lookup("541234567890123456"));
        assert!(!should_auto_lookup("87168590001234567"));
        assert!(!should_auto_lookup("8716859000123456789"));
        assert!(!should_auto_lookup("87abc"));
    }

    #[test]
    fn check_reports_message_for_invalid_input() {
        let check = EanCheck::of("123");
        assert!(!check.valid);
        assert!(!check.auto_lookup);
        assert_eq!(check.message.as_deref(), Some("EAN code must be exactly 18 digits (got 3)"));

        let check = EanCheck::of("871685900012345678");
        assert!(check.valid && check.auto_lookup && check.message.is_none());
    }
}
