//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("phone number must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character that cannot appear in a phone number.
    #[error("phone number contains an invalid character '{0}'")]
    InvalidCharacter(char),
    /// The input has no digits at all.
    #[error("phone number must contain at least one digit")]
    NoDigits,
}

/// A loosely validated phone number.
///
/// Digits, `-`, `+`, `(`, `)` and spaces are accepted; formatting is kept
/// as entered.
///
/// ```
/// use tradedesk_core::PhoneNumber;
///
/// assert!(PhoneNumber::parse("03-1234-5678").is_ok());
/// assert!(PhoneNumber::parse("+81 (3) 1234 5678").is_ok());
/// assert!(PhoneNumber::parse("call me").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Maximum length of a phone number.
    pub const MAX_LENGTH: usize = 20;

    /// Parse a `PhoneNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, too long, contains
    /// characters outside the allowed set, or has no digits.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(PhoneNumberError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '(' | ')' | ' ')))
        {
            return Err(PhoneNumberError::InvalidCharacter(bad));
        }

        if !s.chars().any(|c| c.is_ascii_digit()) {
            return Err(PhoneNumberError::NoDigits);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns only the digits, useful for matching regardless of formatting.
    #[must_use]
    pub fn digits(&self) -> String {
        self.0.chars().filter(char::is_ascii_digit).collect()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
