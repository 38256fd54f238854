//! Customer code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CustomerCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CustomerCodeError {
    /// The input string is empty.
    #[error("customer ID is required")]
    Empty,
    /// The input string is too long.
    #[error("customer ID must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside the allowed set.
    #[error("customer ID contains an invalid character '{0}'")]
    InvalidCharacter(char),
}

/// The user-facing customer identifier (the "customer ID" CSV column).
///
/// Unique within a store. Surrounding whitespace is trimmed before validation.
///
/// ## Constraints
///
/// - Length: 1-20 characters
/// - ASCII letters, digits, `-` and `_` only
///
/// ## Examples
///
/// ```
/// use tradedesk_core::CustomerCode;
///
/// assert!(CustomerCode::parse("C-0001").is_ok());
/// assert!(CustomerCode::parse(" K_12 ").is_ok());
///
/// assert!(CustomerCode::parse("").is_err());
/// assert!(CustomerCode::parse("顧客1").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CustomerCode(String);

impl CustomerCode {
    /// Maximum length of a customer code.
    pub const MAX_LENGTH: usize = 20;

    /// Parse a `CustomerCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains characters other than ASCII
    /// alphanumerics, `-` and `_`.
    pub fn parse(s: &str) -> Result<Self, CustomerCodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CustomerCodeError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(CustomerCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(CustomerCodeError::InvalidCharacter(bad));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the code and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CustomerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CustomerCode {
    type Err = CustomerCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CustomerCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CustomerCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CustomerCode {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CustomerCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_codes() {
        assert!(CustomerCode::parse("1").is_ok());
        assert!(CustomerCode::parse("C-0001").is_ok());
        assert!(CustomerCode::parse("abc_DEF-123").is_ok());
        assert!(CustomerCode::parse(&"9".repeat(20)).is_ok());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let code = CustomerCode::parse("  C-1 ").unwrap();
        assert_eq!(code.as_str(), "C-1");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(CustomerCode::parse(""), Err(CustomerCodeError::Empty));
        assert_eq!(CustomerCode::parse("   "), Err(CustomerCodeError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        assert!(matches!(
            CustomerCode::parse(&"9".repeat(21)),
            Err(CustomerCodeError::TooLong { max: 20 })
        ));
    }

    #[test]
    fn test_parse_invalid_character() {
        assert_eq!(
            CustomerCode::parse("C 1"),
            Err(CustomerCodeError::InvalidCharacter(' '))
        );
        assert_eq!(
            CustomerCode::parse("顧客"),
            Err(CustomerCodeError::InvalidCharacter('顧'))
        );
    }

    #[test]
    fn test_display_and_from_str() {
        let code: CustomerCode = "K-9".parse().unwrap();
        assert_eq!(code.to_string(), "K-9");
    }
}
