//! Country code type.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing a [`CountryCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CountryCodeError {
    /// The input is not exactly two characters long.
    #[error("country code must be exactly 2 letters (got {0})")]
    InvalidLength(usize),
    /// The input contains something other than ASCII letters.
    #[error("country code must contain only ASCII letters")]
    InvalidCharacter,
}

/// An ISO 3166-1 alpha-2 country code such as `DE`.
///
/// Input is normalized to upper case, so `"de"` and `"DE"` parse to the same
/// value.
///
/// ## Examples
///
/// ```
/// use boba_core::CountryCode;
///
/// assert_eq!(CountryCode::parse("de").unwrap().as_str(), "DE");
/// assert!(CountryCode::parse("DEU").is_err());
/// assert!(CountryCode::parse("D1").is_err());
/// ```
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(into = "String")]
pub struct CountryCode([u8; 2]);

impl CountryCode {
    /// Parse a `CountryCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly two ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CountryCodeError> {
        let bytes = s.trim().as_bytes();
        let [first, second] = bytes else {
            return Err(CountryCodeError::InvalidLength(s.trim().chars().count()));
        };

        if !first.is_ascii_alphabetic() || !second.is_ascii_alphabetic() {
            return Err(CountryCodeError::InvalidCharacter);
        }

        Ok(Self([
            first.to_ascii_uppercase(),
            second.to_ascii_uppercase(),
        ]))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Both bytes are ASCII letters by construction.
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CountryCode {
    type Err = CountryCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.as_str().to_owned()
    }
}

impl<'de> Deserialize<'de> for CountryCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
