use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, Result};

/// A phone number compared by numeric value.
///
/// Service numbers are short codes (`950`), while the modem may report a
/// sender with a leading `+` or leading zeros. Both forms compare equal when
/// their digits denote the same number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PhoneNumber(u64);

impl PhoneNumber {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for PhoneNumber {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::Number { text: s.to_owned() });
        }
        digits
            .parse()
            .map(Self)
            .map_err(|_| ParseError::Number { text: s.to_owned() })
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_comparison_ignores_formatting() {
        let short: PhoneNumber = "950".parse().unwrap();
        assert_eq!(short, "0950".parse::<PhoneNumber>().unwrap());
        assert_eq!(short, "+950".parse::<PhoneNumber>().unwrap());
        assert_ne!(short, "12345".parse::<PhoneNumber>().unwrap());
    }

    #[test]
    fn rejects_non_numeric() {
        for text in ["", "+", "95O", "950 1", "Orange"] {
            assert!(text.parse::<PhoneNumber>().is_err(), "{text:?} should not parse");
        }
    }

    #[test]
    fn displays_digits() {
        assert_eq!(PhoneNumber::new(950).to_string(), "950");
    }
}
