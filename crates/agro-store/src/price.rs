//! Fixed-point money: at most 10 digits, exactly 2 decimal places, never negative.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

const MAX_DIGITS: usize = 10;
const DECIMAL_PLACES: usize = 2;

/// A non-negative price stored as whole cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

/// Why a price string was rejected. The display text is user facing.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    /// Not a decimal number.
    #[error("A valid number is required.")]
    Invalid,
    /// Below zero.
    #[error("Ensure this value is greater than or equal to 0.")]
    Negative,
    /// More than ten significant digits.
    #[error("Ensure that there are no more than 10 digits in total.")]
    TooManyDigits,
    /// More than two digits after the point.
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimals,
    /// More than eight digits before the point.
    #[error("Ensure that there are no more than 8 digits before the decimal point.")]
    TooManyWholeDigits,
}

impl Price {
    /// Build from a cent amount.
    pub fn from_cents(cents: i64) -> Option<Self> {
        (cents >= 0).then_some(Self(cents))
    }

    /// Whole cents.
    pub fn cents(self) -> i64 {
        self.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (negative, unsigned) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };

        let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(PriceError::Invalid);
        }

        let whole = whole.trim_start_matches('0');
        let is_zero = whole.is_empty() && frac.bytes().all(|b| b == b'0');
        if negative && !is_zero {
            return Err(PriceError::Negative);
        }

        if whole.len() + frac.len() > MAX_DIGITS {
            return Err(PriceError::TooManyDigits);
        }
        if frac.len() > DECIMAL_PLACES {
            return Err(PriceError::TooManyDecimals);
        }
        if whole.len() > MAX_DIGITS - DECIMAL_PLACES {
            return Err(PriceError::TooManyWholeDigits);
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| PriceError::Invalid)?
        };
        let mut frac_value: i64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| PriceError::Invalid)?
        };
        if frac.len() == 1 {
            frac_value *= 10;
        }

        Ok(Self(whole_value * 100 + frac_value))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
