use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A quantity of leave, in steps of half a day.
/// Stored as an integer count of half-days, so 2.5 days = 5 half-days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Days(i64);

impl Days {
    pub const ZERO: Days = Days(0);

    pub const fn from_half_days(half_days: i64) -> Self {
        Days(half_days)
    }

    pub const fn whole(days: i64) -> Self {
        Days(days * 2)
    }

    pub const fn half_days(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Convert from a floating-point day count. Only exact multiples of 0.5 are accepted.
    pub fn from_f64(value: f64) -> Option<Self> {
        let doubled = value * 2.0;
        if !doubled.is_finite() || doubled.fract() != 0.0 {
            return None;
        }
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
        if doubled < i64::MIN as f64 || doubled >= i64::MAX as f64 {
            return None;
        }
        Some(Days(doubled as i64))
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 2.0
    }

    /// Number of calendar days covered by an inclusive date range.
    /// Returns `None` when `end` is before `start`.
    /// Example: 2024-01-01..=2024-01-03 -> 3 days
    pub fn between_inclusive(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if end < start {
            return None;
        }
        let span = (end - start).num_days();
        Some(Days::whole(span + 1))
    }
}

/// Example: 5 half-days -> "2.5", 20 half-days -> "10.0"
impl fmt::Display for Days {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let tenths = if abs % 2 == 0 { 0 } else { 5 };
        write!(f, "{}{}.{}", sign, abs / 2, tenths)
    }
}

/// Parse a day count such as "3", "2.5", ".5" or "10.0".
impl std::str::FromStr for Days {
    type Err = ParseDaysError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (negative, input) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let parts: Vec<&str> = input.split('.').collect();
        let (whole, fraction) = match parts.as_slice() {
            [whole] => (*whole, ""),
            [whole, fraction] => (*whole, *fraction),
            _ => return Err(ParseDaysError::InvalidFormat),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(ParseDaysError::InvalidFormat);
        }

        if !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseDaysError::InvalidFormat);
        }
        let units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ParseDaysError::InvalidFormat)?
        };

        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseDaysError::InvalidFormat);
        }
        let trimmed = fraction.trim_end_matches('0');
        let half = match trimmed {
            "" => 0,
            "5" => 1,
            _ => return Err(ParseDaysError::NotHalfDay),
        };

        let half_days = units
            .checked_mul(2)
            .and_then(|h| h.checked_add(half))
            .ok_or(ParseDaysError::InvalidFormat)?;
        Ok(Days(if negative { -half_days } else { half_days }))
    }
}

impl Serialize for Days {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Days {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Days::from_f64(value).ok_or_else(|| {
            serde::de::Error::custom(format!("{} is not a multiple of half a day", value))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseDaysError {
    InvalidFormat,
    NotHalfDay,
}

impl fmt::Display for ParseDaysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseDaysError::InvalidFormat => write!(f, "invalid day count format"),
            ParseDaysError::NotHalfDay => write!(f, "day counts must be multiples of 0.5"),
        }
    }
}

impl std::error::Error for ParseDaysError {}
