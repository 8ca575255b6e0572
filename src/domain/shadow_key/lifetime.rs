//! Key lifetimes
//!
//! Lifetimes are configured as compact duration strings (`9600h`, `30d`,
//! `1h30m`) and handed to the directory in the largest exact unit it
//! understands.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LifetimeParseError {
    #[error("Lifetime cannot be empty")]
    Empty,

    #[error("Lifetime is missing a number before unit '{0}'")]
    MissingNumber(char),

    #[error("Lifetime is missing a unit after '{0}'")]
    MissingUnit(String),

    #[error("Unknown lifetime unit '{0}', expected one of s, m, h, d")]
    UnknownUnit(char),

    #[error("Lifetime must be greater than zero")]
    Zero,

    #[error("Lifetime is too large")]
    Overflow,
}

/// Positive whole-second duration for issued keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyLifetime(Duration);

impl KeyLifetime {
    /// Default lifetime of long-term keys (400 days)
    pub const LONG_TERM_DEFAULT: KeyLifetime = KeyLifetime(Duration::from_secs(9600 * HOUR));

    pub fn from_secs(secs: u64) -> Result<Self, LifetimeParseError> {
        if secs == 0 {
            return Err(LifetimeParseError::Zero);
        }
        Ok(Self(Duration::from_secs(secs)))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Render for the directory's `duration` field
    pub fn to_directory_string(&self) -> String {
        let secs = self.0.as_secs();

        if secs % DAY == 0 {
            format!("{}d", secs / DAY)
        } else if secs % HOUR == 0 {
            format!("{}h", secs / HOUR)
        } else if secs % MINUTE == 0 {
            format!("{}m", secs / MINUTE)
        } else {
            format!("{}s", secs)
        }
    }
}

impl FromStr for KeyLifetime {
    type Err = LifetimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LifetimeParseError::Empty);
        }

        let mut total: u64 = 0;
        let mut digits = String::new();

        for c in s.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }

            if digits.is_empty() {
                return Err(LifetimeParseError::MissingNumber(c));
            }

            let unit = match c {
                's' => 1,
                'm' => MINUTE,
                'h' => HOUR,
                'd' => DAY,
                other => return Err(LifetimeParseError::UnknownUnit(other)),
            };

            let value: u64 = digits.parse().map_err(|_| LifetimeParseError::Overflow)?;
            total = value
                .checked_mul(unit)
                .and_then(|v| total.checked_add(v))
                .ok_or(LifetimeParseError::Overflow)?;
            digits.clear();
        }

        if !digits.is_empty() {
            return Err(LifetimeParseError::MissingUnit(digits));
        }

        Self::from_secs(total)
    }
}

impl TryFrom<String> for KeyLifetime {
    type Error = LifetimeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyLifetime> for String {
    fn from(lifetime: KeyLifetime) -> Self {
        lifetime.to_directory_string()
    }
}

impl std::fmt::Display for KeyLifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_directory_string())
    }
}
