//! Unit Conversion Utilities
//!
//! Fixed-point amounts and the lstBTC exchange rate.
//!
//! All token amounts (underlying and liquid) are `u64` base units with 8
//! decimals, the same precision as wBTC. The exchange rate is a `u128`
//! scaled by `1e18`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::math::{mul_div, to_u64, Rounding};
use crate::engine::VaultError;

/// Decimal places of every token amount
pub const DECIMALS: usize = 8;

/// Base units per whole token
pub const UNITS_PER_TOKEN: u64 = 100_000_000;

/// Fixed-point scale of [`ExchangeRate`]
pub const RATE_SCALE: u128 = 1_000_000_000_000_000_000;

const RATE_DECIMALS: usize = 18;

/// Basis points denominator
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Convert base units to a token string (e.g., "1.02000000")
pub fn format_units(units: u64) -> String {
    format!(
        "{}.{:08}",
        units / UNITS_PER_TOKEN,
        units % UNITS_PER_TOKEN
    )
}

/// Parse a decimal token string into base units.
///
/// Accepts `_` separators and at most 8 fractional digits.
pub fn parse_units(s: &str) -> Option<u64> {
    let (whole, frac) = split_decimal(s, DECIMALS)?;
    let frac = format!("{:0<width$}", frac, width = DECIMALS);

    whole
        .checked_mul(UNITS_PER_TOKEN)?
        .checked_add(frac.parse::<u64>().ok()?)
}

/// Split "12.345" into (12, "345"), rejecting anything that is not plain decimal.
fn split_decimal(s: &str, max_frac: usize) -> Option<(u64, String)> {
    let cleaned = s.trim().replace('_', "");
    let (whole, frac) = match cleaned.split_once('.') {
        Some((w, f)) => (w.to_string(), f.to_string()),
        None => (cleaned.clone(), String::new()),
    };

    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > max_frac {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    Some((whole, frac))
}

/// Underlying-asset units per liquid-staked unit, scaled by [`RATE_SCALE`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeRate(u128);

impl ExchangeRate {
    /// Genesis rate: one underlying unit per liquid unit
    pub const ONE: ExchangeRate = ExchangeRate(RATE_SCALE);

    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u128 {
        self.0
    }

    /// Rate of `underlying / supply`, floored.
    pub fn from_ratio(underlying: u64, supply: u64) -> Result<Self, VaultError> {
        let raw = mul_div(underlying as u128, RATE_SCALE, supply as u128, Rounding::Floor)?;
        Ok(Self(raw))
    }

    /// Underlying units represented by `liquid` liquid units.
    pub fn to_underlying(&self, liquid: u64, rounding: Rounding) -> Result<u64, VaultError> {
        to_u64(mul_div(liquid as u128, self.0, RATE_SCALE, rounding)?)
    }

    /// Liquid units minted for `underlying` underlying units.
    pub fn to_liquid(&self, underlying: u64, rounding: Rounding) -> Result<u64, VaultError> {
        to_u64(mul_div(underlying as u128, RATE_SCALE, self.0, rounding)?)
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / RATE_SCALE;
        let frac = format!("{:018}", self.0 % RATE_SCALE);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            write!(f, "{}.0", whole)
        } else {
            write!(f, "{}.{}", whole, frac)
        }
    }
}

impl fmt::Debug for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExchangeRate({})", self)
    }
}

impl FromStr for ExchangeRate {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (whole, frac) = split_decimal(s, RATE_DECIMALS)
            .ok_or_else(|| VaultError::InvalidAmount(format!("bad rate: {}", s)))?;
        let frac = format!("{:0<width$}", frac, width = RATE_DECIMALS);
        let frac: u128 = frac
            .parse()
            .map_err(|_| VaultError::InvalidAmount(format!("bad rate: {}", s)))?;

        let raw = (whole as u128)
            .checked_mul(RATE_SCALE)
            .and_then(|w| w.checked_add(frac))
            .ok_or(VaultError::MathOverflow)?;

        if raw == 0 {
            return Err(VaultError::InvalidAmount("rate must be positive".to_string()));
        }

        Ok(Self(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(0), "0.00000000");
        assert_eq!(format_units(1), "0.00000001");
        assert_eq!(format_units(102_000_000), "1.02000000");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1"), Some(100_000_000));
        assert_eq!(parse_units("1.02"), Some(102_000_000));
        assert_eq!(parse_units(".5"), Some(50_000_000));
        assert_eq!(parse_units("0.00000001"), Some(1));
        assert_eq!(parse_units("1_000"), Some(100_000_000_000));
        assert_eq!(parse_units("0.000000001"), None);
        assert_eq!(parse_units("-1"), None);
        assert_eq!(parse_units("abc"), None);
        assert_eq!(parse_units(""), None);
    }

    #[test]
    fn test_rate_display_and_parse() {
        assert_eq!(ExchangeRate::ONE.to_string(), "1.0");
        let rate: ExchangeRate = "1.02".parse().unwrap();
        assert_eq!(rate.to_string(), "1.02");
        assert_eq!(rate.raw(), 1_020_000_000_000_000_000);
        assert!("0".parse::<ExchangeRate>().is_err());
    }

    #[test]
    fn test_rate_conversions() {
        let rate = ExchangeRate::from_ratio(102_000_000, 100_000_000).unwrap();
        assert_eq!(rate, "1.02".parse().unwrap());

        assert_eq!(rate.to_underlying(100_000_000, Rounding::Floor).unwrap(), 102_000_000);
        assert_eq!(rate.to_liquid(102_000_000, Rounding::Floor).unwrap(), 100_000_000);

        // 1 unit at 1.02 is worth less than 2 units, floor keeps dust in the vault
        assert_eq!(rate.to_underlying(1, Rounding::Floor).unwrap(), 1);
        assert_eq!(rate.to_liquid(1, Rounding::Floor).unwrap(), 0);
    }

    #[test]
    fn test_rate_from_empty_supply() {
        assert!(matches!(
            ExchangeRate::from_ratio(10, 0),
            Err(VaultError::DivisionByZero)
        ));
    }
}
