//! Checked fixed-point arithmetic for vault accounting.

use super::error::VaultError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rounding {
    Floor,
    Ceiling,
}

/// Safe multiplication then division with configurable rounding.
///
/// Computes `(value × numerator) / denominator` in u128. Every conversion
/// that pays out of the vault uses `Floor` so rounding dust stays in the vault.
pub fn mul_div(
    value: u128,
    numerator: u128,
    denominator: u128,
    rounding: Rounding,
) -> Result<u128, VaultError> {
    if denominator == 0 {
        return Err(VaultError::DivisionByZero);
    }

    let product = value
        .checked_mul(numerator)
        .ok_or(VaultError::MathOverflow)?;

    let result = match rounding {
        Rounding::Floor => product / denominator,
        Rounding::Ceiling => product
            .checked_add(denominator - 1)
            .ok_or(VaultError::MathOverflow)?
            / denominator,
    };

    Ok(result)
}

/// Narrow a u128 intermediate back to a base-unit amount.
pub fn to_u64(value: u128) -> Result<u64, VaultError> {
    u64::try_from(value).map_err(|_| VaultError::MathOverflow)
}

/// `amount × bps / 10_000`, floored.
pub fn bps_of(amount: u64, bps: u16) -> Result<u64, VaultError> {
    let fee = mul_div(
        amount as u128,
        bps as u128,
        crate::types::units::BPS_DENOMINATOR as u128,
        Rounding::Floor,
    )?;
    to_u64(fee)
}
