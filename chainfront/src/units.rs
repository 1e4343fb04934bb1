//! Decimal-string amount handling.
//!
//! Balances are kept as [`U256`] base units internally; every public surface
//! speaks decimal strings in the asset's precision. Formatting trims
//! trailing zeros, so a whole-token figure round-trips without a dot
//! (`"1000"`, not `"1000.000000000000000000"`).

use alloy::primitives::U256;

use crate::error::{Result, WalletError};

/// Parse a positive decimal string into base units.
///
/// Rejects empty, signed, non-numeric and zero inputs, and fractions with
/// more digits than `decimals`, with [`WalletError::InvalidInput`].
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256> {
    let input = input.trim();
    if input.is_empty() {
        return Err(WalletError::invalid_input("amount is empty"));
    }

    let (int_part, frac_part) = input.split_once('.').unwrap_or((input, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(WalletError::invalid_input(format!("malformed amount '{input}'")));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(WalletError::invalid_input(format!("malformed amount '{input}'")));
    }
    if frac_part.len() > decimals as usize {
        return Err(WalletError::invalid_input(format!(
            "amount '{input}' has more than {decimals} decimal places"
        )));
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    for _ in frac_part.len()..decimals as usize {
        digits.push('0');
    }

    let value = U256::from_str_radix(&digits, 10)
        .map_err(|_| WalletError::invalid_input(format!("amount '{input}' is out of range")))?;
    if value.is_zero() {
        return Err(WalletError::invalid_input("amount must be positive"));
    }
    Ok(value)
}

/// Render base units as a decimal string, trimming trailing zeros.
#[must_use]
pub fn format_amount(value: U256, decimals: u8) -> String {
    let raw = value.to_string();
    if decimals == 0 {
        return raw;
    }

    let width = decimals as usize + 1;
    let padded = if raw.len() < width {
        format!("{raw:0>width$}")
    } else {
        raw
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals as usize);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}
