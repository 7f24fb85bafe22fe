// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-point amount handling.
//!
//! Ledger amounts and the configured price are decimal strings. They are
//! converted to integer base units so that `floor(amount / price)` is exact.

use alloy::primitives::U256;

/// Amount parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("invalid amount format: {0}")]
    InvalidFormat(String),

    #[error("too many decimal places (max {0})")]
    TooPrecise(u8),

    #[error("amount overflow")]
    Overflow,
}

/// Parse a human-readable amount to base units.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals of the ledger token (18 for CTN)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    let (whole_str, dec_str) = match amount.split_once('.') {
        Some((whole, dec)) => (whole, Some(dec)),
        None => (amount, None),
    };

    if whole_str.is_empty() && dec_str.map_or(true, str::is_empty) {
        return Err(AmountError::InvalidFormat(amount.to_string()));
    }

    let whole = if whole_str.is_empty() {
        0u128
    } else {
        parse_digits(whole_str, amount)?
    };

    let decimal_part = match dec_str {
        Some(dec) if !dec.is_empty() => {
            if dec.len() > decimals as usize {
                return Err(AmountError::TooPrecise(decimals));
            }
            let padded = format!("{:0<width$}", dec, width = decimals as usize);
            parse_digits(&padded, amount)?
        }
        _ => 0u128,
    };

    let multiplier = 10u128
        .checked_pow(decimals as u32)
        .ok_or(AmountError::Overflow)?;
    let total = whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or(AmountError::Overflow)?;

    Ok(U256::from(total))
}

fn parse_digits(digits: &str, original: &str) -> Result<u128, AmountError> {
    // u128::from_str accepts a leading '+', ledger amounts never carry a sign.
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::InvalidFormat(original.to_string()));
    }
    digits.parse::<u128>().map_err(|_| AmountError::Overflow)
}

/// Render base units as a decimal amount, without trailing fractional zeros.
pub fn format_amount(units: U256, decimals: u8) -> String {
    let scale = usize::from(decimals);
    let digits = format!("{:0>width$}", units.to_string(), width = scale + 1);
    let (whole, fraction) = digits.split_at(digits.len() - scale);

    match fraction.trim_end_matches('0') {
        "" => whole.to_string(),
        fraction => format!("{whole}.{fraction}"),
    }
}
