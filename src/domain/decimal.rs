//! Lossless decimal type backed by rust_decimal.
//!
//! Ledger arithmetic runs on scaled integers. This type exists for the two
//! edges where a human-readable number is involved: parsing configured rates
//! such as `"0.0001"` into an integer mantissa and scale, and rendering a
//! scaled integer as a display string once a computation is finished.

use rust_decimal::Decimal as RustDecimal;
use std::fmt;
use std::str::FromStr;

/// Lossless decimal numeric type for display and configuration parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal(RustDecimal);

impl Decimal {
    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Build a Decimal from an integer scaled by `10^scale`.
    ///
    /// # Errors
    /// Returns an error if the value exceeds the 96-bit mantissa or the scale
    /// exceeds 28.
    pub fn from_scaled(value: u128, scale: u32) -> Result<Self, rust_decimal::Error> {
        let signed = i128::try_from(value).map_err(|_| rust_decimal::Error::ExceedsMaximumPossibleValue)?;
        RustDecimal::try_from_i128_with_scale(signed, scale).map(Decimal)
    }

    /// Split into an unsigned integer mantissa and its power-of-ten scale.
    ///
    /// Returns `None` for negative values.
    pub fn to_scaled(&self) -> Option<(u128, u32)> {
        let normalized = self.0.normalize();
        if normalized.is_sign_negative() && !normalized.is_zero() {
            return None;
        }
        let mantissa = u128::try_from(normalized.mantissa()).ok()?;
        Some((mantissa, normalized.scale()))
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }
}

/// Render a scaled integer as a human-readable decimal string.
///
/// Values that fit rust_decimal go through it; larger ones (u128 amounts with
/// 18-decimal precision can exceed 96 bits) are formatted digit-wise.
pub fn format_scaled(value: u128, scale: u32) -> String {
    if let Ok(d) = Decimal::from_scaled(value, scale) {
        return d.to_canonical_string();
    }

    let digits = value.to_string();
    let scale = scale as usize;
    if scale == 0 {
        return digits;
    }
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}
