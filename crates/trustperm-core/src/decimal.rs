//! Fixed-point decimal arithmetic for fee and deposit math.
//!
//! [`Dec`] is an unsigned decimal with 18 fractional digits, stored as an
//! integer count of 10^-18 units. Every fee split in the engine is computed
//! with it, so the rounding rules are part of the ledger's observable
//! behavior:
//!
//! - Multiplication rounds half-to-even at the 18th decimal place.
//! - Conversion to an integer amount ([`Dec::truncate`]) always truncates.
//! - Addition and subtraction are exact and fail instead of wrapping.
//!
//! Amounts reach up to `u64::MAX` whole units and rates are small, so the
//! product of two values can exceed 128 bits before rescaling. [`Dec::checked_mul`]
//! splits both operands into integer and fractional halves so no
//! intermediate product overflows unless the final result does.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DecimalError;

/// Number of fractional digits.
pub const PRECISION: u32 = 18;

/// 10^PRECISION.
const SCALE: u128 = 1_000_000_000_000_000_000;

/// Basis points per unit (10000 bps = 1.0).
const BPS_PER_UNIT: u128 = 10_000;

/// An unsigned 18-decimal fixed-point number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Dec(u128);

impl Dec {
    pub const ZERO: Dec = Dec(0);
    pub const ONE: Dec = Dec(SCALE);

    /// Construct from raw 10^-18 units.
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw 10^-18 units.
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// An integer amount as a decimal. Never overflows.
    pub const fn from_int(value: u64) -> Self {
        Self(value as u128 * SCALE)
    }

    /// A basis-point value as a fraction of one (`2500` becomes `0.25`).
    pub fn from_bps(bps: u64) -> Self {
        Self(bps as u128 * (SCALE / BPS_PER_UNIT))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Dec) -> Result<Dec, DecimalError> {
        self.0
            .checked_add(other.0)
            .map(Dec)
            .ok_or(DecimalError::Overflow)
    }

    pub fn checked_sub(self, other: Dec) -> Result<Dec, DecimalError> {
        self.0
            .checked_sub(other.0)
            .map(Dec)
            .ok_or(DecimalError::Negative)
    }

    /// Multiply, rounding half-to-even at the last decimal place.
    pub fn checked_mul(self, other: Dec) -> Result<Dec, DecimalError> {
        let (ah, al) = (self.0 / SCALE, self.0 % SCALE);
        let (bh, bl) = (other.0 / SCALE, other.0 % SCALE);

        // (ah*S + al) * (bh*S + bl) / S
        //   = ah*bh*S + ah*bl + al*bh + al*bl/S
        let frac_product = al * bl;
        let quotient = frac_product / SCALE;
        let remainder = frac_product % SCALE;

        let whole = ah
            .checked_mul(bh)
            .and_then(|v| v.checked_mul(SCALE))
            .ok_or(DecimalError::Overflow)?;
        let cross = ah
            .checked_mul(bl)
            .and_then(|v| al.checked_mul(bh).and_then(|w| v.checked_add(w)))
            .ok_or(DecimalError::Overflow)?;

        let truncated = whole
            .checked_add(cross)
            .and_then(|v| v.checked_add(quotient))
            .ok_or(DecimalError::Overflow)?;

        let half = SCALE / 2;
        let round_up = remainder > half || (remainder == half && truncated % 2 == 1);
        if round_up {
            truncated
                .checked_add(1)
                .map(Dec)
                .ok_or(DecimalError::Overflow)
        } else {
            Ok(Dec(truncated))
        }
    }

    /// Integer part, truncating toward zero.
    pub fn truncate(self) -> Result<u64, DecimalError> {
        u64::try_from(self.0 / SCALE).map_err(|_| DecimalError::Overflow)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / SCALE,
            self.0 % SCALE,
            width = PRECISION as usize
        )
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({})", self)
    }
}

impl FromStr for Dec {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };

        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecimalError::Parse(s.to_string()));
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecimalError::Parse(s.to_string()));
        }
        if frac_part.len() > PRECISION as usize {
            return Err(DecimalError::Parse(format!(
                "{}: more than {} decimal places",
                s, PRECISION
            )));
        }

        let int_value: u128 = int_part
            .parse()
            .map_err(|_| DecimalError::Parse(s.to_string()))?;

        let mut frac_value: u128 = 0;
        for (i, digit) in frac_part.bytes().enumerate() {
            let place = 10u128.pow(PRECISION - 1 - i as u32);
            frac_value += (digit - b'0') as u128 * place;
        }

        int_value
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac_value))
            .map(Dec)
            .ok_or(DecimalError::Overflow)
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
