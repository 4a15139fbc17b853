//! Fixed-point numerics for exchange rates and share accounting
//!
//! Token amounts (assets and shares) are `u128` base units. Exchange rates
//! are [`Ray`]s: unsigned 27-decimal fixed point values backed by a 256-bit
//! integer so that `amount * rate` never loses precision.
//!
//! Every division takes an explicit [`Rounding`]; nothing in this module
//! rounds implicitly.

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uint::construct_uint;

use crate::errors::MathError;

construct_uint! {
    /// 256-bit unsigned integer used for intermediate products.
    pub struct U256(4);
}

/// Number of decimals in a RAY.
pub const RAY_DECIMALS: u8 = 27;

/// Highest raw oracle precision accepted by [`Ray::from_scaled`].
pub const MAX_RATE_DECIMALS: u8 = 36;

/// Basis-point denominator (100%).
pub const MAX_BPS: u16 = 10_000;

/// Rounding direction for a division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    /// Toward zero
    Floor,
    /// Away from zero
    Ceil,
}

/// `a * b / denominator` in 256-bit precision, narrowed back to `u128`.
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> Result<u128, MathError> {
    let wide = mul_div_wide(
        U256::from(a),
        U256::from(b),
        U256::from(denominator),
        rounding,
        "mul_div",
    )?;
    narrow(wide, "mul_div")
}

/// `amount * bps / MAX_BPS`.
pub fn apply_bps(amount: u128, bps: u16, rounding: Rounding) -> Result<u128, MathError> {
    mul_div(amount, u128::from(bps), u128::from(MAX_BPS), rounding)
}

fn mul_div_wide(
    a: U256,
    b: U256,
    denominator: U256,
    rounding: Rounding,
    context: &'static str,
) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero { context });
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow { context })?;
    let quotient = product / denominator;
    match rounding {
        Rounding::Floor => Ok(quotient),
        Rounding::Ceil => {
            if (product % denominator).is_zero() {
                Ok(quotient)
            } else {
                quotient
                    .checked_add(U256::one())
                    .ok_or(MathError::Overflow { context })
            }
        }
    }
}

fn narrow(value: U256, context: &'static str) -> Result<u128, MathError> {
    if value > U256::from(u128::MAX) {
        return Err(MathError::Overflow { context });
    }
    Ok(value.low_u128())
}

fn pow10(exp: u8) -> U256 {
    U256::exp10(usize::from(exp))
}

/// Exchange rate in 27-decimal fixed point.
///
/// `Ray::one()` means one asset unit is worth exactly one value unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ray(U256);

impl Ray {
    /// 1.0
    pub fn one() -> Self {
        Self(pow10(RAY_DECIMALS))
    }

    /// 0.0
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// Wrap an already-normalized 27-decimal value.
    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Inner 27-decimal integer.
    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Rescale an oracle rate carrying `decimals` decimals to RAY.
    ///
    /// Lower precision is multiplied up exactly; higher precision is divided
    /// down, truncating digits beyond the 27th.
    pub fn from_scaled(rate: U256, decimals: u8) -> Result<Self, MathError> {
        if decimals > MAX_RATE_DECIMALS {
            return Err(MathError::UnsupportedPrecision {
                decimals,
                max: MAX_RATE_DECIMALS,
            });
        }
        let raw = if decimals <= RAY_DECIMALS {
            rate.checked_mul(pow10(RAY_DECIMALS - decimals))
                .ok_or(MathError::Overflow { context: "rate normalization" })?
        } else {
            rate / pow10(decimals - RAY_DECIMALS)
        };
        Ok(Self(raw))
    }

    /// `numerator / denominator` as a RAY, rounded down.
    pub fn from_ratio(numerator: u128, denominator: u128) -> Result<Self, MathError> {
        let raw = mul_div_wide(
            U256::from(numerator),
            pow10(RAY_DECIMALS),
            U256::from(denominator),
            Rounding::Floor,
            "ray ratio",
        )?;
        Ok(Self(raw))
    }

    /// Value units of `assets` at this rate: `assets * rate / RAY`.
    pub fn value_of(&self, assets: u128, rounding: Rounding) -> Result<u128, MathError> {
        let wide = mul_div_wide(U256::from(assets), self.0, pow10(RAY_DECIMALS), rounding, "value_of")?;
        narrow(wide, "value_of")
    }

    /// Asset units worth `value` at this rate: `value * RAY / rate`.
    pub fn assets_for(&self, value: u128, rounding: Rounding) -> Result<u128, MathError> {
        let wide = mul_div_wide(U256::from(value), pow10(RAY_DECIMALS), self.0, rounding, "assets_for")?;
        narrow(wide, "assets_for")
    }

    /// Human-readable projection with 18 significant decimals.
    ///
    /// Returns `None` when the rate does not fit a `Decimal`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let truncated = self.0 / pow10(RAY_DECIMALS - 18);
        if truncated > U256::from(i128::MAX as u128) {
            return None;
        }
        Decimal::try_from_i128_with_scale(truncated.low_u128() as i128, 18)
            .ok()
            .map(|d| d.normalize())
    }
}

impl fmt::Display for Ray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "{}", d),
            None => write!(f, "{}e-27", self.0),
        }
    }
}

// Serialized as the raw 27-decimal integer string; JSON numbers cannot hold it.
impl Serialize for Ray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Ray {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_dec_str(&s)
            .map(Self)
            .map_err(|e| de::Error::custom(format!("invalid ray {s:?}: {e:?}")))
    }
}
