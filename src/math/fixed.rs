//! Decimal exponential and logarithm
//!
//! Both functions use range reduction followed by a power series that runs
//! until the next term vanishes at `Decimal` precision (28 fractional
//! digits). Every operation is checked; nothing here can panic.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::common::errors::{MathError, MathResult};

/// Euler's number to 28 decimal places
pub const E: Decimal = dec!(2.7182818284590452353602874714);

/// Natural logarithm of 2 to 28 decimal places
pub const LN_2: Decimal = dec!(0.6931471805599453094172321215);

/// Exponents below `-EXP_CUTOFF` evaluate to zero
///
/// `e^-64` is below the smallest positive `Decimal`.
pub const EXP_CUTOFF: Decimal = dec!(64);

/// Largest exponent whose result still fits in a `Decimal`
const EXP_MAX: Decimal = dec!(66);

const MAX_SERIES_TERMS: u32 = 200;

pub(crate) fn add(a: Decimal, b: Decimal) -> MathResult<Decimal> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub(crate) fn sub(a: Decimal, b: Decimal) -> MathResult<Decimal> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}

pub(crate) fn mul(a: Decimal, b: Decimal) -> MathResult<Decimal> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

pub(crate) fn div(a: Decimal, b: Decimal) -> MathResult<Decimal> {
    a.checked_div(b).ok_or(MathError::Overflow)
}

/// `e^x`
///
/// Returns 0 for `x < -64` and [`MathError::Overflow`] for `x > 66`.
pub fn exp(x: Decimal) -> MathResult<Decimal> {
    if x.is_zero() {
        return Ok(Decimal::ONE);
    }
    if x.is_sign_negative() {
        if x < -EXP_CUTOFF {
            return Ok(Decimal::ZERO);
        }
        return div(Decimal::ONE, exp(-x)?);
    }
    if x > EXP_MAX {
        return Err(MathError::Overflow);
    }

    let whole = x.trunc();
    let fraction = x - whole;
    let k = whole.to_u32().ok_or(MathError::Overflow)?;

    mul(e_pow(k)?, exp_series(fraction)?)
}

/// `e^k` by binary exponentiation
fn e_pow(mut k: u32) -> MathResult<Decimal> {
    let mut result = Decimal::ONE;
    let mut base = E;
    while k > 0 {
        if k & 1 == 1 {
            result = mul(result, base)?;
        }
        k >>= 1;
        if k > 0 {
            base = mul(base, base)?;
        }
    }
    Ok(result)
}

/// Taylor series of `e^f` for `0 <= f < 1`
fn exp_series(f: Decimal) -> MathResult<Decimal> {
    let mut sum = Decimal::ONE;
    let mut term = Decimal::ONE;
    for n in 1..MAX_SERIES_TERMS {
        term = div(mul(term, f)?, Decimal::from(n))?;
        if term.is_zero() {
            break;
        }
        sum = add(sum, term)?;
    }
    Ok(sum)
}

/// Natural logarithm
///
/// Normalizes `y = m * 2^k` with `m` in `[1, 2)` and evaluates
/// `ln m = 2 atanh((m - 1) / (m + 1))`.
pub fn ln(y: Decimal) -> MathResult<Decimal> {
    if y <= Decimal::ZERO {
        return Err(MathError::NonPositiveLogarithm);
    }
    if y == Decimal::ONE {
        return Ok(Decimal::ZERO);
    }

    let two = Decimal::TWO;
    let mut m = y;
    let mut k: i64 = 0;
    while m >= two {
        m = div(m, two)?;
        k += 1;
    }
    while m < Decimal::ONE {
        m = mul(m, two)?;
        k -= 1;
    }

    let t = div(sub(m, Decimal::ONE)?, add(m, Decimal::ONE)?)?;
    let t_squared = mul(t, t)?;
    let mut power = t;
    let mut sum = t;
    for n in 1..MAX_SERIES_TERMS {
        power = mul(power, t_squared)?;
        let term = div(power, Decimal::from(2 * n + 1))?;
        if term.is_zero() {
            break;
        }
        sum = add(sum, term)?;
    }

    add(mul(two, sum)?, mul(Decimal::from(k), LN_2)?)
}
