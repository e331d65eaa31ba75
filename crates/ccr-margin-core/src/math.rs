use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::CcrMarginError;
use crate::CcrMarginResult;

/// exp(x) below this is indistinguishable from zero at 28 digits.
const EXP_UNDERFLOW: Decimal = dec!(-60);

pub(crate) fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}

/// Overflow-safe exp. Callers only feed non-positive exponents, but large
/// positive values saturate rather than panic.
pub(crate) fn exp_decimal(x: Decimal) -> Decimal {
    if x < EXP_UNDERFLOW {
        return Decimal::ZERO;
    }
    x.checked_exp().unwrap_or(Decimal::MAX)
}

/// sqrt(sum_i sum_j w(i, j) * x_i * x_j), floored at zero.
///
/// The terms are divided by the largest |x_i| before squaring and the root is
/// scaled back afterwards, so books whose squared exposures exceed the
/// `Decimal` range still aggregate. Weights are correlations and lie in
/// [-1, 1].
pub(crate) fn correlated_norm<F>(values: &[Decimal], weight: F) -> CcrMarginResult<Decimal>
where
    F: Fn(usize, usize) -> Decimal,
{
    let scale = values.iter().map(|v| v.abs()).max().unwrap_or_default();
    if scale.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let unit: Vec<Decimal> = values.iter().map(|v| *v / scale).collect();

    let mut radicand = Decimal::ZERO;
    for (i, x) in unit.iter().enumerate() {
        for (j, y) in unit.iter().enumerate() {
            radicand += weight(i, j) * *x * *y;
        }
    }

    scale.checked_mul(sqrt_decimal(radicand)).ok_or_else(|| {
        CcrMarginError::Calculation(format!(
            "Aggregate of {} terms with largest magnitude {} exceeds the decimal range.",
            values.len(),
            scale
        ))
    })
}

/// Product of the factors, or a calculation error naming `what` on overflow.
pub(crate) fn checked_product(factors: &[Decimal], what: &str) -> CcrMarginResult<Decimal> {
    factors
        .iter()
        .try_fold(Decimal::ONE, |acc, f| acc.checked_mul(*f))
        .ok_or_else(|| CcrMarginError::Calculation(format!("{} exceeds the decimal range.", what)))
}
