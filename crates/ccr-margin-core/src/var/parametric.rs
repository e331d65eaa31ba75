use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use super::engine::{ReturnSeries, TailMeasures};
use crate::error::CcrMarginError;
use crate::math::sqrt_decimal;
use crate::types::Money;
use crate::CcrMarginResult;

/// Sample covariance matrix (n - 1 denominator) of aligned return windows.
pub(crate) fn sample_covariance(series: &[ReturnSeries<'_>]) -> Vec<Vec<Decimal>> {
    let n = series.first().map(|s| s.returns.len()).unwrap_or(0);
    if n < 2 {
        return vec![vec![Decimal::ZERO; series.len()]; series.len()];
    }
    let count = Decimal::from(n as u64);
    let means: Vec<Decimal> = series
        .iter()
        .map(|s| s.returns.iter().copied().sum::<Decimal>() / count)
        .collect();
    let denom = Decimal::from(n as u64 - 1);

    let k = series.len();
    let mut cov = vec![vec![Decimal::ZERO; k]; k];
    for i in 0..k {
        for j in i..k {
            let c: Decimal = series[i]
                .returns
                .iter()
                .zip(series[j].returns.iter())
                .map(|(a, b)| (*a - means[i]) * (*b - means[j]))
                .sum::<Decimal>()
                / denom;
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }
    cov
}

/// Standard normal quantile and density at the confidence level.
fn normal_quantile(confidence: Decimal) -> CcrMarginResult<(Decimal, Decimal)> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| CcrMarginError::Calculation(format!("Standard normal unavailable: {e}")))?;
    let c = confidence.to_f64().unwrap_or(0.95);
    let z = normal.inverse_cdf(c);
    let pdf = normal.pdf(z);
    Ok((
        Decimal::from_f64_retain(z).unwrap_or(Decimal::ZERO),
        Decimal::from_f64_retain(pdf).unwrap_or(Decimal::ZERO),
    ))
}

/// Variance-covariance VaR: z * sigma_p * sqrt(h), with Euler allocation of
/// the portfolio VaR across positions.
pub(crate) fn tail_measures(
    series: &[ReturnSeries<'_>],
    confidence: Decimal,
    scale: Decimal,
    correlated: bool,
) -> CcrMarginResult<TailMeasures> {
    let (z, pdf) = normal_quantile(confidence)?;
    let cov = sample_covariance(series);
    let exposures: Vec<Money> = series.iter().map(|s| s.exposure).collect();
    let k = exposures.len();

    let sigmas: Vec<Decimal> = (0..k).map(|i| sqrt_decimal(cov[i][i])).collect();
    let standalone: Vec<Money> = (0..k)
        .map(|i| z * exposures[i].abs() * sigmas[i] * scale)
        .collect();

    // (Sigma * e)_i
    let marginal: Vec<Decimal> = (0..k)
        .map(|i| (0..k).map(|j| cov[i][j] * exposures[j]).sum())
        .collect();

    let (sigma_p, contributions) = if correlated && k > 1 {
        let variance: Decimal = (0..k).map(|i| exposures[i] * marginal[i]).sum();
        let sigma_p = sqrt_decimal(variance);
        let contributions = if sigma_p.is_zero() {
            vec![Decimal::ZERO; k]
        } else {
            (0..k)
                .map(|i| z * exposures[i] * marginal[i] / sigma_p * scale)
                .collect()
        };
        (sigma_p, contributions)
    } else {
        let sigma_p: Decimal = (0..k).map(|i| exposures[i].abs() * sigmas[i]).sum();
        (sigma_p, standalone.clone())
    };

    let tail = Decimal::ONE - confidence;
    Ok(TailMeasures {
        var: (z * sigma_p * scale).max(Decimal::ZERO),
        expected_shortfall: (sigma_p * pdf / tail * scale).max(Decimal::ZERO),
        contributions,
        standalone,
        observations: series.first().map(|s| s.returns.len()).unwrap_or(0),
    })
}
