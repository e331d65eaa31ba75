use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use statrs::distribution::Normal;

use super::engine::{ReturnSeries, TailMeasures, VarParameters};
use super::historical;
use super::parametric::sample_covariance;
use crate::error::CcrMarginError;
use crate::types::Money;
use crate::CcrMarginResult;

const PSD_TOLERANCE: f64 = 1e-14;

/// Lower Cholesky factor of a positive semi-definite matrix. Zero pivots
/// leave their column empty.
pub(crate) fn cholesky_psd(matrix: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut l = vec![vec![0.0_f64; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum < -PSD_TOLERANCE {
                    return None;
                }
                l[i][j] = sum.max(0.0).sqrt();
            } else if l[j][j] > PSD_TOLERANCE {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// Simulated one-day P&L from zero-mean normal returns with the sample
/// covariance, then the same tail estimator as historical simulation.
///
/// The generator is seeded from the parameters, so the result is a pure
/// function of the input.
pub(crate) fn tail_measures(
    series: &[ReturnSeries<'_>],
    params: &VarParameters,
    confidence: Decimal,
    scale: Decimal,
) -> CcrMarginResult<TailMeasures> {
    let k = series.len();
    let cov = sample_covariance(series);
    let mut cov_f64: Vec<Vec<f64>> = cov
        .iter()
        .map(|row| row.iter().map(|c| c.to_f64().unwrap_or(0.0)).collect())
        .collect();
    if !params.include_correlations {
        for (i, row) in cov_f64.iter_mut().enumerate() {
            for (j, c) in row.iter_mut().enumerate() {
                if i != j {
                    *c = 0.0;
                }
            }
        }
    }

    let chol = cholesky_psd(&cov_f64).ok_or_else(|| {
        CcrMarginError::Calculation("Sample covariance is not positive semi-definite.".into())
    })?;
    let exposures: Vec<f64> = series
        .iter()
        .map(|s| s.exposure.to_f64().unwrap_or(0.0))
        .collect();

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| CcrMarginError::Calculation(format!("Standard normal unavailable: {e}")))?;
    let mut rng = StdRng::seed_from_u64(params.seed);

    let sims = params.num_simulations;
    let mut pnl: Vec<Vec<Money>> = vec![Vec::with_capacity(sims); k];
    let mut draws = vec![0.0_f64; k];
    for _ in 0..sims {
        for d in draws.iter_mut() {
            *d = rng.sample(&normal);
        }
        for i in 0..k {
            let r: f64 = chol[i].iter().zip(draws.iter()).take(i + 1).map(|(l, z)| l * z).sum();
            let value = exposures[i] * r;
            pnl[i].push(Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO));
        }
    }

    Ok(historical::tail_measures(
        &pnl,
        confidence,
        scale,
        params.include_correlations,
    ))
}
