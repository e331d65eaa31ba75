use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use super::{historical, monte_carlo, parametric};
use crate::error::CcrMarginError;
use crate::math::sqrt_decimal;
use crate::model::market_data::{HistoricalMarketData, Position, VarAssetType};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::CcrMarginResult;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    #[serde(rename = "90%", alias = "0.90")]
    P90,
    #[serde(rename = "95%", alias = "0.95")]
    P95,
    #[serde(rename = "97.5%", alias = "0.975")]
    P975,
    #[serde(rename = "99%", alias = "0.99")]
    P99,
}

impl ConfidenceLevel {
    pub fn value(&self) -> Decimal {
        match self {
            ConfidenceLevel::P90 => dec!(0.90),
            ConfidenceLevel::P95 => dec!(0.95),
            ConfidenceLevel::P975 => dec!(0.975),
            ConfidenceLevel::P99 => dec!(0.99),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeHorizon {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "10D")]
    TenDay,
}

impl TimeHorizon {
    pub fn days(&self) -> u32 {
        match self {
            TimeHorizon::OneDay => 1,
            TimeHorizon::TenDay => 10,
        }
    }

    /// Square-root-of-time scaling from one day.
    pub fn scaling(&self) -> Decimal {
        sqrt_decimal(Decimal::from(self.days()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VarMethod {
    #[default]
    HistoricalSimulation,
    Parametric,
    MonteCarlo,
}

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarParameters {
    pub confidence_level: ConfidenceLevel,
    pub time_horizon: TimeHorizon,
    /// Number of daily returns to use (most recent first)
    #[serde(default = "default_lookback")]
    pub lookback_period: usize,
    #[serde(default)]
    pub method: VarMethod,
    /// Aggregate on the joint P&L; when false VaR is the sum of standalone VaRs
    #[serde(default = "default_true")]
    pub include_correlations: bool,
    #[serde(default = "default_true")]
    pub include_expected_shortfall: bool,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_lookback() -> usize {
    250
}

fn default_true() -> bool {
    true
}

fn default_num_simulations() -> usize {
    10_000
}

fn default_seed() -> u64 {
    42
}

impl Default for VarParameters {
    fn default() -> Self {
        Self {
            confidence_level: ConfidenceLevel::P95,
            time_horizon: TimeHorizon::OneDay,
            lookback_period: default_lookback(),
            method: VarMethod::default(),
            include_correlations: true,
            include_expected_shortfall: true,
            num_simulations: default_num_simulations(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarInput {
    pub positions: Vec<Position>,
    #[serde(default)]
    pub parameters: VarParameters,
    pub historical_data: Vec<HistoricalMarketData>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionContribution {
    pub identifier: String,
    pub asset_type: VarAssetType,
    pub market_value: Money,
    pub standalone_var: Money,
    /// Component VaR; contributions sum to the portfolio VaR
    pub contribution: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarOutput {
    pub var: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_shortfall: Option<Money>,
    pub per_position_contribution: Vec<PositionContribution>,
    /// Sum of standalone VaRs
    pub undiversified_var: Money,
    pub diversification_benefit: Money,
    /// Number of return observations (or simulations) behind the estimate
    pub observations: usize,
    pub method: VarMethod,
    pub confidence_level: Decimal,
    pub horizon_days: u32,
}

// ---------------------------------------------------------------------------
// Shared intermediate types
// ---------------------------------------------------------------------------

/// A position with its aligned daily return window.
pub(crate) struct ReturnSeries<'a> {
    pub position: &'a Position,
    /// Quantity * current price
    pub exposure: Money,
    pub returns: Vec<Decimal>,
}

/// Horizon-scaled tail measures produced by each method.
pub(crate) struct TailMeasures {
    pub var: Money,
    pub expected_shortfall: Money,
    pub contributions: Vec<Money>,
    pub standalone: Vec<Money>,
    pub observations: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value-at-Risk for a set of positions revalued against their price
/// histories.
///
/// The method discriminant selects historical simulation, variance-covariance
/// or a seeded Monte Carlo on the sample covariance. All three share the same
/// return window: the most recent `lookback_period` returns common to every
/// position.
pub fn calculate_var(input: &VarInput) -> CcrMarginResult<ComputationOutput<VarOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let params = &input.parameters;

    tracing::debug!(
        positions = input.positions.len(),
        series = input.historical_data.len(),
        method = ?params.method,
        "computing VaR"
    );

    validate_input(input)?;
    let series = align_returns(input, &mut warnings)?;

    let confidence = params.confidence_level.value();
    let scale = params.time_horizon.scaling();

    let tail = match params.method {
        VarMethod::HistoricalSimulation => {
            let pnl = historical::pnl_matrix(&series);
            historical::tail_measures(&pnl, confidence, scale, params.include_correlations)
        }
        VarMethod::Parametric => {
            require_two_returns(&series)?;
            parametric::tail_measures(&series, confidence, scale, params.include_correlations)?
        }
        VarMethod::MonteCarlo => {
            require_two_returns(&series)?;
            monte_carlo::tail_measures(&series, params, confidence, scale)?
        }
    };

    let undiversified_var: Money = tail.standalone.iter().copied().sum();
    let per_position_contribution = series
        .iter()
        .zip(tail.contributions.iter().zip(tail.standalone.iter()))
        .map(|(s, (contribution, standalone))| PositionContribution {
            identifier: s.position.identifier.clone(),
            asset_type: s.position.asset_type,
            market_value: s.exposure,
            standalone_var: *standalone,
            contribution: *contribution,
        })
        .collect();

    let output = VarOutput {
        var: tail.var,
        expected_shortfall: params
            .include_expected_shortfall
            .then_some(tail.expected_shortfall),
        per_position_contribution,
        undiversified_var,
        diversification_benefit: undiversified_var - tail.var,
        observations: tail.observations,
        method: params.method,
        confidence_level: confidence,
        horizon_days: params.time_horizon.days(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "method": params.method,
        "confidence_level": confidence.to_string(),
        "time_horizon_days": params.time_horizon.days(),
        "scaling": "square root of time",
        "lookback_period": params.lookback_period,
        "include_correlations": params.include_correlations,
        "returns": "simple daily returns p[t]/p[t-1] - 1",
        "seed": (params.method == VarMethod::MonteCarlo).then_some(params.seed),
    });

    Ok(with_metadata(
        "Value at Risk",
        "Historical / variance-covariance / Monte Carlo VaR",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal: validation and data preparation
// ---------------------------------------------------------------------------

fn validate_input(input: &VarInput) -> CcrMarginResult<()> {
    if input.positions.is_empty() {
        return Err(CcrMarginError::invalid(
            "positions",
            "At least one position is required.",
        ));
    }
    for (i, p) in input.positions.iter().enumerate() {
        if p.identifier.trim().is_empty() {
            return Err(CcrMarginError::invalid(
                format!("positions[{}].identifier", i),
                "Position identifier cannot be empty.",
            ));
        }
        if p.current_price <= Decimal::ZERO {
            return Err(CcrMarginError::invalid(
                format!("positions[{}:{}].current_price", i, p.identifier),
                "Current price must be positive.",
            ));
        }
    }
    let params = &input.parameters;
    if params.lookback_period == 0 {
        return Err(CcrMarginError::invalid(
            "parameters.lookback_period",
            "Lookback period must be at least one day.",
        ));
    }
    if params.method == VarMethod::MonteCarlo && params.num_simulations == 0 {
        return Err(CcrMarginError::invalid(
            "parameters.num_simulations",
            "Monte Carlo needs at least one simulation.",
        ));
    }
    Ok(())
}

/// Look up each position's history and cut every return series to the most
/// recent window they all share.
fn align_returns<'a>(
    input: &'a VarInput,
    warnings: &mut Vec<String>,
) -> CcrMarginResult<Vec<ReturnSeries<'a>>> {
    let mut by_asset: HashMap<&str, &HistoricalMarketData> = HashMap::new();
    for data in &input.historical_data {
        if by_asset.insert(data.asset_id.as_str(), data).is_some() {
            return Err(CcrMarginError::invalid(
                format!("historical_data[{}]", data.asset_id),
                "Duplicate price history for the same asset.",
            ));
        }
    }

    let lookback = input.parameters.lookback_period;
    let mut raw: Vec<(&Position, Vec<Decimal>)> = Vec::with_capacity(input.positions.len());
    for position in &input.positions {
        let data = by_asset
            .get(position.identifier.as_str())
            .ok_or_else(|| {
                CcrMarginError::InsufficientData(format!(
                    "No historical data for position '{}'.",
                    position.identifier
                ))
            })?;
        data.validate()?;
        if data.prices.len() < 2 {
            return Err(CcrMarginError::InsufficientData(format!(
                "Position '{}' has {} price point(s); at least 2 are required.",
                position.identifier,
                data.prices.len()
            )));
        }
        let returns = data.daily_returns();
        if returns.len() < lookback {
            warnings.push(format!(
                "Only {} returns available for '{}' (lookback {}); using all of them.",
                returns.len(),
                position.identifier,
                lookback
            ));
        }
        raw.push((position, returns));
    }

    let window = raw
        .iter()
        .map(|(_, r)| r.len())
        .min()
        .unwrap_or(0)
        .min(lookback);
    if raw.iter().any(|(_, r)| r.len().min(lookback) != window) {
        warnings.push(format!(
            "Return histories differ in length; aligned on the most recent {} common returns.",
            window
        ));
    }

    Ok(raw
        .into_iter()
        .map(|(position, returns)| {
            let tail = returns[returns.len() - window..].to_vec();
            ReturnSeries {
                position,
                exposure: position.market_value(),
                returns: tail,
            }
        })
        .collect())
}

fn require_two_returns(series: &[ReturnSeries<'_>]) -> CcrMarginResult<()> {
    let n = series.first().map(|s| s.returns.len()).unwrap_or(0);
    if n < 2 {
        return Err(CcrMarginError::InsufficientData(format!(
            "Variance estimation needs at least 2 returns; {} available.",
            n
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::market_data::PricePoint;
    use crate::types::Currency;
    use chrono::NaiveDate;

    fn history(asset_id: &str, prices: &[Decimal]) -> HistoricalMarketData {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        HistoricalMarketData {
            asset_id: asset_id.into(),
            prices: prices
                .iter()
                .enumerate()
                .map(|(i, p)| PricePoint {
                    date: start + chrono::Days::new(i as u64),
                    price: *p,
                    volume: Decimal::ZERO,
                })
                .collect(),
        }
    }

    fn position(id: &str, quantity: Decimal, price: Decimal) -> Position {
        Position {
            asset_type: VarAssetType::Equity,
            identifier: id.into(),
            quantity,
            current_price: price,
            currency: Currency::USD,
            purchase_date: None,
        }
    }

    /// Returns of +1%, -2%, +3%, -4%, ... on a 100 price.
    fn zigzag(n: usize) -> Vec<Decimal> {
        let mut prices = vec![dec!(100)];
        for i in 1..=n {
            let step = Decimal::from(i as u64) / dec!(100);
            let r = if i % 2 == 1 { step } else { -step };
            let last = *prices.last().unwrap();
            prices.push(last * (Decimal::ONE + r));
        }
        prices
    }

    fn input(params: VarParameters) -> VarInput {
        VarInput {
            positions: vec![position("AAA", dec!(100), dec!(100))],
            parameters: params,
            historical_data: vec![history("AAA", &zigzag(20))],
        }
    }

    #[test]
    fn test_parameter_defaults_from_json() {
        let p: VarParameters =
            serde_json::from_str(r#"{"confidence_level": "99%", "time_horizon": "10D"}"#).unwrap();
        assert_eq!(p.lookback_period, 250);
        assert_eq!(p.method, VarMethod::HistoricalSimulation);
        assert!(p.include_correlations);
        assert_eq!(p.seed, 42);
        assert_eq!(p.confidence_level.value(), dec!(0.99));
    }

    #[test]
    fn test_historical_single_position() {
        let out = calculate_var(&input(VarParameters::default())).unwrap().result;
        // 20 returns, index floor(0.05 * 20) = 1 -> second worst return -18%
        let tol = dec!(0.000001);
        assert_eq!(out.observations, 20);
        assert!((out.var - dec!(1800)).abs() < tol, "var {}", out.var);
        // ES = mean(-20%, -18%) x 10,000
        let es = out.expected_shortfall.unwrap();
        assert!((es - dec!(1900)).abs() < tol, "es {}", es);
        assert_eq!(out.per_position_contribution[0].contribution, out.var);
        assert_eq!(out.diversification_benefit, Decimal::ZERO);
    }

    #[test]
    fn test_ten_day_scaling() {
        let mut p = VarParameters::default();
        p.time_horizon = TimeHorizon::TenDay;
        let one_day = calculate_var(&input(VarParameters::default())).unwrap().result.var;
        let ten_day = calculate_var(&input(p)).unwrap().result.var;
        assert!((ten_day - one_day * sqrt_decimal(dec!(10))).abs() < dec!(0.0001));
    }

    #[test]
    fn test_short_lookback_warns() {
        let output = calculate_var(&input(VarParameters::default())).unwrap();
        assert!(output.warnings.iter().any(|w| w.contains("Only 20 returns")));
    }

    #[test]
    fn test_missing_history_is_insufficient_data() {
        let mut i = input(VarParameters::default());
        i.historical_data.clear();
        assert!(matches!(
            calculate_var(&i).unwrap_err(),
            CcrMarginError::InsufficientData(_)
        ));
    }

    #[test]
    fn test_single_price_point_is_insufficient_data() {
        let mut i = input(VarParameters::default());
        i.historical_data = vec![history("AAA", &[dec!(100)])];
        assert!(matches!(
            calculate_var(&i).unwrap_err(),
            CcrMarginError::InsufficientData(_)
        ));
    }

    #[test]
    fn test_empty_positions_rejected() {
        let mut i = input(VarParameters::default());
        i.positions.clear();
        assert!(matches!(
            calculate_var(&i).unwrap_err(),
            CcrMarginError::InvalidInput { .. }
        ));
    }

    #[test]
    fn test_offsetting_positions_diversify() {
        let mut i = input(VarParameters::default());
        i.positions.push(position("BBB", dec!(-100), dec!(100)));
        i.historical_data.push(history("BBB", &zigzag(20)));
        let out = calculate_var(&i).unwrap().result;
        assert_eq!(out.var, Decimal::ZERO);
        assert!((out.undiversified_var - dec!(3600)).abs() < dec!(0.000001));
        assert_eq!(out.diversification_benefit, out.undiversified_var);
    }

    #[test]
    fn test_without_correlations_sums_standalone() {
        let mut p = VarParameters::default();
        p.include_correlations = false;
        let mut i = input(p);
        i.positions.push(position("BBB", dec!(-100), dec!(100)));
        i.historical_data.push(history("BBB", &zigzag(20)));
        let out = calculate_var(&i).unwrap().result;
        assert_eq!(out.var, out.undiversified_var);
        assert_eq!(out.diversification_benefit, Decimal::ZERO);
    }

    #[test]
    fn test_unequal_histories_aligned() {
        let mut i = input(VarParameters::default());
        i.positions.push(position("BBB", dec!(10), dec!(50)));
        i.historical_data.push(history("BBB", &zigzag(10)));
        let output = calculate_var(&i).unwrap();
        assert_eq!(output.result.observations, 10);
        assert!(output.warnings.iter().any(|w| w.contains("aligned")));
    }
}
