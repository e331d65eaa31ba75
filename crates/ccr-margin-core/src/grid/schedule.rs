use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::parameters::GridScheduleParameters;
use crate::model::collateral::{total_stressed, validate_collateral, Collateral};
use crate::model::maturity::{default_valuation_date, MaturityBucket};
use crate::model::netting_set::NettingSet;
use crate::model::trade::{validate_trades, AssetClass, Trade};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::CcrMarginResult;

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridScheduleInput {
    pub netting_set: NettingSet,
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub collateral: Vec<Collateral>,
    #[serde(default = "default_valuation_date")]
    pub valuation_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTradeDetail {
    pub trade_id: String,
    pub asset_class: AssetClass,
    pub maturity_bucket: MaturityBucket,
    pub notional: Money,
    pub margin_rate: Rate,
    pub gross_initial_margin: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridScheduleOutput {
    /// Gross margin after the net-to-gross adjustment
    pub initial_margin: Money,
    /// Initial margin less stressed collateral, floored at zero
    pub net_initial_margin: Money,
    pub gross_initial_margin: Money,
    pub gross_notional_by_asset_class: BTreeMap<AssetClass, Money>,
    pub gross_im_by_asset_class: BTreeMap<AssetClass, Money>,
    /// 0.4 + 0.6 * replacement_cost_ratio, within [0.4, 1]
    pub net_gross_ratio: Decimal,
    /// Net replacement cost / gross replacement cost
    pub replacement_cost_ratio: Decimal,
    pub collateral_value: Money,
    pub trade_details: Vec<GridTradeDetail>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn calculate_grid_schedule_im(
    input: &GridScheduleInput,
) -> CcrMarginResult<ComputationOutput<GridScheduleOutput>> {
    calculate_grid_schedule_im_with(input, GridScheduleParameters::bcbs_iosco())
}

/// Schedule-based initial margin: notional times the schedule percentage,
/// scaled by the net-to-gross ratio and reduced by collateral.
pub fn calculate_grid_schedule_im_with(
    input: &GridScheduleInput,
    params: &GridScheduleParameters,
) -> CcrMarginResult<ComputationOutput<GridScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    tracing::debug!(
        netting_set = %input.netting_set.id,
        trades = input.trades.len(),
        "computing schedule initial margin"
    );

    input.netting_set.validate()?;
    validate_trades(&input.trades, input.valuation_date)?;
    validate_collateral(&input.collateral)?;

    // -- Gross IM by trade and asset class ----------------------------------
    let mut gross_notional_by_asset_class: BTreeMap<AssetClass, Money> =
        AssetClass::ALL.iter().map(|ac| (*ac, Decimal::ZERO)).collect();
    let mut gross_im_by_asset_class = gross_notional_by_asset_class.clone();
    let mut trade_details = Vec::with_capacity(input.trades.len());

    for trade in &input.trades {
        let asset_class = trade.asset_class();
        let bucket = MaturityBucket::from_years(trade.end_years(input.valuation_date));
        let margin_rate = params.rate(asset_class, bucket);
        let notional = trade.terms().notional;
        let gross = notional * margin_rate;

        *gross_notional_by_asset_class.entry(asset_class).or_default() += notional;
        *gross_im_by_asset_class.entry(asset_class).or_default() += gross;

        trade_details.push(GridTradeDetail {
            trade_id: trade.id().to_string(),
            asset_class,
            maturity_bucket: bucket,
            notional,
            margin_rate,
            gross_initial_margin: gross,
        });
    }
    let gross_initial_margin: Money = gross_im_by_asset_class.values().copied().sum();

    // -- Net-to-gross ratio --------------------------------------------------
    let net_rc = input
        .trades
        .iter()
        .map(|t| t.terms().market_value)
        .sum::<Decimal>()
        .max(Decimal::ZERO);
    let gross_rc: Money = input
        .trades
        .iter()
        .map(|t| t.terms().market_value.max(Decimal::ZERO))
        .sum();
    let replacement_cost_ratio = if gross_rc.is_zero() {
        warnings.push("Gross replacement cost is zero; no netting benefit recognised.".into());
        Decimal::ONE
    } else {
        net_rc / gross_rc
    };
    let floor = params.gross_weight;
    let net_gross_ratio = (floor + (Decimal::ONE - floor) * replacement_cost_ratio)
        .max(floor)
        .min(Decimal::ONE);

    let initial_margin = gross_initial_margin * net_gross_ratio;
    let collateral_value = total_stressed(&input.collateral);
    let net_initial_margin = (initial_margin - collateral_value).max(Decimal::ZERO);

    if !collateral_value.is_zero() && net_initial_margin.is_zero() {
        warnings.push("Collateral fully covers the schedule initial margin.".into());
    }

    let output = GridScheduleOutput {
        initial_margin,
        net_initial_margin,
        gross_initial_margin,
        gross_notional_by_asset_class,
        gross_im_by_asset_class,
        net_gross_ratio,
        replacement_cost_ratio,
        collateral_value,
        trade_details,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "schedule": "notional x percentage(asset class, residual maturity)",
        "net_gross_ratio": format!("{} + {} x NGR", floor, Decimal::ONE - floor),
        "collateral": "stressed haircuts",
        "valuation_date": input.valuation_date.to_string(),
    });

    Ok(with_metadata(
        "Standardised Schedule Initial Margin",
        &params.version,
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}
