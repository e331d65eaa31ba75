use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::parameters::PfeParameters;
use crate::error::CcrMarginError;
use crate::model::collateral::{total_stressed, validate_collateral, Collateral};
use crate::model::maturity::{default_valuation_date, MaturityBucket};
use crate::model::netting_set::{pfe_multiplier, NettingSet};
use crate::model::trade::{validate_trades, AssetClass, Trade};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::CcrMarginResult;

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PfeInput {
    pub netting_set: NettingSet,
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub collateral: Vec<Collateral>,
    #[serde(default = "default_valuation_date")]
    pub valuation_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PfeTradeContribution {
    pub trade_id: String,
    pub asset_class: AssetClass,
    pub maturity_bucket: MaturityBucket,
    pub add_on_factor: Rate,
    /// Notional * factor, before netting
    pub gross_add_on: Money,
    /// Share of the final PFE attributed to this trade
    pub contribution: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PfeOutput {
    pub pfe: Money,
    /// Net add-on after the net-to-gross adjustment
    pub add_on: Money,
    pub gross_add_on: Money,
    pub multiplier: Decimal,
    pub net_to_gross_ratio: Decimal,
    pub net_market_value: Money,
    /// Collateral at stressed haircuts (plus VM when margined)
    pub collateral_value: Money,
    pub per_trade_contribution: Vec<PfeTradeContribution>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn calculate_pfe(input: &PfeInput) -> CcrMarginResult<ComputationOutput<PfeOutput>> {
    calculate_pfe_with(input, PfeParameters::cem())
}

/// Potential future exposure from per-trade add-ons, netted with the
/// net-to-gross ratio of current market values.
pub fn calculate_pfe_with(
    input: &PfeInput,
    params: &PfeParameters,
) -> CcrMarginResult<ComputationOutput<PfeOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    tracing::debug!(
        netting_set = %input.netting_set.id,
        trades = input.trades.len(),
        "computing PFE"
    );

    input.netting_set.validate()?;
    validate_trades(&input.trades, input.valuation_date)?;
    validate_collateral(&input.collateral)?;

    if let Some(w) = input.netting_set.ignored_terms_warning() {
        warnings.push(w);
    }

    // -- Gross add-on --------------------------------------------------------
    let mut details: Vec<PfeTradeContribution> = Vec::with_capacity(input.trades.len());
    for trade in &input.trades {
        let bucket = MaturityBucket::from_years(trade.end_years(input.valuation_date));
        let factor = params.factor(trade, bucket);
        details.push(PfeTradeContribution {
            trade_id: trade.id().to_string(),
            asset_class: trade.asset_class(),
            maturity_bucket: bucket,
            add_on_factor: factor,
            gross_add_on: trade.terms().notional * factor,
            contribution: Decimal::ZERO,
        });
    }
    let gross_add_on: Money = details.iter().map(|d| d.gross_add_on).sum();

    // -- Net-to-gross ratio --------------------------------------------------
    let net_market_value: Money = input.trades.iter().map(|t| t.terms().market_value).sum();
    let gross_positive: Money = input
        .trades
        .iter()
        .map(|t| t.terms().market_value.max(Decimal::ZERO))
        .sum();
    let net_to_gross_ratio = if gross_positive.is_zero() {
        warnings.push(
            "No trade has a positive market value; net-to-gross ratio set to 1.".into(),
        );
        Decimal::ONE
    } else {
        net_market_value.max(Decimal::ZERO) / gross_positive
    };

    let net_weight = Decimal::ONE - params.gross_weight;
    let add_on = gross_add_on * (params.gross_weight + net_weight * net_to_gross_ratio);

    // -- Multiplier ----------------------------------------------------------
    let collateral_value = input
        .netting_set
        .collateral_held(total_stressed(&input.collateral));
    let multiplier = pfe_multiplier(
        net_market_value - collateral_value,
        add_on,
        params.multiplier_floor,
    );
    let pfe = multiplier * add_on;

    if pfe < Decimal::ZERO {
        return Err(CcrMarginError::Calculation(format!(
            "Negative PFE ({}) for netting set '{}'.",
            pfe, input.netting_set.id
        )));
    }

    if !gross_add_on.is_zero() {
        for d in details.iter_mut() {
            d.contribution = pfe * d.gross_add_on / gross_add_on;
        }
    }

    let output = PfeOutput {
        pfe,
        add_on,
        gross_add_on,
        multiplier,
        net_to_gross_ratio,
        net_market_value,
        collateral_value,
        per_trade_contribution: details,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "add_on": "notional x factor(asset class, residual maturity bucket)",
        "netting": format!("{} x gross + {} x NGR x gross", params.gross_weight, net_weight),
        "collateral": "stressed haircuts",
        "multiplier_floor": params.multiplier_floor.to_string(),
        "valuation_date": input.valuation_date.to_string(),
    });

    Ok(with_metadata(
        "Potential Future Exposure (add-on with net-to-gross netting)",
        &params.version,
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}
