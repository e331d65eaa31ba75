use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::add_on::{
    aggregate_hedging_sets, classify_trade, per_asset_class, HedgingSetAddOn, TradeAddOn,
};
use super::parameters::SaCcrParameters;
use crate::error::CcrMarginError;
use crate::model::collateral::{total_after_haircut, validate_collateral, Collateral};
use crate::model::maturity::default_valuation_date;
use crate::model::netting_set::{pfe_multiplier, NettingSet};
use crate::model::trade::{validate_trades, AssetClass, Trade};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::CcrMarginResult;

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaCcrInput {
    pub netting_set: NettingSet,
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub collateral: Vec<Collateral>,
    #[serde(default = "default_valuation_date")]
    pub valuation_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaCcrOutput {
    /// Exposure at default: alpha * (RC + PFE)
    pub ead: Money,
    pub replacement_cost: Money,
    /// Multiplier * aggregate add-on
    pub pfe: Money,
    pub add_on: Money,
    pub multiplier: Decimal,
    pub per_asset_class_add_on: BTreeMap<AssetClass, Money>,
    /// V: sum of trade market values
    pub net_market_value: Money,
    /// C: haircut collateral (plus VM when margined)
    pub collateral_value: Money,
    pub hedging_sets: Vec<HedgingSetAddOn>,
    pub trade_details: Vec<TradeAddOn>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Exposure at default under the Basel SA-CCR using the default CRE52 table.
pub fn calculate_sa_ccr(input: &SaCcrInput) -> CcrMarginResult<ComputationOutput<SaCcrOutput>> {
    calculate_sa_ccr_with(input, SaCcrParameters::basel_cre52())
}

/// Exposure at default under the Basel SA-CCR with a caller-supplied table.
pub fn calculate_sa_ccr_with(
    input: &SaCcrInput,
    params: &SaCcrParameters,
) -> CcrMarginResult<ComputationOutput<SaCcrOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    tracing::debug!(
        netting_set = %input.netting_set.id,
        trades = input.trades.len(),
        collateral = input.collateral.len(),
        "computing SA-CCR exposure"
    );

    // -- Validation ----------------------------------------------------------
    input.netting_set.validate()?;
    validate_trades(&input.trades, input.valuation_date)?;
    validate_collateral(&input.collateral)?;

    if let Some(w) = input.netting_set.ignored_terms_warning() {
        warnings.push(w);
    }
    for trade in input.trades.iter().filter(|t| t.terms().transaction_type.is_option()) {
        warnings.push(format!(
            "Trade '{}' is an option; supervisory delta is taken as +/-1 from the position \
             without an option pricing model.",
            trade.id()
        ));
    }

    // -- Replacement cost ----------------------------------------------------
    let net_market_value: Money = input.trades.iter().map(|t| t.terms().market_value).sum();
    let collateral_value = input
        .netting_set
        .collateral_held(total_after_haircut(&input.collateral));
    let replacement_cost = input
        .netting_set
        .replacement_cost(net_market_value, collateral_value);

    // -- Add-ons -------------------------------------------------------------
    let classified = input
        .trades
        .iter()
        .map(|t| classify_trade(t, &input.netting_set, input.valuation_date, params))
        .collect::<CcrMarginResult<Vec<_>>>()?;

    let hedging_sets = aggregate_hedging_sets(&classified, params)?;
    let per_asset_class_add_on = per_asset_class(&hedging_sets);
    let add_on: Money = per_asset_class_add_on.values().copied().sum();

    if add_on < Decimal::ZERO {
        return Err(CcrMarginError::Calculation(format!(
            "Aggregate add-on is negative ({}) for netting set '{}'.",
            add_on, input.netting_set.id
        )));
    }

    // -- Multiplier, PFE, EAD ------------------------------------------------
    let multiplier = pfe_multiplier(
        net_market_value - collateral_value,
        add_on,
        params.multiplier_floor,
    );
    if multiplier < params.multiplier_floor || multiplier > Decimal::ONE {
        return Err(CcrMarginError::Calculation(format!(
            "Multiplier {} outside [{}, 1].",
            multiplier, params.multiplier_floor
        )));
    }

    let pfe = multiplier * add_on;
    let ead = params.alpha * (replacement_cost + pfe);

    if add_on.is_zero() {
        warnings.push("Aggregate add-on is zero; multiplier set to 1.".into());
    }

    let output = SaCcrOutput {
        ead,
        replacement_cost,
        pfe,
        add_on,
        multiplier,
        per_asset_class_add_on,
        net_market_value,
        collateral_value,
        hedging_sets,
        trade_details: classified.into_iter().map(|c| c.detail).collect(),
    };

    tracing::debug!(netting_set = %input.netting_set.id, %ead, %add_on, "SA-CCR complete");

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "alpha": params.alpha.to_string(),
        "multiplier_floor": params.multiplier_floor.to_string(),
        "valuation_date": input.valuation_date.to_string(),
        "margin_type": input.netting_set.margin_type,
        "day_count": "ACT/365",
        "delta": "+1 long / -1 short",
    });

    Ok(with_metadata(
        "SA-CCR Exposure at Default (Basel CRE52)",
        &params.version,
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}
