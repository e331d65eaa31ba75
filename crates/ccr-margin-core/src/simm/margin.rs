use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

use super::parameters::{RiskClassTable, SimmParameters};
use crate::error::CcrMarginError;
use crate::math::{checked_product, correlated_norm};
use crate::model::collateral::{total_stressed, validate_collateral, Collateral};
use crate::model::maturity::default_valuation_date;
use crate::model::netting_set::NettingSet;
use crate::model::risk_factor::RiskType;
use crate::model::trade::{validate_trades, Trade};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::CcrMarginResult;

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimmInput {
    pub netting_set: NettingSet,
    /// Trades carry their delta sensitivities
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub collateral: Vec<Collateral>,
    /// Only used to validate trade dates
    #[serde(default = "default_valuation_date")]
    pub valuation_date: chrono::NaiveDate,
    #[serde(default)]
    pub include_correlation_matrix: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactorContribution {
    pub risk_type: RiskType,
    pub bucket: u32,
    pub label: String,
    /// Sum of sensitivities sharing this (risk type, bucket, label)
    pub net_sensitivity: Money,
    pub risk_weight: Decimal,
    pub weighted_sensitivity: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketMargin {
    pub bucket: u32,
    /// K_b
    pub margin: Money,
    /// Sum of weighted sensitivities in the bucket
    pub weighted_sensitivity_sum: Money,
    pub risk_factor_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskClassMargin {
    pub risk_type: RiskType,
    pub margin: Money,
    pub buckets: Vec<BucketMargin>,
}

/// Inter-bucket correlations among the buckets that carry risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub risk_type: RiskType,
    pub buckets: Vec<u32>,
    pub matrix: Vec<Vec<Decimal>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimmOutput {
    pub initial_margin: Money,
    /// Initial margin less stressed collateral, floored at zero
    pub net_initial_margin: Money,
    /// Sum of bucket margins before any diversification
    pub gross_margin: Money,
    pub diversification_benefit: Money,
    pub collateral_value: Money,
    pub risk_class_margins: Vec<RiskClassMargin>,
    pub risk_factor_contributions: Vec<RiskFactorContribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_matrix: Option<Vec<CorrelationMatrix>>,
}

impl SimmInput {
    /// Parse a SIMM request from JSON.
    ///
    /// Unrecognised risk type names are reported as `InvalidInput` at their
    /// `trades[i:id].sensitivities[j].risk_type` path; every other shape
    /// error is a `SerializationError`.
    pub fn from_json(json: &str) -> CcrMarginResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> CcrMarginResult<Self> {
        check_risk_type_names(&value)?;
        Ok(serde_json::from_value(value)?)
    }
}

type NetSensitivities = BTreeMap<RiskType, BTreeMap<u32, BTreeMap<String, Money>>>;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn calculate_simm(input: &SimmInput) -> CcrMarginResult<ComputationOutput<SimmOutput>> {
    calculate_simm_with(input, SimmParameters::v2_6())
}

/// Sensitivity-based initial margin.
///
/// Sensitivities net per (risk type, bucket, label) and are weighted by the
/// bucket risk weight. Within a bucket
/// `K = sqrt(sum WS^2 + rho * sum_{i != j} WS_i WS_j)`; within a risk class
/// `sum K_b^2 + sum_{b != c} gamma_bc K_b K_c`; risk classes add, and the
/// initial margin is the square root of that total.
pub fn calculate_simm_with(
    input: &SimmInput,
    params: &SimmParameters,
) -> CcrMarginResult<ComputationOutput<SimmOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    tracing::debug!(
        netting_set = %input.netting_set.id,
        trades = input.trades.len(),
        "computing SIMM initial margin"
    );

    input.netting_set.validate()?;
    validate_trades(&input.trades, input.valuation_date)?;
    validate_collateral(&input.collateral)?;

    let net = net_sensitivities(&input.trades, params, &mut warnings)?;

    let mut risk_class_margins = Vec::with_capacity(net.len());
    let mut risk_factor_contributions = Vec::new();
    let mut matrices = Vec::new();
    let mut gross_margin = Decimal::ZERO;

    for (risk_type, buckets) in &net {
        let table = lookup_table(params, *risk_type, "risk_type")?;

        let mut bucket_margins = Vec::with_capacity(buckets.len());
        for (bucket, labels) in buckets {
            let rw = table.risk_weight(*bucket).unwrap_or_default();
            let rho = table.intra_correlation(*bucket).unwrap_or_default();

            let mut weighted: Vec<Money> = Vec::with_capacity(labels.len());
            for (label, s) in labels {
                let ws = checked_product(
                    &[rw, *s],
                    &format!("Weighted sensitivity of {:?} bucket {} '{}'", risk_type, bucket, label),
                )?;
                weighted.push(ws);
                risk_factor_contributions.push(RiskFactorContribution {
                    risk_type: *risk_type,
                    bucket: *bucket,
                    label: label.clone(),
                    net_sensitivity: *s,
                    risk_weight: rw,
                    weighted_sensitivity: ws,
                });
            }

            let sum: Money = weighted.iter().copied().sum();
            let k = correlated_norm(&weighted, |i, j| if i == j { Decimal::ONE } else { rho })?;
            gross_margin += k;

            bucket_margins.push(BucketMargin {
                bucket: *bucket,
                margin: k,
                weighted_sensitivity_sum: sum,
                risk_factor_count: labels.len(),
            });
        }

        let margin = risk_class_margin(table, &bucket_margins)?;

        if input.include_correlation_matrix {
            matrices.push(correlation_block(*risk_type, table, &bucket_margins));
        }
        risk_class_margins.push(RiskClassMargin {
            risk_type: *risk_type,
            margin,
            buckets: bucket_margins,
        });
    }

    let class_margins: Vec<Money> = risk_class_margins.iter().map(|m| m.margin).collect();
    let initial_margin = correlated_norm(&class_margins, |i, j| {
        if i == j {
            Decimal::ONE
        } else {
            Decimal::ZERO
        }
    })?;
    let diversification_benefit = (gross_margin - initial_margin).max(Decimal::ZERO);
    let collateral_value = total_stressed(&input.collateral);
    let net_initial_margin = (initial_margin - collateral_value).max(Decimal::ZERO);

    if net.is_empty() {
        warnings.push("No sensitivities supplied; initial margin is zero.".into());
    }

    let output = SimmOutput {
        initial_margin,
        net_initial_margin,
        gross_margin,
        diversification_benefit,
        collateral_value,
        risk_class_margins,
        risk_factor_contributions,
        correlation_matrix: input.include_correlation_matrix.then_some(matrices),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "risk_measure": "delta only",
        "netting": "sensitivities net per (risk type, bucket, label)",
        "cross_risk_class": "additive under the square root",
        "collateral": "stressed haircuts",
    });

    Ok(with_metadata(
        "ISDA SIMM Initial Margin (delta)",
        &params.version,
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn lookup_table<'a>(
    params: &'a SimmParameters,
    risk_type: RiskType,
    field: &str,
) -> CcrMarginResult<&'a RiskClassTable> {
    params.table(risk_type).ok_or_else(|| {
        CcrMarginError::invalid(
            field,
            format!("No SIMM table for risk type {:?}.", risk_type),
        )
    })
}

/// Check every sensitivity against the tables and net those sharing a
/// risk factor.
fn net_sensitivities(
    trades: &[Trade],
    params: &SimmParameters,
    warnings: &mut Vec<String>,
) -> CcrMarginResult<NetSensitivities> {
    let mut net: NetSensitivities = BTreeMap::new();
    for (i, trade) in trades.iter().enumerate() {
        let sensitivities = &trade.terms().sensitivities;
        if sensitivities.is_empty() {
            warnings.push(format!(
                "Trade '{}' has no sensitivities and contributes nothing.",
                trade.id()
            ));
            continue;
        }
        for (j, rf) in sensitivities.iter().enumerate() {
            let field = |f: &str| format!("trades[{}:{}].sensitivities[{}].{}", i, trade.id(), j, f);
            let table = lookup_table(params, rf.risk_type, &field("risk_type"))?;
            if table.risk_weight(rf.bucket).is_none() {
                return Err(CcrMarginError::invalid(
                    field("bucket"),
                    format!(
                        "Bucket {} outside 1..={} for {:?}.",
                        rf.bucket,
                        table.bucket_count(),
                        rf.risk_type
                    ),
                ));
            }
            *net.entry(rf.risk_type)
                .or_default()
                .entry(rf.bucket)
                .or_default()
                .entry(rf.label.clone())
                .or_default() += rf.sensitivity;
        }
    }
    Ok(net)
}

/// sqrt(sum_b sum_c gamma_bc K_b K_c) over the buckets carrying risk.
fn check_risk_type_names(value: &Value) -> CcrMarginResult<()> {
    let trades = value
        .get("trades")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (i, trade) in trades.iter().enumerate() {
        let id = trade.get("id").and_then(Value::as_str).unwrap_or_default();
        let sensitivities = trade
            .get("sensitivities")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for (j, rf) in sensitivities.iter().enumerate() {
            let Some(name) = rf.get("risk_type").and_then(Value::as_str) else {
                continue;
            };
            if RiskType::from_name(name).is_none() {
                let known: Vec<&str> = RiskType::ALL.iter().map(RiskType::name).collect();
                return Err(CcrMarginError::invalid(
                    format!("trades[{}:{}].sensitivities[{}].risk_type", i, id, j),
                    format!("Unknown SIMM risk type '{}'; expected one of {}.", name, known.join(", ")),
                ));
            }
        }
    }
    Ok(())
}

fn risk_class_margin(table: &RiskClassTable, buckets: &[BucketMargin]) -> CcrMarginResult<Money> {
    let margins: Vec<Money> = buckets.iter().map(|b| b.margin).collect();
    correlated_norm(&margins, |i, j| {
        table
            .inter_correlation(buckets[i].bucket, buckets[j].bucket)
            .unwrap_or_default()
    })
}

fn correlation_block(
    risk_type: RiskType,
    table: &RiskClassTable,
    buckets: &[BucketMargin],
) -> CorrelationMatrix {
    let ids: Vec<u32> = buckets.iter().map(|b| b.bucket).collect();
    let matrix = ids
        .iter()
        .map(|b| {
            ids.iter()
                .map(|c| table.inter_correlation(*b, *c).unwrap_or_default())
                .collect()
        })
        .collect();
    CorrelationMatrix {
        risk_type,
        buckets: ids,
        matrix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::risk_factor::RiskFactor;
    use crate::model::trade::{InterestRateTrade, PositionType, TradeTerms, TransactionType};
    use crate::types::Currency;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn rf(risk_type: RiskType, bucket: u32, label: &str, sensitivity: Decimal) -> RiskFactor {
        RiskFactor {
            risk_type,
            bucket,
            label: label.into(),
            sensitivity,
        }
    }

    fn trade(id: &str, sensitivities: Vec<RiskFactor>) -> Trade {
        Trade::InterestRate(InterestRateTrade {
            terms: TradeTerms {
                id: id.into(),
                transaction_type: TransactionType::Swap,
                position: PositionType::Long,
                notional: dec!(1000000),
                currency: Currency::USD,
                maturity_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                start_date: None,
                market_value: Decimal::ZERO,
                sensitivities,
            },
            reference_index: "SOFR".into(),
            basis_index: None,
        })
    }

    fn input(trades: Vec<Trade>) -> SimmInput {
        SimmInput {
            netting_set: NettingSet::unmargined("NS-SIMM"),
            trades,
            collateral: vec![],
            valuation_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            include_correlation_matrix: false,
        }
    }

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.01)
    }

    #[test]
    fn test_single_sensitivity() {
        let i = input(vec![trade("T1", vec![rf(RiskType::InterestRate, 1, "5y", dec!(1000))])]);
        let out = calculate_simm(&i).unwrap().result;
        assert!(close(out.initial_margin, dec!(58000)), "{}", out.initial_margin);
        assert!(out.diversification_benefit.abs() < dec!(0.01));
        assert_eq!(out.risk_factor_contributions[0].weighted_sensitivity, dec!(58000));
    }

    #[test]
    fn test_intra_bucket_correlation() {
        let i = input(vec![trade(
            "T1",
            vec![
                rf(RiskType::InterestRate, 1, "2y", dec!(1000)),
                rf(RiskType::InterestRate, 1, "10y", dec!(1000)),
            ],
        )]);
        let out = calculate_simm(&i).unwrap().result;
        // 58000 * sqrt(2 + 0.5 * 2)
        assert!(close(out.initial_margin, dec!(100458.95)), "{}", out.initial_margin);
    }

    #[test]
    fn test_inter_bucket_diversification() {
        let i = input(vec![trade(
            "T1",
            vec![
                rf(RiskType::Equity, 1, "ACME", dec!(100)),
                rf(RiskType::Equity, 2, "GLOBEX", dec!(100)),
            ],
        )]);
        let out = calculate_simm(&i).unwrap().result;
        // sqrt(3000^2 + 3300^2 + 2 * 0.18 * 3000 * 3300)
        assert!(close(out.initial_margin, dec!(4842.93)), "{}", out.initial_margin);
        assert!(close(out.gross_margin, dec!(6300)));
        assert!(out.diversification_benefit > Decimal::ZERO);
    }

    #[test]
    fn test_risk_classes_add_under_root() {
        let i = input(vec![trade(
            "T1",
            vec![
                rf(RiskType::InterestRate, 1, "5y", dec!(1000)),
                rf(RiskType::Fx, 1, "EURUSD", dec!(1000)),
            ],
        )]);
        let out = calculate_simm(&i).unwrap().result;
        assert!(close(out.initial_margin, dec!(58470.16)), "{}", out.initial_margin);
        assert_eq!(out.risk_class_margins.len(), 2);
    }

    #[test]
    fn test_same_label_nets_across_trades() {
        let i = input(vec![
            trade("T1", vec![rf(RiskType::InterestRate, 2, "5y", dec!(1000))]),
            trade("T2", vec![rf(RiskType::InterestRate, 2, "5y", dec!(-1000))]),
        ]);
        let out = calculate_simm(&i).unwrap().result;
        assert_eq!(out.initial_margin, Decimal::ZERO);
        assert_eq!(out.risk_factor_contributions.len(), 1);
    }

    #[test]
    fn test_bucket_out_of_range_rejected() {
        let i = input(vec![trade("T1", vec![rf(RiskType::InterestRate, 4, "5y", dec!(1))])]);
        match calculate_simm(&i).unwrap_err() {
            CcrMarginError::InvalidInput { field, .. } => {
                assert_eq!(field, "trades[0:T1].sensitivities[0].bucket")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_risk_class_table_rejected() {
        let mut params = SimmParameters::default();
        params.risk_classes.remove(&RiskType::Commodity);
        let i = input(vec![trade("T1", vec![rf(RiskType::Commodity, 1, "WTI", dec!(1))])]);
        assert!(matches!(
            calculate_simm_with(&i, &params).unwrap_err(),
            CcrMarginError::InvalidInput { .. }
        ));
    }

    #[test]
    fn test_trades_without_sensitivities_warn() {
        let output = calculate_simm(&input(vec![trade("T1", vec![])])).unwrap();
        assert_eq!(output.result.initial_margin, Decimal::ZERO);
        assert!(output.warnings.iter().any(|w| w.contains("T1")));
    }

    #[test]
    fn test_collateral_and_correlation_matrix() {
        let mut i = input(vec![trade(
            "T1",
            vec![
                rf(RiskType::Equity, 1, "ACME", dec!(100)),
                rf(RiskType::Equity, 3, "INITECH", dec!(100)),
            ],
        )]);
        i.include_correlation_matrix = true;
        i.collateral = vec![Collateral {
            amount: dec!(1000),
            currency: Currency::USD,
            haircut: Decimal::ZERO,
            stressed_haircut: None,
        }];
        let out = calculate_simm(&i).unwrap().result;
        assert_eq!(out.net_initial_margin, out.initial_margin - dec!(1000));
        let matrices = out.correlation_matrix.unwrap();
        assert_eq!(matrices[0].buckets, vec![1, 3]);
        assert_eq!(matrices[0].matrix[0][1], dec!(0.18));
        assert_eq!(matrices[0].matrix[1][1], Decimal::ONE);
    }
}
