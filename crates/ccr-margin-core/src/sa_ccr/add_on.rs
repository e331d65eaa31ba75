use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::parameters::SaCcrParameters;
use crate::math::{checked_product, correlated_norm, exp_decimal, sqrt_decimal};
use crate::model::maturity::MaturityBucket;
use crate::model::netting_set::NettingSet;
use crate::model::trade::{
    is_inverted_currency_pair, normalised_currency_pair, AssetClass, Trade,
};
use crate::types::{Money, Rate};
use crate::CcrMarginResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Per-trade SA-CCR building blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAddOn {
    pub trade_id: String,
    pub asset_class: AssetClass,
    pub hedging_set: String,
    /// Maturity bucket (rates), entity (credit/equity) or subtype (commodity)
    pub component: String,
    /// Supervisory duration; only for rates and credit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisory_duration: Option<Decimal>,
    pub adjusted_notional: Money,
    pub maturity_factor: Decimal,
    pub delta: Decimal,
    pub supervisory_factor: Rate,
    /// delta * adjusted notional * MF * SF (signed)
    pub add_on: Money,
}

/// Add-on of one hedging set after intra-set aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgingSetAddOn {
    pub asset_class: AssetClass,
    pub hedging_set: String,
    pub trade_count: usize,
    pub add_on: Money,
}

/// A trade's add-on with the correlation its component carries in the
/// single-factor aggregation (credit, equity, commodity).
pub(crate) struct ClassifiedTrade {
    pub detail: TradeAddOn,
    pub correlation: Decimal,
}

// ---------------------------------------------------------------------------
// Per-trade
// ---------------------------------------------------------------------------

/// Supervisory duration SD = (exp(-r*S) - exp(-r*E)) / r.
pub fn supervisory_duration(start_years: Decimal, end_years: Decimal, rate: Decimal) -> Decimal {
    (exp_decimal(-rate * start_years) - exp_decimal(-rate * end_years)) / rate
}

/// Maturity factor. Unmargined: sqrt(min(max(M, floor), 1)). Margined:
/// scalar * sqrt(MPOR / business days per year).
pub fn maturity_factor(
    netting_set: &NettingSet,
    residual_years: Decimal,
    params: &SaCcrParameters,
) -> Decimal {
    if netting_set.is_margined() {
        let mpor = Decimal::from(netting_set.margin_period_of_risk);
        params.margined_maturity_scalar * sqrt_decimal(mpor / params.business_days_per_year)
    } else {
        let floor = params.minimum_maturity_days / params.business_days_per_year;
        sqrt_decimal(residual_years.max(floor).min(Decimal::ONE))
    }
}

pub(crate) fn classify_trade(
    trade: &Trade,
    netting_set: &NettingSet,
    valuation_date: NaiveDate,
    params: &SaCcrParameters,
) -> CcrMarginResult<ClassifiedTrade> {
    let terms = trade.terms();
    let start = trade.start_years(valuation_date);
    let end = trade.end_years(valuation_date);
    let mf = maturity_factor(netting_set, end, params);
    let mut delta = trade.delta();

    let (hedging_set, component, supervisory_factor, duration, correlation) = match trade {
        Trade::InterestRate(ir) => {
            let bucket = MaturityBucket::from_years(end);
            let (hs, sf) = match &ir.basis_index {
                Some(basis) => (
                    format!("{}:{}/{}", terms.currency, ir.reference_index, basis),
                    params.interest_rate.supervisory_factor * params.interest_rate.basis_scalar,
                ),
                None => (
                    terms.currency.code().to_string(),
                    params.interest_rate.supervisory_factor,
                ),
            };
            let sd = supervisory_duration(start, end, params.duration_rate);
            (hs, bucket.label().to_string(), sf, Some(sd), Decimal::ONE)
        }
        Trade::ForeignExchange(fx) => {
            // validate() has already rejected malformed pairs
            let pair = normalised_currency_pair(&fx.currency_pair)
                .unwrap_or_else(|| fx.currency_pair.to_uppercase());
            if is_inverted_currency_pair(&fx.currency_pair) {
                delta = -delta;
            }
            (pair.clone(), pair, params.fx_supervisory_factor, None, Decimal::ONE)
        }
        Trade::Credit(c) => {
            let (sf, rho, entity) = if c.is_index {
                let sf = if c.credit_quality.is_investment_grade() {
                    params.credit.index_investment_grade
                } else {
                    params.credit.index_speculative_grade
                };
                (sf, params.credit.index_correlation, format!("index:{}", c.reference_entity))
            } else {
                (
                    params.credit_single_name_factor(c.credit_quality)?,
                    params.credit.single_name_correlation,
                    c.reference_entity.clone(),
                )
            };
            let sd = supervisory_duration(start, end, params.duration_rate);
            ("CREDIT".to_string(), entity, sf, Some(sd), rho)
        }
        Trade::Equity(e) => {
            let (sf, rho, entity) = if e.is_index {
                (params.equity.index, params.equity.index_correlation, format!("index:{}", e.issuer))
            } else {
                (params.equity.single_name, params.equity.single_name_correlation, e.issuer.clone())
            };
            ("EQUITY".to_string(), entity, sf, None, rho)
        }
        Trade::Commodity(c) => (
            format!("{:?}", c.commodity_type).to_uppercase(),
            format!("{:?}", c.commodity_subtype).to_uppercase(),
            params.commodity_factor(c.commodity_subtype)?,
            None,
            params.commodity.correlation,
        ),
    };

    let adjusted_notional = match duration {
        Some(sd) => checked_product(&[terms.notional, sd], "Adjusted notional")?,
        None => terms.notional,
    };
    let add_on = checked_product(
        &[delta, adjusted_notional, mf, supervisory_factor],
        &format!("Add-on of trade '{}'", terms.id),
    )?;

    Ok(ClassifiedTrade {
        detail: TradeAddOn {
            trade_id: terms.id.clone(),
            asset_class: trade.asset_class(),
            hedging_set,
            component,
            supervisory_duration: duration,
            adjusted_notional,
            maturity_factor: mf,
            delta,
            supervisory_factor,
            add_on,
        },
        correlation,
    })
}

// ---------------------------------------------------------------------------
// Hedging-set aggregation
// ---------------------------------------------------------------------------

/// Aggregate classified trades into hedging-set add-ons, ordered by asset
/// class then hedging set name.
pub(crate) fn aggregate_hedging_sets(
    trades: &[ClassifiedTrade],
    params: &SaCcrParameters,
) -> CcrMarginResult<Vec<HedgingSetAddOn>> {
    let mut groups: BTreeMap<(AssetClass, &str), Vec<&ClassifiedTrade>> = BTreeMap::new();
    for t in trades {
        groups
            .entry((t.detail.asset_class, t.detail.hedging_set.as_str()))
            .or_default()
            .push(t);
    }

    groups
        .into_iter()
        .map(|((asset_class, hedging_set), members)| {
            let add_on = match asset_class {
                AssetClass::InterestRate => interest_rate_hedging_set(&members, params)?,
                AssetClass::ForeignExchange => {
                    members.iter().map(|t| t.detail.add_on).sum::<Decimal>().abs()
                }
                AssetClass::Credit | AssetClass::Equity | AssetClass::Commodity => {
                    single_factor_hedging_set(&members)?
                }
            };
            Ok(HedgingSetAddOn {
                asset_class,
                hedging_set: hedging_set.to_string(),
                trade_count: members.len(),
                add_on,
            })
        })
        .collect()
}

/// Rates: net add-ons per maturity bucket, then
/// sqrt(D1² + D2² + D3² + 2ρa·D1D2 + 2ρa·D2D3 + 2ρo·D1D3).
fn interest_rate_hedging_set(
    members: &[&ClassifiedTrade],
    params: &SaCcrParameters,
) -> CcrMarginResult<Money> {
    let mut buckets: BTreeMap<&str, Decimal> = BTreeMap::new();
    for t in members {
        *buckets.entry(t.detail.component.as_str()).or_default() += t.detail.add_on;
    }
    let d = |b: MaturityBucket| buckets.get(b.label()).copied().unwrap_or_default();
    let effective = [
        d(MaturityBucket::UnderOneYear),
        d(MaturityBucket::OneToFiveYears),
        d(MaturityBucket::OverFiveYears),
    ];

    let adjacent = params.interest_rate.adjacent_bucket_correlation;
    let outer = params.interest_rate.outer_bucket_correlation;
    correlated_norm(&effective, |i, j| match i.abs_diff(j) {
        0 => Decimal::ONE,
        1 => adjacent,
        _ => outer,
    })
}

/// Single-factor model: net per component, then
/// sqrt((Σ ρk·Ak)² + Σ (1 - ρk²)·Ak²).
fn single_factor_hedging_set(members: &[&ClassifiedTrade]) -> CcrMarginResult<Money> {
    let mut components: BTreeMap<&str, (Decimal, Decimal)> = BTreeMap::new();
    for t in members {
        let entry = components
            .entry(t.detail.component.as_str())
            .or_insert((Decimal::ZERO, t.correlation));
        entry.0 += t.detail.add_on;
    }

    // Expanded, the radicand is sum_k Ak² + sum_{k != l} ρk·ρl·Ak·Al
    let (add_ons, rhos): (Vec<Decimal>, Vec<Decimal>) = components.into_values().unzip();
    correlated_norm(&add_ons, |k, l| {
        if k == l {
            Decimal::ONE
        } else {
            rhos[k] * rhos[l]
        }
    })
}

/// Sum hedging sets per asset class; every class appears, zero if unused.
pub fn per_asset_class(hedging_sets: &[HedgingSetAddOn]) -> BTreeMap<AssetClass, Money> {
    let mut out: BTreeMap<AssetClass, Money> =
        AssetClass::ALL.iter().map(|ac| (*ac, Decimal::ZERO)).collect();
    for hs in hedging_sets {
        *out.entry(hs.asset_class).or_default() += hs.add_on;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use rust_decimal::prelude::Signed;

    fn classified(asset_class: AssetClass, component: &str, add_on: Decimal, rho: Decimal) -> ClassifiedTrade {
        ClassifiedTrade {
            detail: TradeAddOn {
                trade_id: format!("{}-{}", component, add_on),
                asset_class,
                hedging_set: "HS".into(),
                component: component.into(),
                supervisory_duration: None,
                adjusted_notional: add_on.abs(),
                maturity_factor: Decimal::ONE,
                delta: add_on.signum(),
                supervisory_factor: Decimal::ONE,
                add_on,
            },
            correlation: rho,
        }
    }

    #[test]
    fn test_supervisory_duration_five_years() {
        // (1 - e^-0.25) / 0.05 = 4.4240
        let sd = supervisory_duration(Decimal::ZERO, dec!(5), dec!(0.05));
        assert!((sd - dec!(4.42398)).abs() < dec!(0.0001), "got {}", sd);
    }

    #[test]
    fn test_supervisory_duration_same_day_is_zero() {
        assert_eq!(supervisory_duration(Decimal::ZERO, Decimal::ZERO, dec!(0.05)), Decimal::ZERO);
    }

    #[test]
    fn test_unmargined_maturity_factor_floor_and_cap() {
        let params = SaCcrParameters::default();
        let ns = NettingSet::unmargined("NS");
        assert_eq!(maturity_factor(&ns, dec!(7), &params), Decimal::ONE);
        let floored = maturity_factor(&ns, Decimal::ZERO, &params);
        // sqrt(10 / 250) = 0.2
        assert!((floored - dec!(0.2)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_margined_maturity_factor() {
        let params = SaCcrParameters::default();
        let mut ns = NettingSet::unmargined("NS");
        ns.margin_type = crate::model::netting_set::MarginType::Margined;
        let mf = maturity_factor(&ns, dec!(7), &params);
        // 1.5 * sqrt(10 / 250) = 0.3
        assert!((mf - dec!(0.3)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_single_factor_fully_correlated_is_linear() {
        let a = classified(AssetClass::Equity, "A", dec!(300), Decimal::ONE);
        let b = classified(AssetClass::Equity, "B", dec!(400), Decimal::ONE);
        let got = single_factor_hedging_set(&[&a, &b]).unwrap();
        assert!((got - dec!(700)).abs() < dec!(0.0000001), "got {}", got);
    }

    #[test]
    fn test_single_factor_partial_correlation() {
        let a = classified(AssetClass::Equity, "A", dec!(300), dec!(0.5));
        let b = classified(AssetClass::Equity, "B", dec!(400), dec!(0.5));
        // (0.5*700)^2 + 0.75*(300^2 + 400^2) = 122500 + 187500 = 310000
        let expected = dec!(556.77643);
        assert!((single_factor_hedging_set(&[&a, &b]).unwrap() - expected).abs() < dec!(0.001));
    }

    #[test]
    fn test_same_entity_offsets_net() {
        let a = classified(AssetClass::Credit, "ACME", dec!(500), dec!(0.5));
        let b = classified(AssetClass::Credit, "ACME", dec!(-500), dec!(0.5));
        assert_eq!(single_factor_hedging_set(&[&a, &b]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_rates_bucket_correlation() {
        let params = SaCcrParameters::default();
        let short = classified(AssetClass::InterestRate, "<1y", dec!(100), Decimal::ONE);
        let long = classified(AssetClass::InterestRate, ">5y", dec!(100), Decimal::ONE);
        // sqrt(100^2 + 100^2 + 0.6 * 100 * 100) = sqrt(26000)
        let got = interest_rate_hedging_set(&[&short, &long], &params).unwrap();
        assert!((got - dec!(161.24515)).abs() < dec!(0.001), "got {}", got);
    }

    #[test]
    fn test_single_factor_large_add_ons_do_not_overflow() {
        // Squares of these add-ons exceed the decimal range
        let a = classified(AssetClass::Equity, "A", dec!(300000000000000000), dec!(0.5));
        let b = classified(AssetClass::Equity, "B", dec!(400000000000000000), dec!(0.5));
        let got = single_factor_hedging_set(&[&a, &b]).unwrap();
        // Same shape as the 300/400 case, scaled by 1e15
        let expected = dec!(556.77643) * dec!(1000000000000000);
        assert!(((got - expected) / expected).abs() < dec!(0.000001), "got {}", got);
    }

    #[test]
    fn test_rates_large_bucket_add_ons_do_not_overflow() {
        let params = SaCcrParameters::default();
        let short = classified(AssetClass::InterestRate, "<1y", dec!(100000000000000000), Decimal::ONE);
        let long = classified(AssetClass::InterestRate, ">5y", dec!(100000000000000000), Decimal::ONE);
        let got = interest_rate_hedging_set(&[&short, &long], &params).unwrap();
        let expected = dec!(161.24515) * dec!(1000000000000000);
        assert!(((got - expected) / expected).abs() < dec!(0.000001), "got {}", got);
    }

    #[test]
    fn test_per_asset_class_fills_all_classes() {
        let hs = vec![HedgingSetAddOn {
            asset_class: AssetClass::Credit,
            hedging_set: "CREDIT".into(),
            trade_count: 1,
            add_on: dec!(10),
        }];
        let map = per_asset_class(&hs);
        assert_eq!(map.len(), 5);
        assert_eq!(map[&AssetClass::Credit], dec!(10));
        assert_eq!(map[&AssetClass::Equity], Decimal::ZERO);
    }
}
