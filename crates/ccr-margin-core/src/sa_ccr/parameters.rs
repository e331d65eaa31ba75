use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::CcrMarginError;
use crate::model::trade::{CommoditySubtype, CreditQuality};
use crate::types::Rate;
use crate::CcrMarginResult;

/// Interest-rate supervisory parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestRateFactors {
    pub supervisory_factor: Rate,
    /// Scalar applied to the factor for basis-swap hedging sets
    pub basis_scalar: Decimal,
    /// Correlation between adjacent maturity buckets (<1y/1-5y, 1-5y/>5y)
    pub adjacent_bucket_correlation: Decimal,
    /// Correlation between the outer buckets (<1y/>5y)
    pub outer_bucket_correlation: Decimal,
}

/// Credit supervisory parameters, by rating for single names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditFactors {
    pub single_name: BTreeMap<CreditQuality, Rate>,
    pub index_investment_grade: Rate,
    pub index_speculative_grade: Rate,
    pub single_name_correlation: Decimal,
    pub index_correlation: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityFactors {
    pub single_name: Rate,
    pub index: Rate,
    pub single_name_correlation: Decimal,
    pub index_correlation: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityFactors {
    pub by_subtype: BTreeMap<CommoditySubtype, Rate>,
    /// Correlation between subtypes within a commodity-type hedging set
    pub correlation: Decimal,
}

/// Regulatory constants for the SA-CCR engine. Swapping the table changes
/// the framework version without touching the algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaCcrParameters {
    pub version: String,
    pub alpha: Decimal,
    pub multiplier_floor: Decimal,
    /// Rate used in the supervisory duration
    pub duration_rate: Decimal,
    pub business_days_per_year: Decimal,
    /// Floor on residual maturity for unmargined maturity factors
    pub minimum_maturity_days: Decimal,
    /// Scalar on sqrt(MPOR / year) for margined maturity factors
    pub margined_maturity_scalar: Decimal,
    pub interest_rate: InterestRateFactors,
    pub fx_supervisory_factor: Rate,
    pub credit: CreditFactors,
    pub equity: EquityFactors,
    pub commodity: CommodityFactors,
}

impl Default for SaCcrParameters {
    fn default() -> Self {
        let single_name = BTreeMap::from([
            (CreditQuality::AAA, dec!(0.0038)),
            (CreditQuality::AA, dec!(0.0038)),
            (CreditQuality::A, dec!(0.0042)),
            (CreditQuality::BBB, dec!(0.0054)),
            (CreditQuality::BB, dec!(0.0106)),
            (CreditQuality::B, dec!(0.0160)),
            (CreditQuality::CCC, dec!(0.0600)),
        ]);
        let by_subtype = BTreeMap::from([
            (CommoditySubtype::Electricity, dec!(0.40)),
            (CommoditySubtype::OilGas, dec!(0.18)),
            (CommoditySubtype::PreciousMetals, dec!(0.18)),
            (CommoditySubtype::BaseMetals, dec!(0.18)),
            (CommoditySubtype::Grains, dec!(0.18)),
            (CommoditySubtype::Softs, dec!(0.18)),
            (CommoditySubtype::Livestock, dec!(0.18)),
            (CommoditySubtype::Other, dec!(0.18)),
        ]);
        Self {
            version: "Basel III SA-CCR (CRE52)".into(),
            alpha: dec!(1.4),
            multiplier_floor: dec!(0.05),
            duration_rate: dec!(0.05),
            business_days_per_year: dec!(250),
            minimum_maturity_days: dec!(10),
            margined_maturity_scalar: dec!(1.5),
            interest_rate: InterestRateFactors {
                supervisory_factor: dec!(0.005),
                basis_scalar: dec!(0.5),
                adjacent_bucket_correlation: dec!(0.7),
                outer_bucket_correlation: dec!(0.3),
            },
            fx_supervisory_factor: dec!(0.04),
            credit: CreditFactors {
                single_name,
                index_investment_grade: dec!(0.0038),
                index_speculative_grade: dec!(0.0106),
                single_name_correlation: dec!(0.5),
                index_correlation: dec!(0.8),
            },
            equity: EquityFactors {
                single_name: dec!(0.32),
                index: dec!(0.20),
                single_name_correlation: dec!(0.5),
                index_correlation: dec!(0.8),
            },
            commodity: CommodityFactors {
                by_subtype,
                correlation: dec!(0.4),
            },
        }
    }
}

impl SaCcrParameters {
    /// Process-wide default table, built once.
    pub fn basel_cre52() -> &'static SaCcrParameters {
        static PARAMS: OnceLock<SaCcrParameters> = OnceLock::new();
        PARAMS.get_or_init(SaCcrParameters::default)
    }

    pub fn from_json(json: &str) -> CcrMarginResult<Self> {
        let params: SaCcrParameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> CcrMarginResult<()> {
        if self.alpha <= Decimal::ZERO {
            return Err(CcrMarginError::invalid("parameters.alpha", "Alpha must be positive."));
        }
        if self.multiplier_floor <= Decimal::ZERO || self.multiplier_floor >= Decimal::ONE {
            return Err(CcrMarginError::invalid(
                "parameters.multiplier_floor",
                "Multiplier floor must be between 0 and 1 (exclusive).",
            ));
        }
        if self.duration_rate <= Decimal::ZERO {
            return Err(CcrMarginError::invalid(
                "parameters.duration_rate",
                "Duration rate must be positive.",
            ));
        }
        if self.business_days_per_year <= Decimal::ZERO {
            return Err(CcrMarginError::invalid(
                "parameters.business_days_per_year",
                "Business days per year must be positive.",
            ));
        }

        let mut factors: Vec<(String, Decimal)> = vec![
            ("interest_rate.supervisory_factor".into(), self.interest_rate.supervisory_factor),
            ("interest_rate.basis_scalar".into(), self.interest_rate.basis_scalar),
            ("fx_supervisory_factor".into(), self.fx_supervisory_factor),
            ("credit.index_investment_grade".into(), self.credit.index_investment_grade),
            ("credit.index_speculative_grade".into(), self.credit.index_speculative_grade),
            ("equity.single_name".into(), self.equity.single_name),
            ("equity.index".into(), self.equity.index),
        ];
        for (q, f) in &self.credit.single_name {
            factors.push((format!("credit.single_name.{:?}", q), *f));
        }
        for (s, f) in &self.commodity.by_subtype {
            factors.push((format!("commodity.by_subtype.{:?}", s), *f));
        }
        for (name, f) in factors {
            if f < Decimal::ZERO {
                return Err(CcrMarginError::invalid(
                    format!("parameters.{}", name),
                    "Supervisory factors cannot be negative.",
                ));
            }
        }

        let correlations = [
            ("interest_rate.adjacent_bucket_correlation", self.interest_rate.adjacent_bucket_correlation),
            ("interest_rate.outer_bucket_correlation", self.interest_rate.outer_bucket_correlation),
            ("credit.single_name_correlation", self.credit.single_name_correlation),
            ("credit.index_correlation", self.credit.index_correlation),
            ("equity.single_name_correlation", self.equity.single_name_correlation),
            ("equity.index_correlation", self.equity.index_correlation),
            ("commodity.correlation", self.commodity.correlation),
        ];
        for (name, rho) in correlations {
            if rho < Decimal::ZERO || rho > Decimal::ONE {
                return Err(CcrMarginError::invalid(
                    format!("parameters.{}", name),
                    "Correlations must be between 0 and 1.",
                ));
            }
        }
        Ok(())
    }

    pub fn credit_single_name_factor(&self, quality: CreditQuality) -> CcrMarginResult<Rate> {
        self.credit.single_name.get(&quality).copied().ok_or_else(|| {
            CcrMarginError::invalid(
                format!("parameters.credit.single_name.{:?}", quality),
                "No supervisory factor for this credit quality.",
            )
        })
    }

    pub fn commodity_factor(&self, subtype: CommoditySubtype) -> CcrMarginResult<Rate> {
        self.commodity.by_subtype.get(&subtype).copied().ok_or_else(|| {
            CcrMarginError::invalid(
                format!("parameters.commodity.by_subtype.{:?}", subtype),
                "No supervisory factor for this commodity subtype.",
            )
        })
    }
}
