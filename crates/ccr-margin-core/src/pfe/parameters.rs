use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::CcrMarginError;
use crate::model::maturity::{BucketRates, MaturityBucket};
use crate::model::trade::{CommoditySubtype, Trade};
use crate::types::Rate;
use crate::CcrMarginResult;

/// Add-on factor table for the simplified PFE engine (current-exposure
/// method shape: notional times a factor per asset class and tenor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PfeParameters {
    pub version: String,
    pub interest_rate: BucketRates,
    pub foreign_exchange: BucketRates,
    pub credit_investment_grade: BucketRates,
    pub credit_speculative_grade: BucketRates,
    pub equity: BucketRates,
    pub commodity: BucketRates,
    pub precious_metals: BucketRates,
    /// Share of gross add-on that is always recognised (0.4)
    pub gross_weight: Decimal,
    pub multiplier_floor: Decimal,
}

impl Default for PfeParameters {
    fn default() -> Self {
        Self {
            version: "CEM add-on factors (Basel II Annex 4)".into(),
            interest_rate: BucketRates::new(dec!(0.0), dec!(0.005), dec!(0.015)),
            foreign_exchange: BucketRates::new(dec!(0.01), dec!(0.05), dec!(0.075)),
            credit_investment_grade: BucketRates::flat(dec!(0.05)),
            credit_speculative_grade: BucketRates::flat(dec!(0.10)),
            equity: BucketRates::new(dec!(0.06), dec!(0.08), dec!(0.10)),
            commodity: BucketRates::new(dec!(0.10), dec!(0.12), dec!(0.15)),
            precious_metals: BucketRates::new(dec!(0.07), dec!(0.07), dec!(0.08)),
            gross_weight: dec!(0.4),
            multiplier_floor: dec!(0.05),
        }
    }
}

impl PfeParameters {
    pub fn cem() -> &'static PfeParameters {
        static PARAMS: OnceLock<PfeParameters> = OnceLock::new();
        PARAMS.get_or_init(PfeParameters::default)
    }

    pub fn from_json(json: &str) -> CcrMarginResult<Self> {
        let params: PfeParameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> CcrMarginResult<()> {
        let tables = [
            ("interest_rate", &self.interest_rate),
            ("foreign_exchange", &self.foreign_exchange),
            ("credit_investment_grade", &self.credit_investment_grade),
            ("credit_speculative_grade", &self.credit_speculative_grade),
            ("equity", &self.equity),
            ("commodity", &self.commodity),
            ("precious_metals", &self.precious_metals),
        ];
        for (name, table) in tables {
            if !table.is_non_negative() {
                return Err(CcrMarginError::invalid(
                    format!("parameters.{}", name),
                    "Add-on factors cannot be negative.",
                ));
            }
        }
        if self.gross_weight < Decimal::ZERO || self.gross_weight > Decimal::ONE {
            return Err(CcrMarginError::invalid(
                "parameters.gross_weight",
                "Gross weight must be between 0 and 1.",
            ));
        }
        if self.multiplier_floor <= Decimal::ZERO || self.multiplier_floor >= Decimal::ONE {
            return Err(CcrMarginError::invalid(
                "parameters.multiplier_floor",
                "Multiplier floor must be between 0 and 1 (exclusive).",
            ));
        }
        Ok(())
    }

    /// Add-on factor for a trade in the given residual-maturity bucket.
    pub fn factor(&self, trade: &Trade, bucket: MaturityBucket) -> Rate {
        let table = match trade {
            Trade::InterestRate(_) => &self.interest_rate,
            Trade::ForeignExchange(_) => &self.foreign_exchange,
            Trade::Credit(c) if c.credit_quality.is_investment_grade() => {
                &self.credit_investment_grade
            }
            Trade::Credit(_) => &self.credit_speculative_grade,
            Trade::Equity(_) => &self.equity,
            Trade::Commodity(c) if c.commodity_subtype == CommoditySubtype::PreciousMetals => {
                &self.precious_metals
            }
            Trade::Commodity(_) => &self.commodity,
        };
        table.rate(bucket)
    }
}
