use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::CcrMarginError;
use crate::model::maturity::{BucketRates, MaturityBucket};
use crate::model::trade::AssetClass;
use crate::types::Rate;
use crate::CcrMarginResult;

/// Standardised initial-margin schedule: percentage of notional by asset
/// class and residual maturity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridScheduleParameters {
    pub version: String,
    pub interest_rate: BucketRates,
    pub credit: BucketRates,
    pub foreign_exchange: BucketRates,
    pub equity: BucketRates,
    pub commodity: BucketRates,
    /// Share of gross margin that cannot be netted away (0.4)
    pub gross_weight: Decimal,
}

impl Default for GridScheduleParameters {
    fn default() -> Self {
        Self {
            version: "BCBS-IOSCO Margin Requirements, Appendix A schedule".into(),
            interest_rate: BucketRates::new(dec!(0.01), dec!(0.02), dec!(0.04)),
            credit: BucketRates::new(dec!(0.02), dec!(0.05), dec!(0.10)),
            foreign_exchange: BucketRates::flat(dec!(0.06)),
            equity: BucketRates::flat(dec!(0.15)),
            commodity: BucketRates::flat(dec!(0.15)),
            gross_weight: dec!(0.4),
        }
    }
}

impl GridScheduleParameters {
    pub fn bcbs_iosco() -> &'static GridScheduleParameters {
        static PARAMS: OnceLock<GridScheduleParameters> = OnceLock::new();
        PARAMS.get_or_init(GridScheduleParameters::default)
    }

    pub fn from_json(json: &str) -> CcrMarginResult<Self> {
        let params: GridScheduleParameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> CcrMarginResult<()> {
        for asset_class in AssetClass::ALL {
            if !self.table(asset_class).is_non_negative() {
                return Err(CcrMarginError::invalid(
                    format!("parameters.{:?}", asset_class),
                    "Schedule percentages cannot be negative.",
                ));
            }
        }
        if self.gross_weight < Decimal::ZERO || self.gross_weight > Decimal::ONE {
            return Err(CcrMarginError::invalid(
                "parameters.gross_weight",
                "Gross weight must be between 0 and 1.",
            ));
        }
        Ok(())
    }

    fn table(&self, asset_class: AssetClass) -> &BucketRates {
        match asset_class {
            AssetClass::InterestRate => &self.interest_rate,
            AssetClass::ForeignExchange => &self.foreign_exchange,
            AssetClass::Credit => &self.credit,
            AssetClass::Equity => &self.equity,
            AssetClass::Commodity => &self.commodity,
        }
    }

    pub fn rate(&self, asset_class: AssetClass, bucket: MaturityBucket) -> Rate {
        self.table(asset_class).rate(bucket)
    }
}
