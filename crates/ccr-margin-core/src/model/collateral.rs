use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CcrMarginError;
use crate::types::{Currency, Money, Rate};
use crate::CcrMarginResult;

/// Collateral held against the netting set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collateral {
    pub amount: Money,
    #[serde(default)]
    pub currency: Currency,
    /// Haircut as a fraction (0 to 1)
    #[serde(default)]
    pub haircut: Rate,
    /// Haircut under stressed conditions; PFE and IM engines fall back to
    /// `haircut` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stressed_haircut: Option<Rate>,
}

impl Collateral {
    pub fn value_after_haircut(&self) -> Money {
        self.amount * (Decimal::ONE - self.haircut)
    }

    pub fn stressed_value(&self) -> Money {
        self.amount * (Decimal::ONE - self.stressed_haircut.unwrap_or(self.haircut))
    }
}

pub fn validate_collateral(collateral: &[Collateral]) -> CcrMarginResult<()> {
    for (i, c) in collateral.iter().enumerate() {
        if c.amount < Decimal::ZERO {
            return Err(CcrMarginError::invalid(
                format!("collateral[{}].amount", i),
                "Collateral amount must be non-negative.",
            ));
        }
        if c.haircut < Decimal::ZERO || c.haircut > Decimal::ONE {
            return Err(CcrMarginError::invalid(
                format!("collateral[{}].haircut", i),
                "Haircut must be between 0 and 1.",
            ));
        }
        if let Some(h) = c.stressed_haircut {
            if h < Decimal::ZERO || h > Decimal::ONE {
                return Err(CcrMarginError::invalid(
                    format!("collateral[{}].stressed_haircut", i),
                    "Stressed haircut must be between 0 and 1.",
                ));
            }
        }
    }
    Ok(())
}

pub fn total_after_haircut(collateral: &[Collateral]) -> Money {
    collateral.iter().map(Collateral::value_after_haircut).sum()
}

pub fn total_stressed(collateral: &[Collateral]) -> Money {
    collateral.iter().map(Collateral::stressed_value).sum()
}
