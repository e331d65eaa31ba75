use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CcrMarginError;
use crate::types::{Currency, Money};
use crate::CcrMarginResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VarAssetType {
    Equity,
    ForeignExchange,
    InterestRate,
    Commodity,
    Crypto,
}

/// A holding whose value is revalued against historical price moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub asset_type: VarAssetType,
    /// Matches `HistoricalMarketData::asset_id`
    pub identifier: String,
    /// Signed: negative for short holdings
    pub quantity: Decimal,
    pub current_price: Money,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
}

impl Position {
    pub fn market_value(&self) -> Money {
        self.quantity * self.current_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Money,
    #[serde(default)]
    pub volume: Decimal,
}

/// Daily price history for one asset, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMarketData {
    pub asset_id: String,
    pub prices: Vec<PricePoint>,
}

impl HistoricalMarketData {
    pub fn validate(&self) -> CcrMarginResult<()> {
        for (i, p) in self.prices.iter().enumerate() {
            if p.price <= Decimal::ZERO {
                return Err(CcrMarginError::invalid(
                    format!("historical_data[{}].prices[{}].price", self.asset_id, i),
                    "Historical prices must be positive.",
                ));
            }
            if i > 0 && p.date <= self.prices[i - 1].date {
                return Err(CcrMarginError::invalid(
                    format!("historical_data[{}].prices[{}].date", self.asset_id, i),
                    "Price history must be strictly ascending by date.",
                ));
            }
        }
        Ok(())
    }

    /// Simple daily returns p[t]/p[t-1] - 1, oldest first.
    pub fn daily_returns(&self) -> Vec<Decimal> {
        self.prices
            .windows(2)
            .map(|w| w[1].price / w[0].price - Decimal::ONE)
            .collect()
    }
}
