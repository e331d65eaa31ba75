use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::maturity::year_fraction;
use super::risk_factor::RiskFactor;
use crate::error::CcrMarginError;
use crate::types::{Currency, Money, Years};
use crate::CcrMarginResult;

// ---------------------------------------------------------------------------
// Taxonomies
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
    InterestRate,
    ForeignExchange,
    Credit,
    Equity,
    Commodity,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::InterestRate,
        AssetClass::ForeignExchange,
        AssetClass::Credit,
        AssetClass::Equity,
        AssetClass::Commodity,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Swap,
    Forward,
    Future,
    Spot,
    Option,
    Swaption,
    CreditDefaultSwap,
    TotalReturnSwap,
    Other,
}

impl TransactionType {
    pub fn is_option(&self) -> bool {
        matches!(self, TransactionType::Option | TransactionType::Swaption)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionType {
    Long,
    Short,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CreditQuality {
    AAA,
    AA,
    A,
    BBB,
    BB,
    B,
    CCC,
}

impl CreditQuality {
    pub fn is_investment_grade(&self) -> bool {
        matches!(
            self,
            CreditQuality::AAA | CreditQuality::AA | CreditQuality::A | CreditQuality::BBB
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Seniority {
    #[default]
    Senior,
    Subordinated,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommodityType {
    Energy,
    Metals,
    Agricultural,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommoditySubtype {
    Electricity,
    OilGas,
    PreciousMetals,
    BaseMetals,
    Grains,
    Softs,
    Livestock,
    Other,
}

// ---------------------------------------------------------------------------
// Trade variants
// ---------------------------------------------------------------------------

/// Terms every trade carries regardless of asset class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTerms {
    pub id: String,
    pub transaction_type: TransactionType,
    pub position: PositionType,
    /// Must be strictly positive
    pub notional: Money,
    #[serde(default)]
    pub currency: Currency,
    pub maturity_date: NaiveDate,
    /// Defaults to the valuation date when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    pub market_value: Money,
    /// Delta sensitivities consumed by the SIMM engine
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensitivities: Vec<RiskFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestRateTrade {
    #[serde(flatten)]
    pub terms: TradeTerms,
    pub reference_index: String,
    /// Second floating index for basis swaps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis_index: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxTrade {
    #[serde(flatten)]
    pub terms: TradeTerms,
    /// e.g. "EURUSD" or "EUR/USD"
    pub currency_pair: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTrade {
    #[serde(flatten)]
    pub terms: TradeTerms,
    pub reference_entity: String,
    #[serde(default)]
    pub seniority: Seniority,
    #[serde(default)]
    pub sector: String,
    pub credit_quality: CreditQuality,
    #[serde(default)]
    pub is_index: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityTrade {
    #[serde(flatten)]
    pub terms: TradeTerms,
    pub issuer: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub is_index: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityTrade {
    #[serde(flatten)]
    pub terms: TradeTerms,
    pub commodity_type: CommodityType,
    pub commodity_subtype: CommoditySubtype,
}

/// A derivative trade, one variant per asset class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "asset_class", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trade {
    InterestRate(InterestRateTrade),
    ForeignExchange(FxTrade),
    Credit(CreditTrade),
    Equity(EquityTrade),
    Commodity(CommodityTrade),
}

impl Trade {
    pub fn terms(&self) -> &TradeTerms {
        match self {
            Trade::InterestRate(t) => &t.terms,
            Trade::ForeignExchange(t) => &t.terms,
            Trade::Credit(t) => &t.terms,
            Trade::Equity(t) => &t.terms,
            Trade::Commodity(t) => &t.terms,
        }
    }

    pub fn asset_class(&self) -> AssetClass {
        match self {
            Trade::InterestRate(_) => AssetClass::InterestRate,
            Trade::ForeignExchange(_) => AssetClass::ForeignExchange,
            Trade::Credit(_) => AssetClass::Credit,
            Trade::Equity(_) => AssetClass::Equity,
            Trade::Commodity(_) => AssetClass::Commodity,
        }
    }

    pub fn id(&self) -> &str {
        &self.terms().id
    }

    /// Supervisory delta: +1 long, -1 short. Options are not priced, so
    /// their delta carries the same sign convention.
    pub fn delta(&self) -> Decimal {
        match self.terms().position {
            PositionType::Long => Decimal::ONE,
            PositionType::Short => -Decimal::ONE,
        }
    }

    pub fn start_date_or(&self, valuation_date: NaiveDate) -> NaiveDate {
        self.terms().start_date.unwrap_or(valuation_date)
    }

    /// Years from valuation to start, floored at zero (S in CRE52).
    pub fn start_years(&self, valuation_date: NaiveDate) -> Years {
        year_fraction(valuation_date, self.start_date_or(valuation_date)).max(Decimal::ZERO)
    }

    /// Years from valuation to maturity, floored at zero (E / M in CRE52).
    pub fn end_years(&self, valuation_date: NaiveDate) -> Years {
        year_fraction(valuation_date, self.terms().maturity_date).max(Decimal::ZERO)
    }

    pub fn validate(&self, index: usize, valuation_date: NaiveDate) -> CcrMarginResult<()> {
        let terms = self.terms();
        let field = |name: &str| format!("trades[{}:{}].{}", index, terms.id, name);

        if terms.id.trim().is_empty() {
            return Err(CcrMarginError::invalid(
                format!("trades[{}].id", index),
                "Trade id cannot be empty.",
            ));
        }
        if terms.notional <= Decimal::ZERO {
            return Err(CcrMarginError::invalid(
                field("notional"),
                "Notional must be strictly positive.",
            ));
        }
        if terms.maturity_date < self.start_date_or(valuation_date) {
            return Err(CcrMarginError::invalid(
                field("maturity_date"),
                "Maturity date cannot precede the start date.",
            ));
        }
        if let Trade::ForeignExchange(fx) = self {
            if normalised_currency_pair(&fx.currency_pair).is_none() {
                return Err(CcrMarginError::invalid(
                    field("currency_pair"),
                    "Currency pair must be two 3-letter codes, e.g. EURUSD.",
                ));
            }
        }
        Ok(())
    }
}

/// Validate a trade list: non-empty and every trade well-formed.
pub fn validate_trades(trades: &[Trade], valuation_date: NaiveDate) -> CcrMarginResult<()> {
    if trades.is_empty() {
        return Err(CcrMarginError::invalid(
            "trades",
            "At least one trade is required.",
        ));
    }
    for (i, t) in trades.iter().enumerate() {
        t.validate(i, valuation_date)?;
    }
    Ok(())
}

/// "EUR/USD", "usdeur" and "EURUSD" all map to "EURUSD" so that both
/// directions of a pair share a hedging set.
pub fn normalised_currency_pair(pair: &str) -> Option<String> {
    let cleaned: String = pair
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase();
    if cleaned.len() != 6 {
        return None;
    }
    let (a, b) = cleaned.split_at(3);
    if a == b {
        return None;
    }
    Some(if a <= b {
        format!("{}{}", a, b)
    } else {
        format!("{}{}", b, a)
    })
}

/// True when the pair is quoted against the normalised order, e.g. "USDEUR".
/// A long on an inverted pair is a short on the normalised one.
pub fn is_inverted_currency_pair(pair: &str) -> bool {
    match normalised_currency_pair(pair) {
        Some(normalised) => {
            let cleaned: String = pair
                .chars()
                .filter(|c| c.is_ascii_alphabetic())
                .collect::<String>()
                .to_uppercase();
            cleaned != normalised
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_deserialise_interest_rate_trade() {
        let json = r#"{
            "asset_class": "INTEREST_RATE",
            "id": "IRS-1",
            "transaction_type": "SWAP",
            "position": "LONG",
            "notional": "10000000",
            "currency": "USD",
            "maturity_date": "2030-01-01",
            "market_value": "50000",
            "reference_index": "SOFR"
        }"#;
        let trade: Trade = serde_json::from_str(json).unwrap();
        assert_eq!(trade.asset_class(), AssetClass::InterestRate);
        assert_eq!(trade.id(), "IRS-1");
        assert_eq!(trade.terms().notional, dec!(10000000));
        assert!(trade.terms().start_date.is_none());
        assert!(trade.terms().sensitivities.is_empty());
    }

    #[test]
    fn test_deserialise_credit_trade_with_sensitivities() {
        let json = r#"{
            "asset_class": "CREDIT",
            "id": "CDS-1",
            "transaction_type": "CREDIT_DEFAULT_SWAP",
            "position": "SHORT",
            "notional": 5000000,
            "maturity_date": "2029-06-20",
            "market_value": -1200,
            "reference_entity": "ACME",
            "credit_quality": "BBB",
            "sensitivities": [
                {"risk_type": "credit_qualifying", "bucket": 3, "label": "ACME-5y", "sensitivity": 2500}
            ]
        }"#;
        let trade: Trade = serde_json::from_str(json).unwrap();
        assert_eq!(trade.delta(), dec!(-1));
        assert_eq!(trade.terms().sensitivities.len(), 1);
        match trade {
            Trade::Credit(c) => {
                assert_eq!(c.credit_quality, CreditQuality::BBB);
                assert!(!c.is_index);
            }
            _ => panic!("expected credit trade"),
        }
    }

    #[test]
    fn test_unknown_asset_class_rejected() {
        let json = r#"{"asset_class": "WEATHER", "id": "X"}"#;
        assert!(serde_json::from_str::<Trade>(json).is_err());
    }

    #[test]
    fn test_unknown_risk_type_rejected() {
        let json = r#"{
            "asset_class": "EQUITY",
            "id": "EQ-1",
            "transaction_type": "FORWARD",
            "position": "LONG",
            "notional": 100,
            "maturity_date": "2027-01-01",
            "market_value": 0,
            "issuer": "X",
            "sensitivities": [{"risk_type": "inflation", "bucket": 1, "label": "x", "sensitivity": 1}]
        }"#;
        assert!(serde_json::from_str::<Trade>(json).is_err());
    }

    #[test]
    fn test_normalised_currency_pair() {
        assert_eq!(normalised_currency_pair("EUR/USD").as_deref(), Some("EURUSD"));
        assert_eq!(normalised_currency_pair("usdeur").as_deref(), Some("EURUSD"));
        assert!(normalised_currency_pair("EURO").is_none());
        assert!(normalised_currency_pair("USDUSD").is_none());
    }

    #[test]
    fn test_inverted_currency_pair() {
        assert!(!is_inverted_currency_pair("EUR/USD"));
        assert!(is_inverted_currency_pair("usd/eur"));
        assert!(!is_inverted_currency_pair("bad"));
    }

    #[test]
    fn test_year_helpers_floor_at_zero() {
        let json = r#"{"asset_class": "EQUITY", "id": "E", "transaction_type": "FORWARD", "position": "LONG",
            "notional": 1, "maturity_date": "2026-01-01", "start_date": "2024-01-01",
            "market_value": 0, "issuer": "X"}"#;
        let trade: Trade = serde_json::from_str(json).unwrap();
        let val = d(2025, 1, 1);
        assert_eq!(trade.start_years(val), Decimal::ZERO);
        assert_eq!(trade.end_years(val), Decimal::ONE);
    }
}
