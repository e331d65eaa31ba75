use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Rate, Years};

/// ACT/365 fixed.
pub const DAYS_PER_YEAR: Decimal = dec!(365);

/// Serde default for input valuation dates: today's UTC date, resolved
/// when the input is deserialised so the engines themselves stay pure.
pub fn default_valuation_date() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Signed year fraction between two dates (ACT/365).
pub fn year_fraction(from: NaiveDate, to: NaiveDate) -> Years {
    Decimal::from((to - from).num_days()) / DAYS_PER_YEAR
}

/// Residual-maturity bucket shared by the schedule tables and the SA-CCR
/// interest-rate hedging sets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum MaturityBucket {
    #[serde(rename = "<1y")]
    UnderOneYear,
    #[serde(rename = "1-5y")]
    OneToFiveYears,
    #[serde(rename = ">5y")]
    OverFiveYears,
}

impl MaturityBucket {
    /// Exactly one and exactly five years fall in the middle bucket.
    pub fn from_years(years: Years) -> Self {
        if years < Decimal::ONE {
            MaturityBucket::UnderOneYear
        } else if years <= dec!(5) {
            MaturityBucket::OneToFiveYears
        } else {
            MaturityBucket::OverFiveYears
        }
    }

    pub fn from_dates(valuation_date: NaiveDate, maturity_date: NaiveDate) -> Self {
        Self::from_years(year_fraction(valuation_date, maturity_date))
    }

    pub fn label(&self) -> &'static str {
        match self {
            MaturityBucket::UnderOneYear => "<1y",
            MaturityBucket::OneToFiveYears => "1-5y",
            MaturityBucket::OverFiveYears => ">5y",
        }
    }
}

/// One rate per maturity bucket; used by the schedule-style tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketRates {
    pub under_one_year: Rate,
    pub one_to_five_years: Rate,
    pub over_five_years: Rate,
}

impl BucketRates {
    pub const fn new(under_one_year: Rate, one_to_five_years: Rate, over_five_years: Rate) -> Self {
        Self {
            under_one_year,
            one_to_five_years,
            over_five_years,
        }
    }

    /// Same rate for every bucket.
    pub const fn flat(rate: Rate) -> Self {
        Self::new(rate, rate, rate)
    }

    pub fn rate(&self, bucket: MaturityBucket) -> Rate {
        match bucket {
            MaturityBucket::UnderOneYear => self.under_one_year,
            MaturityBucket::OneToFiveYears => self.one_to_five_years,
            MaturityBucket::OverFiveYears => self.over_five_years,
        }
    }

    pub fn is_non_negative(&self) -> bool {
        self.under_one_year >= Decimal::ZERO
            && self.one_to_five_years >= Decimal::ZERO
            && self.over_five_years >= Decimal::ZERO
    }
}
