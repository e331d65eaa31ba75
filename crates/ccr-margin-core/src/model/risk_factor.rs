use serde::{Deserialize, Serialize};

use crate::types::Money;

/// SIMM risk classes. Names outside this set fail deserialisation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    InterestRate,
    CreditQualifying,
    CreditNonQualifying,
    Equity,
    Commodity,
    Fx,
}

impl RiskType {
    pub const ALL: [RiskType; 6] = [
        RiskType::InterestRate,
        RiskType::CreditQualifying,
        RiskType::CreditNonQualifying,
        RiskType::Equity,
        RiskType::Commodity,
        RiskType::Fx,
    ];

    /// Wire name, as used in `risk_type` fields.
    pub fn name(&self) -> &'static str {
        match self {
            RiskType::InterestRate => "interest_rate",
            RiskType::CreditQualifying => "credit_qualifying",
            RiskType::CreditNonQualifying => "credit_non_qualifying",
            RiskType::Equity => "equity",
            RiskType::Commodity => "commodity",
            RiskType::Fx => "fx",
        }
    }

    pub fn from_name(name: &str) -> Option<RiskType> {
        RiskType::ALL.into_iter().find(|rt| rt.name() == name)
    }
}

/// A single delta sensitivity to a SIMM risk factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub risk_type: RiskType,
    /// 1-based bucket index into the risk-weight table
    pub bucket: u32,
    /// Risk factor label (tenor, issuer, currency, ...). Sensitivities with
    /// the same label in the same bucket net before aggregation.
    pub label: String,
    pub sensitivity: Money,
}
