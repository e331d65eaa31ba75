use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::CcrMarginError;
use crate::model::risk_factor::RiskType;
use crate::CcrMarginResult;

/// Correlation between buckets of one risk class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterBucketCorrelation {
    /// Same correlation for every pair of distinct buckets
    Uniform(Decimal),
    /// Full symmetric matrix, indexed by bucket - 1
    Matrix(Vec<Vec<Decimal>>),
}

/// Delta risk weights and correlations for one risk class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskClassTable {
    /// Risk weight per bucket; element 0 is bucket 1
    pub risk_weights: Vec<Decimal>,
    /// Correlation between distinct labels in a bucket. A single element
    /// applies to every bucket.
    pub intra_bucket_correlations: Vec<Decimal>,
    pub inter_bucket: InterBucketCorrelation,
}

impl RiskClassTable {
    fn new(
        risk_weights: Vec<Decimal>,
        intra_bucket_correlations: Vec<Decimal>,
        gamma: Decimal,
    ) -> Self {
        Self {
            risk_weights,
            intra_bucket_correlations,
            inter_bucket: InterBucketCorrelation::Uniform(gamma),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.risk_weights.len()
    }

    fn index(&self, bucket: u32) -> Option<usize> {
        let idx = (bucket as usize).checked_sub(1)?;
        (idx < self.bucket_count()).then_some(idx)
    }

    pub fn risk_weight(&self, bucket: u32) -> Option<Decimal> {
        self.index(bucket).map(|i| self.risk_weights[i])
    }

    pub fn intra_correlation(&self, bucket: u32) -> Option<Decimal> {
        let i = self.index(bucket)?;
        match self.intra_bucket_correlations.as_slice() {
            [single] => Some(*single),
            all => all.get(i).copied(),
        }
    }

    /// Gamma between two buckets; 1 on the diagonal.
    pub fn inter_correlation(&self, b: u32, c: u32) -> Option<Decimal> {
        let (i, j) = (self.index(b)?, self.index(c)?);
        if i == j {
            return Some(Decimal::ONE);
        }
        match &self.inter_bucket {
            InterBucketCorrelation::Uniform(g) => Some(*g),
            InterBucketCorrelation::Matrix(m) => m.get(i).and_then(|row| row.get(j)).copied(),
        }
    }

    fn validate(&self, name: &str) -> CcrMarginResult<()> {
        let field = |f: &str| format!("parameters.{}.{}", name, f);
        let n = self.bucket_count();
        if n == 0 {
            return Err(CcrMarginError::invalid(field("risk_weights"), "At least one bucket is required."));
        }
        if self.risk_weights.iter().any(|w| *w < Decimal::ZERO) {
            return Err(CcrMarginError::invalid(field("risk_weights"), "Risk weights cannot be negative."));
        }
        let intra_len = self.intra_bucket_correlations.len();
        if intra_len != 1 && intra_len != n {
            return Err(CcrMarginError::invalid(
                field("intra_bucket_correlations"),
                format!("Expected 1 or {} correlations, found {}.", n, intra_len),
            ));
        }
        let in_range = |r: &Decimal| *r >= -Decimal::ONE && *r <= Decimal::ONE;
        if !self.intra_bucket_correlations.iter().all(in_range) {
            return Err(CcrMarginError::invalid(
                field("intra_bucket_correlations"),
                "Correlations must lie in [-1, 1].",
            ));
        }
        match &self.inter_bucket {
            InterBucketCorrelation::Uniform(g) if !in_range(g) => Err(CcrMarginError::invalid(
                field("inter_bucket"),
                "Correlations must lie in [-1, 1].",
            )),
            InterBucketCorrelation::Matrix(m) => {
                if m.len() != n || m.iter().any(|row| row.len() != n) {
                    return Err(CcrMarginError::invalid(
                        field("inter_bucket"),
                        format!("Correlation matrix must be {}x{}.", n, n),
                    ));
                }
                for i in 0..n {
                    for j in 0..n {
                        if !in_range(&m[i][j]) || m[i][j] != m[j][i] {
                            return Err(CcrMarginError::invalid(
                                field("inter_bucket"),
                                "Correlation matrix must be symmetric with entries in [-1, 1].",
                            ));
                        }
                    }
                }
                Ok(())
            }
            InterBucketCorrelation::Uniform(_) => Ok(()),
        }
    }
}

/// SIMM delta calibration keyed by risk class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimmParameters {
    pub version: String,
    pub risk_classes: BTreeMap<RiskType, RiskClassTable>,
}

impl Default for SimmParameters {
    /// Delta-only calibration in the shape of ISDA SIMM v2.6. Weights and
    /// correlations are rounded, representative values rather than the
    /// licensed table.
    fn default() -> Self {
        let interest_rate = RiskClassTable::new(
            vec![dec!(58), dec!(20), dec!(91)],
            vec![dec!(0.5)],
            dec!(0.32),
        );
        let credit_qualifying = RiskClassTable::new(
            vec![
                dec!(75), dec!(90), dec!(84), dec!(54), dec!(62), dec!(48),
                dec!(185), dec!(343), dec!(255), dec!(250), dec!(214), dec!(173),
            ],
            vec![dec!(0.46)],
            dec!(0.38),
        );
        let credit_non_qualifying =
            RiskClassTable::new(vec![dec!(280), dec!(1300)], vec![dec!(0.82)], dec!(0.16));
        let equity = RiskClassTable::new(
            vec![
                dec!(30), dec!(33), dec!(36), dec!(29), dec!(26), dec!(25),
                dec!(34), dec!(28), dec!(36), dec!(50), dec!(19), dec!(19),
            ],
            vec![
                dec!(0.18), dec!(0.20), dec!(0.28), dec!(0.24), dec!(0.25), dec!(0.36),
                dec!(0.35), dec!(0.37), dec!(0.23), dec!(0.27), dec!(0.45), dec!(0.45),
            ],
            dec!(0.18),
        );
        let commodity = RiskClassTable::new(
            vec![
                dec!(48), dec!(29), dec!(33), dec!(25), dec!(35), dec!(30), dec!(60),
                dec!(52), dec!(68), dec!(63), dec!(21), dec!(21), dec!(15), dec!(16),
                dec!(13), dec!(58), dec!(17),
            ],
            vec![
                dec!(0.83), dec!(0.97), dec!(0.93), dec!(0.97), dec!(0.98), dec!(0.90),
                dec!(0.98), dec!(0.49), dec!(0.80), dec!(0.46), dec!(0.58), dec!(0.53),
                dec!(0.62), dec!(0.16), dec!(0.18), dec!(0.00), dec!(0.38),
            ],
            dec!(0.20),
        );
        let fx = RiskClassTable::new(vec![dec!(7.4)], vec![dec!(0.5)], Decimal::ZERO);

        Self {
            version: "ISDA SIMM v2.6 (delta, representative calibration)".into(),
            risk_classes: BTreeMap::from([
                (RiskType::InterestRate, interest_rate),
                (RiskType::CreditQualifying, credit_qualifying),
                (RiskType::CreditNonQualifying, credit_non_qualifying),
                (RiskType::Equity, equity),
                (RiskType::Commodity, commodity),
                (RiskType::Fx, fx),
            ]),
        }
    }
}

impl SimmParameters {
    pub fn v2_6() -> &'static SimmParameters {
        static PARAMS: OnceLock<SimmParameters> = OnceLock::new();
        PARAMS.get_or_init(SimmParameters::default)
    }

    pub fn from_json(json: &str) -> CcrMarginResult<Self> {
        let params: SimmParameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> CcrMarginResult<()> {
        for (risk_type, table) in &self.risk_classes {
            table.validate(&format!("{:?}", risk_type))?;
        }
        Ok(())
    }

    pub fn table(&self, risk_type: RiskType) -> Option<&RiskClassTable> {
        self.risk_classes.get(&risk_type)
    }
}
