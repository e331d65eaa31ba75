use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CcrMarginError;
use crate::math::exp_decimal;
use crate::types::Money;
use crate::CcrMarginResult;

/// Whether the netting set is covered by a variation-margin agreement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginType {
    #[default]
    Unmargined,
    Margined,
}

/// Trades covered by a single legal netting agreement, with its CSA terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NettingSet {
    pub id: String,
    #[serde(default)]
    pub margin_type: MarginType,
    /// Only meaningful for margined sets
    #[serde(default)]
    pub threshold: Money,
    /// Only meaningful for margined sets
    #[serde(default)]
    pub minimum_transfer_amount: Money,
    /// Net independent collateral amount (NICA)
    #[serde(default)]
    pub independent_collateral_amount: Money,
    /// Variation margin held; counted towards collateral for margined sets
    #[serde(default)]
    pub variation_margin: Money,
    /// Margin period of risk in business days
    #[serde(default = "default_margin_period_of_risk")]
    pub margin_period_of_risk: u32,
}

fn default_margin_period_of_risk() -> u32 {
    10
}

impl NettingSet {
    pub fn unmargined(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            margin_type: MarginType::Unmargined,
            threshold: Decimal::ZERO,
            minimum_transfer_amount: Decimal::ZERO,
            independent_collateral_amount: Decimal::ZERO,
            variation_margin: Decimal::ZERO,
            margin_period_of_risk: default_margin_period_of_risk(),
        }
    }

    pub fn is_margined(&self) -> bool {
        self.margin_type == MarginType::Margined
    }

    pub fn validate(&self) -> CcrMarginResult<()> {
        if self.margin_period_of_risk == 0 {
            return Err(CcrMarginError::invalid(
                "netting_set.margin_period_of_risk",
                "Margin period of risk must be positive.",
            ));
        }
        if self.threshold < Decimal::ZERO {
            return Err(CcrMarginError::invalid(
                "netting_set.threshold",
                "Threshold cannot be negative.",
            ));
        }
        if self.minimum_transfer_amount < Decimal::ZERO {
            return Err(CcrMarginError::invalid(
                "netting_set.minimum_transfer_amount",
                "Minimum transfer amount cannot be negative.",
            ));
        }
        if self.independent_collateral_amount < Decimal::ZERO {
            return Err(CcrMarginError::invalid(
                "netting_set.independent_collateral_amount",
                "Independent collateral amount cannot be negative.",
            ));
        }
        Ok(())
    }

    /// Collateral C used in RC and the multiplier: haircut-adjusted
    /// collateral, plus variation margin for margined sets.
    pub fn collateral_held(&self, collateral_after_haircut: Money) -> Money {
        if self.is_margined() {
            collateral_after_haircut + self.variation_margin
        } else {
            collateral_after_haircut
        }
    }

    /// Replacement cost for net market value `v` and collateral `c`.
    ///
    /// Unmargined: max(V - C, 0). Margined: max(V - C, TH + MTA - NICA, 0).
    pub fn replacement_cost(&self, v: Money, c: Money) -> Money {
        let current = (v - c).max(Decimal::ZERO);
        match self.margin_type {
            MarginType::Unmargined => current,
            MarginType::Margined => {
                let margin_terms = self.threshold + self.minimum_transfer_amount
                    - self.independent_collateral_amount;
                current.max(margin_terms)
            }
        }
    }

    /// Threshold/MTA carried on an unmargined set have no effect.
    pub(crate) fn ignored_terms_warning(&self) -> Option<String> {
        if !self.is_margined()
            && (!self.threshold.is_zero() || !self.minimum_transfer_amount.is_zero())
        {
            Some(format!(
                "Netting set '{}' is unmargined; threshold and MTA are ignored.",
                self.id
            ))
        } else {
            None
        }
    }
}

/// PFE multiplier: min(1, F + (1 - F) * exp(X / (2 * (1 - F) * AddOn))),
/// where X = V - C. A zero add-on gives 1.
pub fn pfe_multiplier(v_minus_c: Money, add_on: Money, floor: Decimal) -> Decimal {
    if add_on <= Decimal::ZERO || v_minus_c >= Decimal::ZERO {
        // exp(x) >= 1 for x >= 0, so the cap binds
        return Decimal::ONE;
    }
    let one_minus_floor = Decimal::ONE - floor;
    let exponent = v_minus_c / (Decimal::TWO * one_minus_floor * add_on);
    (floor + one_minus_floor * exp_decimal(exponent)).min(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_from_json() {
        let ns: NettingSet = serde_json::from_str(r#"{"id": "NS1"}"#).unwrap();
        assert_eq!(ns.margin_type, MarginType::Unmargined);
        assert_eq!(ns.margin_period_of_risk, 10);
        assert!(ns.validate().is_ok());
    }

    #[test]
    fn test_margined_from_json() {
        let ns: NettingSet = serde_json::from_str(
            r#"{"id": "NS2", "margin_type": "MARGINED", "threshold": "1000", "margin_period_of_risk": 20}"#,
        )
        .unwrap();
        assert!(ns.is_margined());
        assert_eq!(ns.threshold, dec!(1000));
        assert_eq!(ns.margin_period_of_risk, 20);
    }

    #[test]
    fn test_zero_mpor_rejected() {
        let mut ns = NettingSet::unmargined("NS");
        ns.margin_period_of_risk = 0;
        let err = ns.validate().unwrap_err();
        assert!(matches!(err, CcrMarginError::InvalidInput { ref field, .. } if field == "netting_set.margin_period_of_risk"));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut ns = NettingSet::unmargined("NS");
        ns.threshold = dec!(-1);
        assert!(ns.validate().is_err());
    }

    #[test]
    fn test_unmargined_replacement_cost() {
        let ns = NettingSet::unmargined("NS");
        assert_eq!(ns.replacement_cost(dec!(100), dec!(30)), dec!(70));
        assert_eq!(ns.replacement_cost(dec!(100), dec!(300)), Decimal::ZERO);
    }

    #[test]
    fn test_margined_replacement_cost_uses_margin_terms() {
        let mut ns = NettingSet::unmargined("NS");
        ns.margin_type = MarginType::Margined;
        ns.threshold = dec!(1000);
        ns.minimum_transfer_amount = dec!(200);
        ns.independent_collateral_amount = dec!(100);
        // V - C = 50 < TH + MTA - NICA = 1100
        assert_eq!(ns.replacement_cost(dec!(150), dec!(100)), dec!(1100));
        // Large NICA pushes margin terms below zero
        ns.independent_collateral_amount = dec!(5000);
        assert_eq!(ns.replacement_cost(dec!(0), dec!(100)), Decimal::ZERO);
    }

    #[test]
    fn test_collateral_held_adds_vm_for_margined_only() {
        let mut ns = NettingSet::unmargined("NS");
        ns.variation_margin = dec!(400);
        assert_eq!(ns.collateral_held(dec!(100)), dec!(100));
        ns.margin_type = MarginType::Margined;
        assert_eq!(ns.collateral_held(dec!(100)), dec!(500));
    }

    #[test]
    fn test_multiplier_is_one_for_zero_add_on() {
        assert_eq!(pfe_multiplier(dec!(-1000), Decimal::ZERO, dec!(0.05)), Decimal::ONE);
    }

    #[test]
    fn test_multiplier_capped_at_one_when_in_the_money() {
        assert_eq!(pfe_multiplier(dec!(50000), dec!(216500), dec!(0.05)), Decimal::ONE);
    }

    #[test]
    fn test_multiplier_bounded_by_floor() {
        let m = pfe_multiplier(dec!(-1000000), dec!(1000), dec!(0.05));
        assert!(m >= dec!(0.05) && m < dec!(0.0501));
        let m = pfe_multiplier(dec!(-100000), dec!(216500), dec!(0.05));
        // 0.05 + 0.95 * exp(-100000 / 411350)
        assert!((m - dec!(0.79498)).abs() < dec!(0.0001), "got {}", m);
    }

    #[test]
    fn test_ignored_terms_warning_only_when_unmargined() {
        let mut ns = NettingSet::unmargined("NS");
        ns.threshold = dec!(500);
        assert!(ns.ignored_terms_warning().is_some());
        ns.margin_type = MarginType::Margined;
        assert!(ns.ignored_terms_warning().is_none());
    }
}
