use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::engine::{ReturnSeries, TailMeasures};
use crate::types::Money;

/// Position P&L per scenario: exposure * return, one row per position.
pub(crate) fn pnl_matrix(series: &[ReturnSeries<'_>]) -> Vec<Vec<Money>> {
    series
        .iter()
        .map(|s| s.returns.iter().map(|r| s.exposure * *r).collect())
        .collect()
}

/// Index of the VaR scenario in an ascending P&L sort: floor((1 - c) * n).
pub(crate) fn percentile_index(n: usize, confidence: Decimal) -> usize {
    let raw = ((Decimal::ONE - confidence) * Decimal::from(n as u64))
        .floor()
        .to_usize()
        .unwrap_or(0);
    raw.min(n.saturating_sub(1))
}

/// Tail of one P&L vector: (scenario index, percentile P&L, mean P&L at or
/// below the percentile).
fn tail_of(pnl: &[Money], confidence: Decimal) -> (usize, Money, Money) {
    if pnl.is_empty() {
        return (0, Decimal::ZERO, Decimal::ZERO);
    }
    let mut order: Vec<usize> = (0..pnl.len()).collect();
    order.sort_by(|a, b| pnl[*a].cmp(&pnl[*b]));
    let idx = percentile_index(pnl.len(), confidence);
    let tail_sum: Money = order[..=idx].iter().map(|i| pnl[*i]).sum();
    let tail_mean = tail_sum / Decimal::from(idx as u64 + 1);
    (order[idx], pnl[order[idx]], tail_mean)
}

fn loss(pnl: Money, scale: Decimal) -> Money {
    (-pnl).max(Decimal::ZERO) * scale
}

/// VaR, ES and contributions from a scenario P&L matrix.
///
/// Correlated (more than one position): percentile of the summed P&L, with
/// each position contributing its own loss in the VaR scenario. Otherwise
/// the standalone measures are summed.
pub(crate) fn tail_measures(
    pnl: &[Vec<Money>],
    confidence: Decimal,
    scale: Decimal,
    correlated: bool,
) -> TailMeasures {
    let observations = pnl.first().map(Vec::len).unwrap_or(0);

    let standalone_tails: Vec<(Money, Money)> = pnl
        .iter()
        .map(|row| {
            let (_, pct, mean) = tail_of(row, confidence);
            (loss(pct, scale), loss(mean, scale))
        })
        .collect();
    let standalone: Vec<Money> = standalone_tails.iter().map(|(v, _)| *v).collect();

    if !correlated || pnl.len() < 2 {
        return TailMeasures {
            var: standalone.iter().copied().sum(),
            expected_shortfall: standalone_tails.iter().map(|(_, es)| *es).sum(),
            contributions: standalone.clone(),
            standalone,
            observations,
        };
    }

    let portfolio: Vec<Money> = (0..observations)
        .map(|t| pnl.iter().map(|row| row[t]).sum())
        .collect();
    let (scenario, pct, mean) = tail_of(&portfolio, confidence);

    let contributions = if pct < Decimal::ZERO {
        pnl.iter().map(|row| -row[scenario] * scale).collect()
    } else {
        vec![Decimal::ZERO; pnl.len()]
    };

    TailMeasures {
        var: loss(pct, scale),
        expected_shortfall: loss(mean, scale),
        contributions,
        standalone,
        observations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percentile_index() {
        assert_eq!(percentile_index(100, dec!(0.95)), 5);
        assert_eq!(percentile_index(100, dec!(0.99)), 1);
        assert_eq!(percentile_index(10, dec!(0.95)), 0);
        assert_eq!(percentile_index(1, dec!(0.90)), 0);
    }

    #[test]
    fn test_standalone_tail() {
        let pnl = vec![vec![dec!(5), dec!(-10), dec!(3), dec!(-2), dec!(1), dec!(-7), dec!(0), dec!(2), dec!(4), dec!(-1)]];
        let t = tail_measures(&pnl, dec!(0.90), Decimal::ONE, true);
        // n = 10, index 1 -> -7; ES = mean(-10, -7)
        assert_eq!(t.var, dec!(7));
        assert_eq!(t.expected_shortfall, dec!(8.5));
        assert_eq!(t.observations, 10);
    }

    #[test]
    fn test_gains_only_give_zero_var() {
        let pnl = vec![vec![dec!(1), dec!(2), dec!(3)]];
        let t = tail_measures(&pnl, dec!(0.95), Decimal::ONE, true);
        assert_eq!(t.var, Decimal::ZERO);
        assert_eq!(t.expected_shortfall, Decimal::ZERO);
    }

    #[test]
    fn test_component_contributions_sum_to_var() {
        let pnl = vec![
            vec![dec!(-4), dec!(1), dec!(2), dec!(-1)],
            vec![dec!(-3), dec!(2), dec!(-6), dec!(0)],
        ];
        // Portfolio: -7, 3, -4, -1 -> worst is day 0
        let t = tail_measures(&pnl, dec!(0.95), Decimal::ONE, true);
        assert_eq!(t.var, dec!(7));
        assert_eq!(t.contributions, vec![dec!(4), dec!(3)]);
        assert_eq!(t.standalone, vec![dec!(4), dec!(6)]);
    }

    #[test]
    fn test_uncorrelated_sums_standalone() {
        let pnl = vec![
            vec![dec!(-4), dec!(1), dec!(2), dec!(-1)],
            vec![dec!(-3), dec!(2), dec!(-6), dec!(0)],
        ];
        let t = tail_measures(&pnl, dec!(0.95), Decimal::ONE, false);
        assert_eq!(t.var, dec!(10));
        assert_eq!(t.contributions, t.standalone);
    }
}
