//! Raw sums and the ratios derived from them.
//!
//! A zero denominator yields a defined `0.0`, never an error or `NaN`.

use crate::types::{DerivedBundle, MetricsBundle, Row};
use crate::util::round2;

/// Sum cost, target, revenue and receivables over `rows`. Empty input sums to zero.
pub fn aggregate<'a, I>(rows: I) -> MetricsBundle
where
    I: IntoIterator<Item = &'a Row>,
{
    rows.into_iter().fold(MetricsBundle::default(), |mut acc, r| {
        acc.cost += r.cost;
        acc.target += r.target;
        acc.revenue += r.revenue;
        acc.receivables_collected += r.receivables_collected;
        acc
    })
}

fn pct(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        round2(numerator / denominator * 100.0)
    } else {
        0.0
    }
}

/// Achievement, gross profit and collection rate, each rounded with [`round2`].
pub fn derive(m: &MetricsBundle) -> DerivedBundle {
    DerivedBundle {
        achievement_pct: pct(m.revenue, m.target),
        gross_profit_pct: pct(m.revenue - m.cost, m.revenue),
        collection_rate_pct: pct(m.receivables_collected, m.revenue),
    }
}
