use crate::kpi::{percent_change, round1, PercentChange, TimelinePoint};
use crate::periods::{ComparisonWindows, ReportingWindow};
use crate::schema::{ProductRow, DEFAULT_TOP_N};
use chrono::NaiveDate;
use log::warn;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// One product's standing within the current comparison window.
///
/// Shares are of the *full* catalog's window revenue, so the shares of the
/// reported top-N subset do not themselves sum to 100.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedProduct {
    pub product_id: String,
    pub product_name: String,
    pub category: Option<String>,
    pub current_revenue: f64,
    pub prior_revenue: f64,
    pub change: PercentChange,
    pub current_share: f64,
    pub prior_share: f64,
    /// Daily share of that day's total revenue over the rolling horizon.
    pub share_timeline: Vec<TimelinePoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRanking {
    pub top: Vec<RankedProduct>,
    pub ranked_products: usize,
    pub current_total: f64,
    pub prior_total: f64,
}

#[derive(Default)]
struct ProductTotals {
    name: String,
    category: Option<String>,
    current: f64,
    prior: f64,
    daily: BTreeMap<NaiveDate, f64>,
}

fn share(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        round1(value / total * 100.0)
    }
}

/// Ranks products by current-window revenue, descending. Ties keep source
/// iteration order (stable sort). A non-positive `top_n` falls back to the
/// default of 5.
#[must_use]
pub fn rank_products(
    rows: &[ProductRow],
    windows: &ComparisonWindows,
    rolling_days: u32,
    top_n: i64,
) -> ProductRanking {
    let top_n = if top_n > 0 {
        top_n as usize
    } else {
        warn!("Invalid top-N {}, falling back to {}", top_n, DEFAULT_TOP_N);
        DEFAULT_TOP_N
    };

    let horizon = windows.rolling_horizon(rolling_days);

    // First-seen order doubles as the ranking tie-break.
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, ProductTotals> = HashMap::new();
    let mut daily_total: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for row in rows {
        let entry = totals.entry(row.product_id.clone()).or_insert_with(|| {
            order.push(row.product_id.clone());
            ProductTotals {
                name: row.product_name.clone(),
                category: row.category.clone(),
                ..ProductTotals::default()
            }
        });
        if windows.current.contains(row.date) {
            entry.current += row.revenue;
        }
        if windows.prior.contains(row.date) {
            entry.prior += row.revenue;
        }
        if horizon.contains(row.date) {
            *entry.daily.entry(row.date).or_insert(0.0) += row.revenue;
            *daily_total.entry(row.date).or_insert(0.0) += row.revenue;
        }
    }

    let current_total: f64 = totals.values().map(|t| t.current).sum();
    let prior_total: f64 = totals.values().map(|t| t.prior).sum();

    let mut ranked: Vec<&String> = order.iter().collect();
    ranked.sort_by(|a, b| {
        let a_rev = totals[*a].current;
        let b_rev = totals[*b].current;
        b_rev.partial_cmp(&a_rev).unwrap_or(Ordering::Equal)
    });

    let top = ranked
        .iter()
        .take(top_n)
        .map(|id| {
            let entry = &totals[*id];
            let share_timeline = entry
                .daily
                .iter()
                .map(|(date, revenue)| TimelinePoint {
                    date: *date,
                    value: share(*revenue, daily_total.get(date).copied().unwrap_or(0.0)),
                })
                .collect();
            RankedProduct {
                product_id: (*id).clone(),
                product_name: entry.name.clone(),
                category: entry.category.clone(),
                current_revenue: round1(entry.current),
                prior_revenue: round1(entry.prior),
                change: percent_change(entry.prior, entry.current),
                current_share: share(entry.current, current_total),
                prior_share: share(entry.prior, prior_total),
                share_timeline,
            }
        })
        .collect();

    ProductRanking {
        top,
        ranked_products: order.len(),
        current_total: round1(current_total),
        prior_total: round1(prior_total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn windows() -> ComparisonWindows {
        ComparisonWindows::for_date(date(2024, 5, 15))
    }

    fn row(d: NaiveDate, id: &str, revenue: f64) -> ProductRow {
        ProductRow {
            date: d,
            product_id: id.to_string(),
            product_name: format!("Product {}", id),
            category: None,
            revenue,
            quantity: 1,
        }
    }

    #[test]
    fn test_ranking_by_current_window_revenue() {
        let rows = vec![
            row(date(2024, 5, 6), "a", 100.0),
            row(date(2024, 5, 6), "b", 300.0),
            row(date(2024, 5, 7), "c", 200.0),
            // Prior-window revenue must not affect the ranking
            row(date(2024, 4, 29), "a", 900.0),
        ];

        let ranking = rank_products(&rows, &windows(), 60, 2);
        let ids: Vec<&str> = ranking.top.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(ranking.ranked_products, 3);
    }

    #[test]
    fn test_ties_keep_source_order() {
        let rows = vec![
            row(date(2024, 5, 6), "first", 100.0),
            row(date(2024, 5, 6), "second", 100.0),
        ];
        let ranking = rank_products(&rows, &windows(), 60, 5);
        assert_eq!(ranking.top[0].product_id, "first");
        assert_eq!(ranking.top[1].product_id, "second");
    }

    #[test]
    fn test_invalid_top_n_falls_back() {
        let rows = vec![
            row(date(2024, 5, 6), "a", 1.0),
            row(date(2024, 5, 6), "b", 2.0),
            row(date(2024, 5, 6), "c", 3.0),
            row(date(2024, 5, 6), "d", 4.0),
            row(date(2024, 5, 6), "e", 5.0),
            row(date(2024, 5, 6), "f", 6.0),
        ];
        assert_eq!(rank_products(&rows, &windows(), 60, 0).top.len(), 5);
        assert_eq!(rank_products(&rows, &windows(), 60, -3).top.len(), 5);
        assert_eq!(rank_products(&rows, &windows(), 60, 2).top.len(), 2);
    }

    #[test]
    fn test_shares_of_full_set_sum_to_100() {
        let rows = vec![
            row(date(2024, 5, 6), "a", 125.0),
            row(date(2024, 5, 7), "b", 375.0),
            row(date(2024, 5, 8), "c", 500.0),
        ];
        // Ask for more than exist so every product is reported
        let ranking = rank_products(&rows, &windows(), 60, 10);
        let share_sum: f64 = ranking.top.iter().map(|p| p.current_share).sum();
        assert!((share_sum - 100.0).abs() < 0.2, "shares sum to {}", share_sum);
    }

    #[test]
    fn test_zero_totals_give_zero_shares() {
        // Revenue only outside both windows
        let rows = vec![row(date(2024, 2, 1), "a", 100.0)];
        let ranking = rank_products(&rows, &windows(), 60, 5);
        assert_eq!(ranking.top[0].current_share, 0.0);
        assert_eq!(ranking.top[0].prior_share, 0.0);
        assert_eq!(ranking.top[0].change, PercentChange::Finite(0.0));
    }

    #[test]
    fn test_new_product_gets_infinite_change() {
        let rows = vec![row(date(2024, 5, 6), "launch", 250.0)];
        let ranking = rank_products(&rows, &windows(), 60, 5);
        assert_eq!(ranking.top[0].change, PercentChange::New);
    }

    #[test]
    fn test_daily_share_timeline() {
        let rows = vec![
            row(date(2024, 5, 6), "a", 75.0),
            row(date(2024, 5, 6), "b", 25.0),
            row(date(2024, 5, 7), "a", 50.0),
        ];
        let ranking = rank_products(&rows, &windows(), 60, 5);
        let a = ranking
            .top
            .iter()
            .find(|p| p.product_id == "a")
            .unwrap();

        assert_eq!(a.share_timeline.len(), 2);
        assert_eq!(a.share_timeline[0].date, date(2024, 5, 6));
        assert_eq!(a.share_timeline[0].value, 75.0);
        assert_eq!(a.share_timeline[1].value, 100.0);
    }
}
