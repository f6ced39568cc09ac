use crate::merge::MergedDailyRecord;
use crate::periods::{ComparisonWindows, ReportingWindow};
use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

/// The fixed KPI set of the weekly report. Adding a KPI means adding a
/// variant and handling it in every match below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kpi {
    Orders,
    Revenue,
    AverageOrderValue,
    UnitsPerOrder,
    Sessions,
    ConversionRate,
}

impl Kpi {
    pub const ALL: [Kpi; 6] = [
        Kpi::Orders,
        Kpi::Revenue,
        Kpi::AverageOrderValue,
        Kpi::UnitsPerOrder,
        Kpi::Sessions,
        Kpi::ConversionRate,
    ];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Kpi::Orders => "Orders",
            Kpi::Revenue => "Revenue",
            Kpi::AverageOrderValue => "Average Order Value",
            Kpi::UnitsPerOrder => "Units per Order",
            Kpi::Sessions => "Sessions",
            Kpi::ConversionRate => "Conversion Rate",
        }
    }

    /// Counts are reported whole; everything else gets one decimal.
    #[must_use]
    pub fn is_count(&self) -> bool {
        matches!(self, Kpi::Orders | Kpi::Sessions)
    }
}

/// Signed period-over-period change. `New` is the +∞ sentinel for a
/// metric that appeared from a zero prior; a zero-to-zero comparison is
/// `Finite(0.0)`, never infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentChange {
    New,
    Finite(f64),
}

impl PercentChange {
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        matches!(self, PercentChange::New)
    }

    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match self {
            PercentChange::New => None,
            PercentChange::Finite(v) => Some(*v),
        }
    }
}

impl std::fmt::Display for PercentChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PercentChange::New => write!(f, "+∞%"),
            PercentChange::Finite(v) => write!(f, "{:+.1}%", v),
        }
    }
}

#[must_use]
pub fn percent_change(prior: f64, current: f64) -> PercentChange {
    if prior == 0.0 {
        if current == 0.0 {
            PercentChange::Finite(0.0)
        } else {
            PercentChange::New
        }
    } else {
        PercentChange::Finite(round1((current - prior) / prior * 100.0))
    }
}

#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One point of a daily KPI timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One KPI's window comparison plus its daily timeline over the rolling
/// horizon. Derived fresh from the merged table on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiReport {
    pub kpi: Kpi,
    pub current_value: f64,
    pub prior_value: f64,
    pub change: PercentChange,
    pub timeline: Vec<TimelinePoint>,
}

#[derive(Debug, Default)]
struct WindowTotals {
    matched_days: usize,
    orders: i64,
    revenue: f64,
    units: i64,
    sessions: i64,
    conversions: i64,
    // Session-weighted accumulation over days that supplied a daily rate.
    supplied_rate_weighted: f64,
    supplied_rate_sessions: i64,
}

fn window_totals(records: &[MergedDailyRecord], window: &ReportingWindow) -> WindowTotals {
    let mut totals = WindowTotals::default();
    for record in records.iter().filter(|r| window.contains(r.date)) {
        totals.matched_days += 1;
        totals.orders += record.orders;
        totals.revenue += record.revenue;
        totals.units += record.units;
        totals.sessions += record.sessions;
        totals.conversions += record.conversions;
        if let Some(rate) = record.supplied_conversion_rate {
            totals.supplied_rate_weighted += rate * record.sessions as f64;
            totals.supplied_rate_sessions += record.sessions;
        }
    }
    totals
}

impl WindowTotals {
    fn value_for(&self, kpi: Kpi) -> f64 {
        match kpi {
            Kpi::Orders => self.orders as f64,
            Kpi::Sessions => self.sessions as f64,
            Kpi::Revenue => round1(self.revenue),
            Kpi::AverageOrderValue => {
                if self.orders > 0 {
                    round1(self.revenue / self.orders as f64)
                } else {
                    0.0
                }
            }
            Kpi::UnitsPerOrder => {
                if self.orders > 0 {
                    round1(self.units as f64 / self.orders as f64)
                } else {
                    0.0
                }
            }
            Kpi::ConversionRate => self.conversion_rate(),
        }
    }

    /// Window conversion rate. Supplied daily rates win, weighted by each
    /// day's sessions so low-traffic days don't skew the average; without
    /// any supplied rate the window totals are used directly.
    fn conversion_rate(&self) -> f64 {
        if self.supplied_rate_sessions > 0 {
            round1(self.supplied_rate_weighted / self.supplied_rate_sessions as f64)
        } else if self.sessions > 0 {
            round1(self.conversions as f64 / self.sessions as f64 * 100.0)
        } else {
            0.0
        }
    }
}

fn daily_value(record: &MergedDailyRecord, kpi: Kpi) -> f64 {
    match kpi {
        Kpi::Orders => record.orders as f64,
        Kpi::Sessions => record.sessions as f64,
        Kpi::Revenue => round1(record.revenue),
        Kpi::AverageOrderValue => {
            if record.orders > 0 {
                round1(record.revenue / record.orders as f64)
            } else {
                0.0
            }
        }
        Kpi::UnitsPerOrder => {
            if record.orders > 0 {
                round1(record.units as f64 / record.orders as f64)
            } else {
                0.0
            }
        }
        Kpi::ConversionRate => round1(record.conversion_rate()),
    }
}

/// Daily timeline for one KPI over the horizon, oldest first.
#[must_use]
pub fn kpi_timeline(
    records: &[MergedDailyRecord],
    horizon: &ReportingWindow,
    kpi: Kpi,
) -> Vec<TimelinePoint> {
    let mut points: Vec<TimelinePoint> = records
        .iter()
        .filter(|r| horizon.contains(r.date))
        .map(|r| TimelinePoint {
            date: r.date,
            value: daily_value(r, kpi),
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

/// Computes the full KPI set for the comparison windows, with daily
/// timelines over the rolling horizon ending at `current.end`.
///
/// A window with no matching dates reports zeros for every KPI; that is a
/// data gap, not a failure, and is logged as such.
#[must_use]
pub fn compute_kpi_reports(
    records: &[MergedDailyRecord],
    windows: &ComparisonWindows,
    rolling_days: u32,
) -> Vec<KpiReport> {
    let current = window_totals(records, &windows.current);
    let prior = window_totals(records, &windows.prior);

    if current.matched_days == 0 {
        warn!(
            "No rows matched the current window {}..{}; reporting zeros",
            windows.current.start, windows.current.end
        );
    }
    if prior.matched_days == 0 {
        warn!(
            "No rows matched the prior window {}..{}; reporting zeros",
            windows.prior.start, windows.prior.end
        );
    }

    let horizon = windows.rolling_horizon(rolling_days);

    Kpi::ALL
        .iter()
        .map(|&kpi| {
            let current_value = current.value_for(kpi);
            let prior_value = prior.value_for(kpi);
            KpiReport {
                kpi,
                current_value,
                prior_value,
                change: percent_change(prior_value, current_value),
                timeline: kpi_timeline(records, &horizon, kpi),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{merge_daily_sources, DailySales};
    use crate::schema::TrafficRow;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn windows() -> ComparisonWindows {
        // Reference Wed 2024-05-15: current = 05-06..05-12, prior = 04-29..05-05
        ComparisonWindows::for_date(date(2024, 5, 15))
    }

    fn record(d: NaiveDate, orders: i64, revenue: f64, sessions: i64) -> MergedDailyRecord {
        let sales = vec![DailySales {
            date: d,
            orders,
            revenue,
            discount: 0.0,
            units: orders * 3,
        }];
        let traffic = vec![TrafficRow {
            date: d,
            sessions,
            conversions: orders,
            users: sessions,
            conversion_rate: None,
        }];
        merge_daily_sources(&sales, &traffic).pop().unwrap()
    }

    #[test]
    fn test_percent_change_rules() {
        assert_eq!(percent_change(0.0, 5.0), PercentChange::New);
        assert_eq!(percent_change(0.0, 0.0), PercentChange::Finite(0.0));
        assert_eq!(percent_change(100.0, 150.0), PercentChange::Finite(50.0));
        assert_eq!(percent_change(100.0, 80.0), PercentChange::Finite(-20.0));
        assert_eq!(format!("{}", percent_change(0.0, 5.0)), "+∞%");
        assert_eq!(format!("{}", percent_change(100.0, 150.0)), "+50.0%");
    }

    #[test]
    fn test_window_sums_and_aov() {
        let windows = windows();
        let records = vec![
            record(date(2024, 5, 6), 40, 2000.0, 1000),
            record(date(2024, 5, 7), 60, 3000.0, 1500),
            record(date(2024, 4, 29), 80, 4000.0, 2000),
        ];

        let reports = compute_kpi_reports(&records, &windows, 60);
        let by_kpi = |kpi: Kpi| reports.iter().find(|r| r.kpi == kpi).unwrap().clone();

        let orders = by_kpi(Kpi::Orders);
        assert_eq!(orders.current_value, 100.0);
        assert_eq!(orders.prior_value, 80.0);
        assert_eq!(orders.change, PercentChange::Finite(25.0));

        let aov = by_kpi(Kpi::AverageOrderValue);
        assert_eq!(aov.current_value, 50.0);
        assert_eq!(aov.prior_value, 50.0);
        assert_eq!(aov.change, PercentChange::Finite(0.0));

        let units = by_kpi(Kpi::UnitsPerOrder);
        assert_eq!(units.current_value, 3.0);
    }

    #[test]
    fn test_empty_window_reports_zeros() {
        let windows = windows();
        // Only prior-window data
        let records = vec![record(date(2024, 4, 30), 10, 500.0, 200)];
        let reports = compute_kpi_reports(&records, &windows, 60);

        for report in &reports {
            assert_eq!(
                report.current_value, 0.0,
                "{:?} should be zero for an empty window",
                report.kpi
            );
        }
        let revenue = reports.iter().find(|r| r.kpi == Kpi::Revenue).unwrap();
        assert_eq!(revenue.change, PercentChange::Finite(-100.0));
    }

    #[test]
    fn test_weighted_conversion_rate_prefers_supplied_rates() {
        let windows = windows();
        let mut high_traffic = record(date(2024, 5, 6), 10, 500.0, 9000);
        high_traffic.supplied_conversion_rate = Some(1.0);
        let mut low_traffic = record(date(2024, 5, 7), 10, 500.0, 1000);
        low_traffic.supplied_conversion_rate = Some(5.0);

        let reports = compute_kpi_reports(&[high_traffic, low_traffic], &windows, 60);
        let rate = reports
            .iter()
            .find(|r| r.kpi == Kpi::ConversionRate)
            .unwrap();

        // (1.0*9000 + 5.0*1000) / 10000 = 1.4, not the naive mean 3.0
        assert_eq!(rate.current_value, 1.4);
    }

    #[test]
    fn test_weighted_average_matches_totals_under_uniform_sessions() {
        let windows = windows();
        let mut records = Vec::new();
        for (offset, conversions) in [(0u64, 12i64), (1, 20), (2, 8)] {
            let d = date(2024, 5, 6) + chrono::Days::new(offset);
            let mut r = record(d, conversions, 100.0, 1000);
            r.conversions = conversions;
            r.supplied_conversion_rate = Some(conversions as f64 / 1000.0 * 100.0);
            records.push(r);
        }

        let reports = compute_kpi_reports(&records, &windows, 60);
        let rate = reports
            .iter()
            .find(|r| r.kpi == Kpi::ConversionRate)
            .unwrap();

        let expected = round1((12 + 20 + 8) as f64 / 3000.0 * 100.0);
        assert_eq!(rate.current_value, expected);
    }

    #[test]
    fn test_conversion_rate_derived_without_supplied_rates() {
        let windows = windows();
        let records = vec![record(date(2024, 5, 6), 30, 1500.0, 1000)];
        let reports = compute_kpi_reports(&records, &windows, 60);
        let rate = reports
            .iter()
            .find(|r| r.kpi == Kpi::ConversionRate)
            .unwrap();
        assert_eq!(rate.current_value, 3.0);
    }

    #[test]
    fn test_timeline_bounded_by_horizon_and_ascending() {
        let windows = windows();
        let records = vec![
            record(date(2024, 5, 12), 10, 500.0, 200),
            record(date(2024, 5, 6), 10, 500.0, 200),
            record(date(2024, 1, 1), 10, 500.0, 200), // outside 60-day horizon
            record(date(2024, 5, 13), 10, 500.0, 200), // after current.end
        ];
        let reports = compute_kpi_reports(&records, &windows, 60);
        let timeline = &reports[0].timeline;

        assert_eq!(timeline.len(), 2);
        assert!(timeline[0].date < timeline[1].date);
        assert!(timeline.iter().all(|p| p.date <= windows.current.end));
    }
}
