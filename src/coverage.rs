use crate::kpi::round1;
use crate::periods::{ComparisonWindows, ReportingWindow};
use crate::schema::CoverageRow;
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Agreement band for a coverage rate, driving the status indicator next
/// to the published figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageStatus {
    Critical,
    Warning,
    Acceptable,
}

impl CoverageStatus {
    #[must_use]
    pub fn from_rate(rate: f64) -> Self {
        if rate < 50.0 {
            CoverageStatus::Critical
        } else if rate < 80.0 {
            CoverageStatus::Warning
        } else {
            CoverageStatus::Acceptable
        }
    }

    #[must_use]
    pub fn indicator(&self) -> &'static str {
        match self {
            CoverageStatus::Critical => "🚨",
            CoverageStatus::Warning => "⚠️",
            CoverageStatus::Acceptable => "✅",
        }
    }

    /// The worse of two bands.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        use CoverageStatus::*;
        match (self, other) {
            (Critical, _) | (_, Critical) => Critical,
            (Warning, _) | (_, Warning) => Warning,
            _ => Acceptable,
        }
    }
}

/// Week-over-week movement of a rate. Changes under half a point read as
/// flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    #[must_use]
    pub fn from_delta(delta: f64) -> Self {
        if delta >= 0.5 {
            Direction::Up
        } else if delta <= -0.5 {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    #[must_use]
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Up => "↑",
            Direction::Down => "↓",
            Direction::Flat => "→",
        }
    }
}

/// A reconciliation row that survived cleaning: every critical field
/// present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanCoverageRow {
    pub date: NaiveDate,
    pub primary_count: i64,
    pub secondary_count: i64,
    pub primary_revenue: f64,
    pub secondary_revenue: f64,
}

/// `secondary / primary * 100`, 0 when the primary is 0. Not clamped: a
/// secondary source can legitimately record more than the primary.
#[must_use]
pub fn coverage_rate(secondary: f64, primary: f64) -> f64 {
    if primary == 0.0 {
        0.0
    } else {
        round1(secondary / primary * 100.0)
    }
}

/// Drops rows that would misstate agreement if aggregated: rows missing a
/// critical field, and rows where the secondary source recorded
/// transactions the primary never saw (zero primary, nonzero secondary).
#[must_use]
pub fn clean_coverage_rows(rows: &[CoverageRow]) -> Vec<CleanCoverageRow> {
    let mut cleaned = Vec::with_capacity(rows.len());
    for row in rows {
        let (Some(primary_count), Some(secondary_count), Some(primary_revenue), Some(secondary_revenue)) = (
            row.primary_count,
            row.secondary_count,
            row.primary_revenue,
            row.secondary_revenue,
        ) else {
            debug!("Dropping coverage row for {}: missing critical fields", row.date);
            continue;
        };

        if primary_count == 0 && secondary_count > 0 {
            warn!(
                "Dropping coverage row for {}: secondary source recorded {} transactions the primary never saw",
                row.date, secondary_count
            );
            continue;
        }

        cleaned.push(CleanCoverageRow {
            date: row.date,
            primary_count,
            secondary_count,
            primary_revenue,
            secondary_revenue,
        });
    }
    cleaned
}

/// Day-level agreement between the two sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageDay {
    pub date: NaiveDate,
    pub primary_count: i64,
    pub secondary_count: i64,
    pub transaction_coverage: f64,
    pub primary_revenue: f64,
    pub secondary_revenue: f64,
    pub revenue_coverage: f64,
}

/// Week-level agreement over one comparison window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageWeek {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub matched_days: usize,
    pub primary_count: i64,
    pub secondary_count: i64,
    pub transaction_coverage: f64,
    pub primary_revenue: f64,
    pub secondary_revenue: f64,
    pub revenue_coverage: f64,
}

#[must_use]
pub fn daily_coverage(rows: &[CleanCoverageRow]) -> Vec<CoverageDay> {
    let mut days: Vec<CoverageDay> = rows
        .iter()
        .map(|row| CoverageDay {
            date: row.date,
            primary_count: row.primary_count,
            secondary_count: row.secondary_count,
            transaction_coverage: coverage_rate(
                row.secondary_count as f64,
                row.primary_count as f64,
            ),
            primary_revenue: row.primary_revenue,
            secondary_revenue: row.secondary_revenue,
            revenue_coverage: coverage_rate(row.secondary_revenue, row.primary_revenue),
        })
        .collect();
    days.sort_by(|a, b| b.date.cmp(&a.date));
    days
}

#[must_use]
pub fn weekly_coverage(rows: &[CleanCoverageRow], window: &ReportingWindow) -> CoverageWeek {
    let mut week = CoverageWeek {
        start: window.start,
        end: window.end,
        matched_days: 0,
        primary_count: 0,
        secondary_count: 0,
        transaction_coverage: 0.0,
        primary_revenue: 0.0,
        secondary_revenue: 0.0,
        revenue_coverage: 0.0,
    };
    for row in rows.iter().filter(|r| window.contains(r.date)) {
        week.matched_days += 1;
        week.primary_count += row.primary_count;
        week.secondary_count += row.secondary_count;
        week.primary_revenue += row.primary_revenue;
        week.secondary_revenue += row.secondary_revenue;
    }
    week.transaction_coverage =
        coverage_rate(week.secondary_count as f64, week.primary_count as f64);
    week.revenue_coverage = coverage_rate(week.secondary_revenue, week.primary_revenue);
    week
}

/// Full reconciliation output for one run: the daily table, both weekly
/// aggregates, week-over-week movement, and the status band of the most
/// recent week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub daily: Vec<CoverageDay>,
    pub current_week: CoverageWeek,
    pub prior_week: CoverageWeek,
    pub transaction_direction: Direction,
    pub revenue_direction: Direction,
    pub status: CoverageStatus,
}

#[must_use]
pub fn compute_coverage_report(rows: &[CoverageRow], windows: &ComparisonWindows) -> CoverageReport {
    let cleaned = clean_coverage_rows(rows);
    let current_week = weekly_coverage(&cleaned, &windows.current);
    let prior_week = weekly_coverage(&cleaned, &windows.prior);

    if current_week.matched_days == 0 {
        warn!(
            "No reconciliation rows in the current window {}..{}",
            windows.current.start, windows.current.end
        );
    }

    let status = CoverageStatus::from_rate(current_week.transaction_coverage)
        .combine(CoverageStatus::from_rate(current_week.revenue_coverage));

    CoverageReport {
        daily: daily_coverage(&cleaned),
        transaction_direction: Direction::from_delta(
            current_week.transaction_coverage - prior_week.transaction_coverage,
        ),
        revenue_direction: Direction::from_delta(
            current_week.revenue_coverage - prior_week.revenue_coverage,
        ),
        current_week,
        prior_week,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(d: NaiveDate, primary: i64, secondary: i64) -> CoverageRow {
        CoverageRow {
            date: d,
            primary_count: Some(primary),
            secondary_count: Some(secondary),
            primary_revenue: Some(primary as f64 * 50.0),
            secondary_revenue: Some(secondary as f64 * 50.0),
        }
    }

    #[test]
    fn test_coverage_rate_zero_primary() {
        assert_eq!(coverage_rate(5.0, 0.0), 0.0);
        assert_eq!(coverage_rate(82.0, 100.0), 82.0);
        // Secondary above primary is reported as-is, not clamped
        assert_eq!(coverage_rate(110.0, 100.0), 110.0);
    }

    #[test]
    fn test_cleaning_drops_partial_and_inconsistent_rows() {
        let rows = vec![
            row(date(2024, 5, 6), 100, 82),
            CoverageRow {
                date: date(2024, 5, 7),
                primary_count: None,
                secondary_count: Some(5),
                primary_revenue: Some(0.0),
                secondary_revenue: Some(0.0),
            },
            // Secondary-only activity: excluded entirely, not 0% or inf
            row(date(2024, 5, 8), 0, 5),
            // A genuinely quiet day survives
            row(date(2024, 5, 9), 0, 0),
        ];

        let cleaned = clean_coverage_rows(&rows);
        let dates: Vec<NaiveDate> = cleaned.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2024, 5, 6), date(2024, 5, 9)]);
    }

    #[test]
    fn test_status_bands() {
        assert_eq!(CoverageStatus::from_rate(49.9), CoverageStatus::Critical);
        assert_eq!(CoverageStatus::from_rate(50.0), CoverageStatus::Warning);
        assert_eq!(CoverageStatus::from_rate(79.9), CoverageStatus::Warning);
        assert_eq!(CoverageStatus::from_rate(80.0), CoverageStatus::Acceptable);
        assert_eq!(
            CoverageStatus::Acceptable.combine(CoverageStatus::Critical),
            CoverageStatus::Critical
        );
    }

    #[test]
    fn test_direction_threshold() {
        assert_eq!(Direction::from_delta(3.5), Direction::Up);
        assert_eq!(Direction::from_delta(-1.8), Direction::Down);
        assert_eq!(Direction::from_delta(0.4), Direction::Flat);
        assert_eq!(Direction::from_delta(-0.49), Direction::Flat);
    }

    #[test]
    fn test_weekly_aggregation_and_report() {
        let windows = ComparisonWindows::for_date(date(2024, 5, 15));
        let rows = vec![
            row(date(2024, 5, 6), 100, 82),
            row(date(2024, 5, 7), 100, 84),
            row(date(2024, 4, 29), 100, 90),
        ];

        let report = compute_coverage_report(&rows, &windows);

        assert_eq!(report.current_week.primary_count, 200);
        assert_eq!(report.current_week.secondary_count, 166);
        assert_eq!(report.current_week.transaction_coverage, 83.0);
        assert_eq!(report.prior_week.transaction_coverage, 90.0);
        assert_eq!(report.transaction_direction, Direction::Down);
        assert_eq!(report.status, CoverageStatus::Acceptable);
        // Daily table is sorted descending
        assert_eq!(report.daily.first().unwrap().date, date(2024, 5, 7));
    }

    #[test]
    fn test_empty_window_is_zero_not_error() {
        let windows = ComparisonWindows::for_date(date(2024, 5, 15));
        let report = compute_coverage_report(&[], &windows);
        assert_eq!(report.current_week.transaction_coverage, 0.0);
        assert_eq!(report.status, CoverageStatus::Critical);
    }
}
