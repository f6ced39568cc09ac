use crate::schema::{ConvertedSalesRow, TrafficRow};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

/// Transactional totals for one date, already normalized to the reporting
/// currency and summed across order currencies.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: i64,
    pub revenue: f64,
    pub discount: f64,
    pub units: i64,
}

/// One calendar date with the KPI inputs of both sources. Dates covered by
/// only one source (or neither) carry zeros for the missing fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDailyRecord {
    pub date: NaiveDate,
    pub orders: i64,
    pub revenue: f64,
    pub discount: f64,
    pub units: i64,
    pub sessions: i64,
    pub conversions: i64,
    pub users: i64,
    /// The behavioral feed's own daily conversion rate, when it supplied
    /// one. Kept separate so window aggregation can weight it by sessions.
    pub supplied_conversion_rate: Option<f64>,
}

impl MergedDailyRecord {
    fn zeroed(date: NaiveDate) -> Self {
        Self {
            date,
            orders: 0,
            revenue: 0.0,
            discount: 0.0,
            units: 0,
            sessions: 0,
            conversions: 0,
            users: 0,
            supplied_conversion_rate: None,
        }
    }

    /// Effective daily conversion rate: the supplied one, else derived
    /// from conversions over sessions. 0 when there are no sessions.
    #[must_use]
    pub fn conversion_rate(&self) -> f64 {
        match self.supplied_conversion_rate {
            Some(rate) => rate,
            None if self.sessions > 0 => {
                self.conversions as f64 / self.sessions as f64 * 100.0
            }
            None => 0.0,
        }
    }
}

/// Collapses per-(date, currency) converted rows into one transactional
/// row per date, in the reporting currency.
#[must_use]
pub fn aggregate_sales_by_date(rows: &[ConvertedSalesRow]) -> Vec<DailySales> {
    let mut by_date: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();
    for row in rows {
        let entry = by_date.entry(row.date).or_insert_with(|| DailySales {
            date: row.date,
            orders: 0,
            revenue: 0.0,
            discount: 0.0,
            units: 0,
        });
        entry.orders += row.orders;
        entry.revenue += row.revenue_reporting;
        entry.discount += row.discount_reporting;
        entry.units += row.units;
    }
    by_date.into_values().collect()
}

/// Outer-joins the two daily series on date. Every calendar date between
/// the earliest and latest date observed in either input gets exactly one
/// row; output is sorted descending by date.
#[must_use]
pub fn merge_daily_sources(
    sales: &[DailySales],
    traffic: &[TrafficRow],
) -> Vec<MergedDailyRecord> {
    let sales_by_date: BTreeMap<NaiveDate, &DailySales> =
        sales.iter().map(|r| (r.date, r)).collect();
    let traffic_by_date: BTreeMap<NaiveDate, &TrafficRow> =
        traffic.iter().map(|r| (r.date, r)).collect();

    let min = match (
        sales_by_date.keys().next(),
        traffic_by_date.keys().next(),
    ) {
        (Some(a), Some(b)) => *a.min(b),
        (Some(a), None) => *a,
        (None, Some(b)) => *b,
        (None, None) => return Vec::new(),
    };
    let max = *sales_by_date
        .keys()
        .next_back()
        .into_iter()
        .chain(traffic_by_date.keys().next_back())
        .max()
        .unwrap();

    let mut merged = Vec::new();
    let mut date = min;
    while date <= max {
        let mut record = MergedDailyRecord::zeroed(date);
        if let Some(sales_row) = sales_by_date.get(&date) {
            record.orders = sales_row.orders;
            record.revenue = sales_row.revenue;
            record.discount = sales_row.discount;
            record.units = sales_row.units;
        }
        if let Some(traffic_row) = traffic_by_date.get(&date) {
            record.sessions = traffic_row.sessions;
            record.conversions = traffic_row.conversions;
            record.users = traffic_row.users;
            record.supplied_conversion_rate = traffic_row.conversion_rate;
        }
        merged.push(record);
        date = date + Days::new(1);
    }

    merged.reverse();
    merged
}
