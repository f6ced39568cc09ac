use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One business day of transactional data, in the currency the orders were
/// placed in. At most one row per (date, currency).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesRow {
    pub date: NaiveDate,
    pub currency: String,
    pub orders: i64,
    pub revenue: f64,
    pub discount: f64,
    pub units: i64,
}

/// A [`SalesRow`] with reporting-currency amounts attached by the
/// currency normalizer. The original-currency fields are kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConvertedSalesRow {
    pub date: NaiveDate,
    pub currency: String,
    pub orders: i64,
    pub revenue: f64,
    pub discount: f64,
    pub units: i64,
    /// Multiplicative rate that was applied to the amount fields.
    pub rate: f64,
    pub revenue_reporting: f64,
    pub discount_reporting: f64,
}

/// Per-day site behavior totals from the analytics feed.
///
/// `conversion_rate` is the feed's own pre-computed daily rate when it
/// supplies one; absent rates are derived downstream by the merger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficRow {
    pub date: NaiveDate,
    pub sessions: i64,
    pub conversions: i64,
    pub users: i64,
    #[serde(default)]
    pub conversion_rate: Option<f64>,
}

/// Per-day, per-product revenue from the analytics feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRow {
    pub date: NaiveDate,
    pub product_id: String,
    pub product_name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub revenue: f64,
    pub quantity: i64,
}

/// Paired daily counts/revenue from the reconciliation feed.
///
/// Fields are optional because upstream rows arrive with gaps; rows missing
/// critical fields are excluded by the cleaning step, never zero-filled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageRow {
    pub date: NaiveDate,
    pub primary_count: Option<i64>,
    pub secondary_count: Option<i64>,
    pub primary_revenue: Option<f64>,
    pub secondary_revenue: Option<f64>,
}

/// One daily close from the exchange-rate feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RateSample {
    pub date: NaiveDate,
    pub rate: f64,
}

/// Core analysis settings for one report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Currency all monetary KPIs are normalized into.
    pub reporting_currency: String,
    /// How many top products the report lists. Non-positive values fall
    /// back to [`DEFAULT_TOP_N`].
    pub top_n: i64,
    /// Lookback used to build daily KPI timelines, in days.
    pub rolling_days: u32,
    /// Full analysis horizon queried from the feeds, in days.
    pub horizon_days: u32,
    /// Margin added on each side of the rate-fetch span to tolerate
    /// weekend and holiday gaps in market data.
    pub rate_buffer_days: u32,
    /// Anchor for the comparison windows; `None` means today.
    pub reference_date: Option<NaiveDate>,
}

pub const DEFAULT_TOP_N: usize = 5;

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            reporting_currency: "EUR".to_string(),
            top_n: DEFAULT_TOP_N as i64,
            rolling_days: 60,
            horizon_days: 90,
            rate_buffer_days: crate::fx::DEFAULT_RATE_BUFFER_DAYS,
            reference_date: None,
        }
    }
}

impl ReportConfig {
    /// Top-N with the fallback applied.
    #[must_use]
    pub fn effective_top_n(&self) -> usize {
        if self.top_n > 0 {
            self.top_n as usize
        } else {
            DEFAULT_TOP_N
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_n_fallback() {
        let mut config = ReportConfig::default();
        assert_eq!(config.effective_top_n(), 5);

        config.top_n = 3;
        assert_eq!(config.effective_top_n(), 3);

        config.top_n = 0;
        assert_eq!(config.effective_top_n(), 5);

        config.top_n = -2;
        assert_eq!(config.effective_top_n(), 5);
    }

    #[test]
    fn test_traffic_row_deserializes_without_rate() {
        let json = r#"{"date":"2024-05-06","sessions":1200,"conversions":36,"users":950}"#;
        let row: TrafficRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.sessions, 1200);
        assert!(row.conversion_rate.is_none());
    }
}
