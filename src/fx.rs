use crate::schema::{ConvertedSalesRow, RateSample, SalesRow};
use chrono::{Days, NaiveDate};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Static per-currency fallback rates into EUR, used when the market-data
/// feed returns nothing for a currency. Reviewed quarterly.
pub const FALLBACK_RATES: &[(&str, f64)] = &[
    ("USD", 0.92),
    ("GBP", 1.17),
    ("CHF", 1.04),
    ("SEK", 0.087),
    ("NOK", 0.086),
    ("DKK", 0.134),
    ("PLN", 0.23),
    ("CZK", 0.040),
    ("JPY", 0.0061),
    ("AUD", 0.61),
    ("CAD", 0.68),
];

/// Margin added on each side of the observed date span when fetching
/// rates, so weekend and holiday gaps in market data still resolve to a
/// nearby close.
pub const DEFAULT_RATE_BUFFER_DAYS: u32 = 5;

#[must_use]
pub fn fallback_rate(currency: &str) -> Option<f64> {
    FALLBACK_RATES
        .iter()
        .find(|(code, _)| *code == currency)
        .map(|(_, rate)| *rate)
}

/// Date-indexed exchange rates for one run, built once from the rate feed
/// and discarded with the run. Never shared across runs.
#[derive(Debug, Clone)]
pub struct RateTable {
    reporting_currency: String,
    series: HashMap<String, BTreeMap<NaiveDate, f64>>,
}

impl RateTable {
    #[must_use]
    pub fn new(reporting_currency: impl Into<String>) -> Self {
        Self {
            reporting_currency: reporting_currency.into(),
            series: HashMap::new(),
        }
    }

    #[must_use]
    pub fn reporting_currency(&self) -> &str {
        &self.reporting_currency
    }

    pub fn insert_series(&mut self, currency: impl Into<String>, samples: &[RateSample]) {
        let series = self.series.entry(currency.into()).or_default();
        for sample in samples {
            series.insert(sample.date, sample.rate);
        }
    }

    #[must_use]
    pub fn has_series(&self, currency: &str) -> bool {
        self.series
            .get(currency)
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    /// Resolves the rate for (currency, date): exact date, else the most
    /// recent earlier close, else the static fallback constant. The
    /// reporting currency is always exactly 1.
    #[must_use]
    pub fn resolve(&self, currency: &str, date: NaiveDate) -> f64 {
        if currency == self.reporting_currency {
            return 1.0;
        }

        if let Some(series) = self.series.get(currency) {
            if let Some(rate) = series.get(&date) {
                return *rate;
            }
            if let Some((prior_date, rate)) = series.range(..=date).next_back() {
                debug!(
                    "No {} rate for {}, using prior close from {}",
                    currency, date, prior_date
                );
                return *rate;
            }
        }

        match fallback_rate(currency) {
            Some(rate) => {
                debug!("No market data for {} on {}, using fallback constant", currency, date);
                rate
            }
            None => {
                warn!(
                    "No rate or fallback for currency {}; leaving amounts unconverted",
                    currency
                );
                1.0
            }
        }
    }
}

/// The date span rates must cover for these rows, expanded by the buffer
/// margin on each side. `None` when there are no rows.
#[must_use]
pub fn required_rate_span(rows: &[SalesRow], buffer_days: u32) -> Option<(NaiveDate, NaiveDate)> {
    let min = rows.iter().map(|r| r.date).min()?;
    let max = rows.iter().map(|r| r.date).max()?;
    let buffer = Days::new(buffer_days as u64);
    Some((min - buffer, max + buffer))
}

/// Non-reporting currencies present in the rows, each of which needs a
/// rate series fetched for the run.
#[must_use]
pub fn currencies_requiring_rates(rows: &[SalesRow], reporting_currency: &str) -> Vec<String> {
    let set: BTreeSet<&str> = rows
        .iter()
        .map(|r| r.currency.as_str())
        .filter(|c| *c != reporting_currency)
        .collect();
    set.into_iter().map(String::from).collect()
}

/// Attaches reporting-currency amounts to every row. Pure: the table is
/// already populated and no I/O happens here.
#[must_use]
pub fn convert_rows(rows: &[SalesRow], table: &RateTable) -> Vec<ConvertedSalesRow> {
    rows.iter()
        .map(|row| {
            let rate = table.resolve(&row.currency, row.date);
            ConvertedSalesRow {
                date: row.date,
                currency: row.currency.clone(),
                orders: row.orders,
                revenue: row.revenue,
                discount: row.discount,
                units: row.units,
                rate,
                revenue_reporting: row.revenue * rate,
                discount_reporting: row.discount * rate,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sales_row(d: NaiveDate, currency: &str, revenue: f64) -> SalesRow {
        SalesRow {
            date: d,
            currency: currency.to_string(),
            orders: 10,
            revenue,
            discount: 50.0,
            units: 20,
        }
    }

    #[test]
    fn test_reporting_currency_is_always_one() {
        let table = RateTable::new("EUR");
        assert_eq!(table.resolve("EUR", date(2024, 5, 6)), 1.0);
        assert_eq!(table.resolve("EUR", date(1999, 1, 1)), 1.0);
    }

    #[test]
    fn test_exact_then_prior_then_fallback() {
        let mut table = RateTable::new("EUR");
        table.insert_series(
            "USD",
            &[
                RateSample {
                    date: date(2024, 5, 3),
                    rate: 0.93,
                },
                RateSample {
                    date: date(2024, 5, 6),
                    rate: 0.94,
                },
            ],
        );

        // Exact match
        assert_eq!(table.resolve("USD", date(2024, 5, 6)), 0.94);
        // Weekend gap resolves to the Friday close
        assert_eq!(table.resolve("USD", date(2024, 5, 5)), 0.93);
        // Before any sample: static constant
        assert_eq!(table.resolve("USD", date(2024, 4, 1)), 0.92);
        // No series at all: static constant
        assert_eq!(table.resolve("GBP", date(2024, 5, 6)), 1.17);
    }

    #[test]
    fn test_unknown_currency_without_fallback_passes_through() {
        let table = RateTable::new("EUR");
        assert_eq!(table.resolve("XXX", date(2024, 5, 6)), 1.0);
    }

    #[test]
    fn test_required_rate_span_includes_buffer() {
        let rows = vec![
            sales_row(date(2024, 5, 6), "USD", 100.0),
            sales_row(date(2024, 5, 20), "EUR", 100.0),
        ];
        let (start, end) = required_rate_span(&rows, 5).unwrap();
        assert_eq!(start, date(2024, 5, 1));
        assert_eq!(end, date(2024, 5, 25));

        assert!(required_rate_span(&[], 5).is_none());
    }

    #[test]
    fn test_currencies_requiring_rates_excludes_reporting() {
        let rows = vec![
            sales_row(date(2024, 5, 6), "USD", 100.0),
            sales_row(date(2024, 5, 6), "EUR", 100.0),
            sales_row(date(2024, 5, 7), "GBP", 100.0),
            sales_row(date(2024, 5, 8), "USD", 100.0),
        ];
        assert_eq!(
            currencies_requiring_rates(&rows, "EUR"),
            vec!["GBP".to_string(), "USD".to_string()]
        );
    }

    #[test]
    fn test_convert_rows_applies_fallback_constant() {
        let table = RateTable::new("EUR");
        let rows = vec![sales_row(date(2024, 5, 6), "USD", 1000.0)];
        let converted = convert_rows(&rows, &table);

        assert_eq!(converted.len(), 1);
        assert!((converted[0].revenue_reporting - 920.0).abs() < 1e-9);
        assert!((converted[0].discount_reporting - 46.0).abs() < 1e-9);
        assert_eq!(converted[0].rate, 0.92);
    }

    #[test]
    fn test_convert_rows_reporting_currency_unchanged() {
        let table = RateTable::new("EUR");
        let rows = vec![sales_row(date(2024, 5, 6), "EUR", 1000.0)];
        let converted = convert_rows(&rows, &table);
        assert_eq!(converted[0].revenue_reporting, 1000.0);
        assert_eq!(converted[0].rate, 1.0);
    }
}
