//! Contracts for the external data collaborators. Wire formats are the
//! collaborators' concern; the pipeline only depends on these row shapes.

use crate::error::Result;
use crate::fx::{currencies_requiring_rates, fallback_rate, required_rate_span, RateTable};
use crate::schema::{CoverageRow, ProductRow, RateSample, SalesRow, TrafficRow};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{info, warn};

/// Source-of-truth order data, queried by date range.
#[async_trait]
pub trait TransactionalFeed {
    async fn fetch_sales(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<SalesRow>>;
}

/// Site analytics: daily behavior totals plus per-product revenue.
#[async_trait]
pub trait BehavioralFeed {
    async fn fetch_traffic(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TrafficRow>>;

    async fn fetch_product_sales(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ProductRow>>;
}

/// Pre-joined daily counts/revenue from both sources, for coverage
/// reconciliation.
#[async_trait]
pub trait ReconciliationFeed {
    async fn fetch_coverage(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CoverageRow>>;
}

/// Market-data collaborator for daily close rates. May legitimately
/// return an empty series (e.g. an unlisted currency pair).
#[async_trait]
pub trait RateFeed {
    async fn fetch_rates(
        &self,
        currency: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateSample>>;
}

/// Auxiliary context (holidays, trade news) woven into commentary
/// prompts. Fails closed: implementations return an empty list rather
/// than erroring, so a dead auxiliary feed never blocks the report.
#[async_trait]
pub trait ContextFeed {
    async fn fetch_notes(&self, start: NaiveDate, end: NaiveDate) -> Vec<String>;
}

/// No-op context feed for deployments without auxiliary sources.
pub struct NoContext;

#[async_trait]
impl ContextFeed for NoContext {
    async fn fetch_notes(&self, _start: NaiveDate, _end: NaiveDate) -> Vec<String> {
        Vec::new()
    }
}

/// Builds the run's rate table: one fetch per non-reporting currency over
/// the buffered span. A failed or empty fetch leaves that currency on its
/// static fallback constant; it never aborts the other currencies or the
/// run.
pub async fn build_rate_table<R: RateFeed + ?Sized>(
    feed: &R,
    rows: &[SalesRow],
    reporting_currency: &str,
    buffer_days: u32,
) -> RateTable {
    let mut table = RateTable::new(reporting_currency);

    let Some((start, end)) = required_rate_span(rows, buffer_days) else {
        return table;
    };

    for currency in currencies_requiring_rates(rows, reporting_currency) {
        match feed.fetch_rates(&currency, start, end).await {
            Ok(samples) if !samples.is_empty() => {
                info!(
                    "Fetched {} {} rates covering {}..{}",
                    samples.len(),
                    currency,
                    start,
                    end
                );
                table.insert_series(currency, &samples);
            }
            Ok(_) => {
                warn!(
                    "Rate feed returned no {} data for {}..{}; using fallback constant {:?}",
                    currency,
                    start,
                    end,
                    fallback_rate(&currency)
                );
            }
            Err(e) => {
                warn!(
                    "Rate fetch for {} failed ({}); using fallback constant {:?}",
                    currency,
                    e,
                    fallback_rate(&currency)
                );
            }
        }
    }

    table
}
