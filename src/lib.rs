//! # Weekly Report Builder
//!
//! A library for reconciling multi-source e-commerce data (order
//! management vs. web analytics) into a weekly KPI report with narrative
//! commentary, charts, and chat/document publishing.
//!
//! ## Core Concepts
//!
//! - **Comparison windows**: two adjacent Monday–Sunday weeks, resolved
//!   from any reference date
//! - **Currency normalization**: per-run rate table with date fallback and
//!   static constants, so one dead market feed never blocks the report
//! - **Source merging**: outer join of transactional and behavioral daily
//!   series with gap-filling, never dropping a date
//! - **Coverage reconciliation**: how much of the source-of-truth volume
//!   the analytics tracking actually saw, banded into status levels
//! - **Graceful degradation**: only missing configuration or a dead
//!   transactional feed abort a run; everything else ships partial
//!
//! ## Example
//!
//! ```rust,ignore
//! use weekly_report_builder::*;
//! use chrono::NaiveDate;
//!
//! let config = ReportConfig {
//!     reference_date: Some(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()),
//!     ..ReportConfig::default()
//! };
//!
//! let rate_table = RateTable::new("EUR");
//! let artifacts = ReportProcessor::process(
//!     &config,
//!     &rate_table,
//!     &sales_rows,
//!     &traffic_rows,
//!     &coverage_rows,
//!     &product_rows,
//! )?;
//!
//! for kpi in &artifacts.kpis {
//!     println!("{}: {} ({})", kpi.kpi.label(), kpi.current_value, kpi.change);
//! }
//! ```

pub mod chart;
pub mod coverage;
pub mod error;
pub mod fx;
pub mod kpi;
pub mod markup;
pub mod merge;
pub mod periods;
pub mod ranking;
pub mod schema;

#[cfg(feature = "reporting")]
pub mod feeds;
#[cfg(feature = "reporting")]
pub mod llm;
#[cfg(feature = "reporting")]
pub mod pipeline;
#[cfg(feature = "reporting")]
pub mod publish;
#[cfg(feature = "reporting")]
pub mod retry;

pub use chart::{ChartRenderer, ChartSeries, ChartSpec, RenderedChart};
pub use coverage::{
    compute_coverage_report, CoverageReport, CoverageStatus, CoverageWeek, Direction,
};
pub use error::{ReportError, Result};
pub use fx::{convert_rows, RateTable};
pub use kpi::{compute_kpi_reports, percent_change, Kpi, KpiReport, PercentChange, TimelinePoint};
pub use markup::{render_markdown, render_slack, Document, Inline};
pub use merge::{aggregate_sales_by_date, merge_daily_sources, MergedDailyRecord};
pub use periods::{ComparisonWindows, ReferenceDate, ReportingWindow};
pub use ranking::{rank_products, ProductRanking, RankedProduct};
pub use schema::*;

#[cfg(feature = "reporting")]
pub use pipeline::{DeliveryConfig, ReportPipeline, RunSummary};

use log::{debug, info};

/// Everything one run derives from the source rows. Recomputed fresh each
/// run; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub windows: ComparisonWindows,
    pub merged: Vec<MergedDailyRecord>,
    pub kpis: Vec<KpiReport>,
    pub coverage: CoverageReport,
    pub products: ProductRanking,
}

/// The pure reconciliation/metrics core: in-memory rows in, report
/// artifacts out. No I/O; the rate table is built by the caller.
pub struct ReportProcessor;

impl ReportProcessor {
    pub fn process(
        config: &ReportConfig,
        rate_table: &RateTable,
        sales: &[SalesRow],
        traffic: &[TrafficRow],
        coverage_rows: &[CoverageRow],
        products: &[ProductRow],
    ) -> Result<ReportArtifacts> {
        let reference = match config.reference_date {
            Some(date) => ReferenceDate::Date(date),
            None => ReferenceDate::Today,
        };
        let windows = ComparisonWindows::resolve(reference)?;

        info!(
            "Computing report artifacts: current week {}..{}",
            windows.current.start, windows.current.end
        );
        debug!(
            "Inputs: {} sales rows, {} traffic rows, {} coverage rows, {} product rows",
            sales.len(),
            traffic.len(),
            coverage_rows.len(),
            products.len()
        );

        let converted = convert_rows(sales, rate_table);
        let daily_sales = aggregate_sales_by_date(&converted);
        let merged = merge_daily_sources(&daily_sales, traffic);

        let kpis = compute_kpi_reports(&merged, &windows, config.rolling_days);
        let coverage = compute_coverage_report(coverage_rows, &windows);
        let products = rank_products(products, &windows, config.rolling_days, config.top_n);

        Ok(ReportArtifacts {
            windows,
            merged,
            kpis,
            coverage,
            products,
        })
    }
}

/// Convenience wrapper over [`ReportProcessor::process`].
pub fn build_report_artifacts(
    config: &ReportConfig,
    rate_table: &RateTable,
    sales: &[SalesRow],
    traffic: &[TrafficRow],
    coverage_rows: &[CoverageRow],
    products: &[ProductRow],
) -> Result<ReportArtifacts> {
    ReportProcessor::process(config, rate_table, sales, traffic, coverage_rows, products)
}
