//! Computes report artifacts from in-memory sample data and prints the
//! KPI comparison, without touching any external service.
//!
//! Run with: cargo run --example offline_summary

use anyhow::Result;
use chrono::{Days, NaiveDate};
use weekly_report_builder::*;

fn main() -> Result<()> {
    let reference = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
    let config = ReportConfig {
        reference_date: Some(reference),
        ..ReportConfig::default()
    };

    let mut sales = Vec::new();
    let mut traffic = Vec::new();
    for offset in 0..14u64 {
        let date = NaiveDate::from_ymd_opt(2024, 4, 29).unwrap() + Days::new(offset);
        let orders = 90 + (offset as i64 % 5) * 7;
        sales.push(SalesRow {
            date,
            currency: "EUR".to_string(),
            orders,
            revenue: orders as f64 * 52.3,
            discount: orders as f64 * 2.1,
            units: orders * 2,
        });
        sales.push(SalesRow {
            date,
            currency: "USD".to_string(),
            orders: 15,
            revenue: 780.0,
            discount: 30.0,
            units: 24,
        });
        traffic.push(TrafficRow {
            date,
            sessions: 3800 + (offset as i64 % 3) * 250,
            conversions: orders + 12,
            users: 3000,
            conversion_rate: None,
        });
    }

    // No market data: the USD fallback constant carries the conversion.
    let artifacts = ReportProcessor::process(
        &config,
        &RateTable::new(&config.reporting_currency),
        &sales,
        &traffic,
        &[],
        &[],
    )?;

    println!(
        "Week {} – {} vs. week before\n",
        artifacts.windows.current.start, artifacts.windows.current.end
    );
    for report in &artifacts.kpis {
        println!(
            "{:<22} {:>10.1} {:>10.1} {:>8}",
            report.kpi.label(),
            report.current_value,
            report.prior_value,
            report.change.to_string(),
        );
    }

    Ok(())
}
