//! Runs the full pipeline against synthetic feeds and the real delivery
//! targets (Anthropic commentary + Slack, plus the document store when
//! configured).
//!
//! Required environment (a `.env` file works):
//!   ANTHROPIC_API_KEY, SLACK_TOKEN, SLACK_CHANNEL_ID
//! Optional: REPORT_MODEL, DOCS_ENDPOINT, DOCS_API_KEY, REPORT_WORK_DIR
//!
//! Run with: cargo run --example weekly_report --features reporting

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use weekly_report_builder::chart::{ChartRenderer, ChartSpec, RenderedChart};
use weekly_report_builder::feeds::{
    BehavioralFeed, NoContext, RateFeed, ReconciliationFeed, TransactionalFeed,
};
use weekly_report_builder::*;

/// Deterministic sample data standing in for the warehouse feeds.
struct SampleFeeds;

fn each_day(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = (u64, NaiveDate)> {
    let days = (end - start).num_days().max(0) as u64;
    (0..=days).map(move |offset| (offset, start + Days::new(offset)))
}

#[async_trait]
impl TransactionalFeed for SampleFeeds {
    async fn fetch_sales(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> error::Result<Vec<SalesRow>> {
        let mut rows = Vec::new();
        for (offset, date) in each_day(start, end) {
            let orders = 95 + (offset as i64 % 6) * 9;
            rows.push(SalesRow {
                date,
                currency: "EUR".to_string(),
                orders,
                revenue: orders as f64 * 51.7,
                discount: orders as f64 * 1.9,
                units: orders * 2,
            });
            rows.push(SalesRow {
                date,
                currency: "USD".to_string(),
                orders: 18,
                revenue: 940.0,
                discount: 40.0,
                units: 30,
            });
        }
        Ok(rows)
    }
}

#[async_trait]
impl BehavioralFeed for SampleFeeds {
    async fn fetch_traffic(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> error::Result<Vec<TrafficRow>> {
        Ok(each_day(start, end)
            .map(|(offset, date)| TrafficRow {
                date,
                sessions: 4100 + (offset as i64 % 4) * 180,
                conversions: 100 + (offset as i64 % 6) * 8,
                users: 3300,
                conversion_rate: None,
            })
            .collect())
    }

    async fn fetch_product_sales(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> error::Result<Vec<ProductRow>> {
        let catalog = [
            ("brew-01", "Pour-Over Brewer", 880.0),
            ("brew-02", "Cold Brew Bottle", 510.0),
            ("grind-11", "Burr Grinder", 420.0),
            ("cup-07", "Espresso Cups (4pc)", 260.0),
            ("filt-03", "Paper Filters", 120.0),
            ("scale-02", "Brewing Scale", 95.0),
        ];
        let mut rows = Vec::new();
        for (offset, date) in each_day(start, end) {
            for (id, name, base) in catalog {
                rows.push(ProductRow {
                    date,
                    product_id: id.to_string(),
                    product_name: name.to_string(),
                    category: Some("Coffee".to_string()),
                    revenue: base * (1.0 + (offset % 5) as f64 * 0.04),
                    quantity: 4,
                });
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl ReconciliationFeed for SampleFeeds {
    async fn fetch_coverage(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> error::Result<Vec<CoverageRow>> {
        Ok(each_day(start, end)
            .map(|(offset, date)| {
                let primary = 113 + (offset as i64 % 6) * 9;
                let secondary = primary * (78 + offset as i64 % 12) / 100;
                CoverageRow {
                    date,
                    primary_count: Some(primary),
                    secondary_count: Some(secondary),
                    primary_revenue: Some(primary as f64 * 51.7),
                    secondary_revenue: Some(secondary as f64 * 50.9),
                }
            })
            .collect())
    }
}

#[async_trait]
impl RateFeed for SampleFeeds {
    async fn fetch_rates(
        &self,
        _currency: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> error::Result<Vec<RateSample>> {
        // Simulate a dark market feed: the fallback constants take over.
        Ok(Vec::new())
    }
}

/// Minimal SVG line renderer, enough to hand an image artifact to the
/// publishers.
struct SvgLineRenderer;

impl ChartRenderer for SvgLineRenderer {
    fn render(&self, spec: &ChartSpec) -> error::Result<RenderedChart> {
        const W: f64 = 640.0;
        const H: f64 = 240.0;

        let max = spec
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.value))
            .fold(1.0_f64, f64::max);

        let mut body = String::new();
        for (i, series) in spec.series.iter().enumerate() {
            if series.points.len() < 2 {
                continue;
            }
            let n = (series.points.len() - 1) as f64;
            let coords: Vec<String> = series
                .points
                .iter()
                .enumerate()
                .map(|(j, p)| {
                    let x = j as f64 / n * (W - 20.0) + 10.0;
                    let y = H - 20.0 - (p.value / max * (H - 40.0));
                    format!("{:.1},{:.1}", x, y)
                })
                .collect();
            let hue = (i * 67) % 360;
            body.push_str(&format!(
                "<polyline fill=\"none\" stroke=\"hsl({},60%,45%)\" stroke-width=\"2\" points=\"{}\"/>",
                hue,
                coords.join(" ")
            ));
        }

        let svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{W}\" height=\"{H}\">\
             <text x=\"10\" y=\"16\" font-family=\"sans-serif\" font-size=\"13\">{}</text>{}</svg>",
            spec.title, body
        );

        Ok(RenderedChart {
            mime_type: "image/svg+xml".to_string(),
            bytes: svg.into_bytes(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let delivery = DeliveryConfig::from_env()?;
    let config = ReportConfig::default();

    let pipeline = ReportPipeline::new(config, delivery);
    let summary = pipeline
        .run(
            &SampleFeeds,
            &SampleFeeds,
            &SampleFeeds,
            &SampleFeeds,
            &NoContext,
            &SvgLineRenderer,
        )
        .await?;

    println!(
        "Published: slack ts {:?}, {} charts, document archived: {}",
        summary.slack_message_ts, summary.charts_published, summary.document_archived
    );

    Ok(())
}
