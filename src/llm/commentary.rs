use crate::coverage::CoverageReport;
use crate::error::Result;
use crate::kpi::{Kpi, KpiReport};
use crate::llm::client::AnthropicClient;
use crate::llm::prompts;
use crate::markup::{
    format_money_k, format_thousands, render_markdown, Document, Table,
};
use crate::ranking::ProductRanking;
use crate::retry::{with_retry, RetryPolicy};
use log::warn;
use schemars::JsonSchema;
use serde::Serialize;

/// Placeholder published when a section's commentary could not be
/// produced. The rest of the report still goes out.
pub const COMMENTARY_UNAVAILABLE: &str = "_Commentary unavailable for this section._";

/// Numeric context handed to the commentary model alongside the tables.
#[derive(Debug, Serialize, JsonSchema)]
pub struct KpiContext {
    #[schemars(description = "First day of the reported week (Monday)")]
    pub week_start: String,
    #[schemars(description = "Last day of the reported week (Sunday)")]
    pub week_end: String,
    pub entries: Vec<KpiContextEntry>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct KpiContextEntry {
    pub name: String,
    #[schemars(description = "Value over the reported week")]
    pub current: f64,
    #[schemars(description = "Value over the week before, for comparison")]
    pub prior: f64,
    #[schemars(description = "Signed percent change; '+∞%' means the prior week was zero")]
    pub change: String,
}

impl KpiContext {
    pub fn schema_as_json() -> Result<String> {
        let schema = schemars::schema_for!(KpiContext);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

fn render_table(table: Table) -> String {
    let mut doc = Document::new();
    doc.table(table);
    render_markdown(&doc)
}

fn format_kpi_value(kpi: Kpi, value: f64, currency: &str) -> String {
    match kpi {
        Kpi::Orders | Kpi::Sessions => format_thousands(value as i64),
        Kpi::Revenue => format_money_k(value, currency),
        Kpi::AverageOrderValue => format!("{:.1}", value),
        Kpi::UnitsPerOrder => format!("{:.1}", value),
        Kpi::ConversionRate => format!("{:.1}%", value),
    }
}

pub fn kpi_table(reports: &[KpiReport], currency: &str) -> Table {
    Table {
        headers: vec![
            "KPI".to_string(),
            "Last week".to_string(),
            "Week before".to_string(),
            "Change".to_string(),
        ],
        rows: reports
            .iter()
            .map(|r| {
                vec![
                    r.kpi.label().to_string(),
                    format_kpi_value(r.kpi, r.current_value, currency),
                    format_kpi_value(r.kpi, r.prior_value, currency),
                    r.change.to_string(),
                ]
            })
            .collect(),
    }
}

/// The original daily tables, transactions and revenue separately, most
/// recent day first.
pub fn coverage_tables(report: &CoverageReport, currency: &str) -> (Table, Table) {
    let transactions = Table {
        headers: vec![
            "date".to_string(),
            "orders".to_string(),
            "analytics".to_string(),
            "coverage %".to_string(),
        ],
        rows: report
            .daily
            .iter()
            .map(|d| {
                vec![
                    d.date.to_string(),
                    format_thousands(d.primary_count),
                    format_thousands(d.secondary_count),
                    format!("{:.1}", d.transaction_coverage),
                ]
            })
            .collect(),
    };
    let revenue = Table {
        headers: vec![
            "date".to_string(),
            "orders revenue".to_string(),
            "analytics revenue".to_string(),
            "coverage %".to_string(),
        ],
        rows: report
            .daily
            .iter()
            .map(|d| {
                vec![
                    d.date.to_string(),
                    format_money_k(d.primary_revenue, currency),
                    format_money_k(d.secondary_revenue, currency),
                    format!("{:.1}", d.revenue_coverage),
                ]
            })
            .collect(),
    };
    (transactions, revenue)
}

pub fn product_table(ranking: &ProductRanking, currency: &str) -> Table {
    Table {
        headers: vec![
            "product".to_string(),
            "revenue".to_string(),
            "share %".to_string(),
            "prior share %".to_string(),
            "change".to_string(),
        ],
        rows: ranking
            .top
            .iter()
            .map(|p| {
                vec![
                    p.product_name.clone(),
                    format_money_k(p.current_revenue, currency),
                    format!("{:.1}", p.current_share),
                    format!("{:.1}", p.prior_share),
                    p.change.to_string(),
                ]
            })
            .collect(),
    }
}

/// Requests one commentary paragraph per report section. Sections are
/// independent: one exhausted retry budget degrades that section to a
/// placeholder and the others still render.
pub struct CommentaryEngine {
    client: AnthropicClient,
    policy: RetryPolicy,
}

impl CommentaryEngine {
    pub fn new(client: AnthropicClient, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    async fn request(&self, operation: &str, prompt: String) -> String {
        let result = with_retry(&self.policy, operation, || {
            self.client.complete(&prompt)
        })
        .await;

        match result {
            Ok(text) => text,
            Err(e) => {
                warn!("{} failed, publishing placeholder: {}", operation, e);
                COMMENTARY_UNAVAILABLE.to_string()
            }
        }
    }

    pub async fn kpi_commentary(
        &self,
        reports: &[KpiReport],
        week_start: chrono::NaiveDate,
        week_end: chrono::NaiveDate,
        currency: &str,
        context_notes: &[String],
    ) -> String {
        let table = render_table(kpi_table(reports, currency));
        let context = KpiContext {
            week_start: week_start.to_string(),
            week_end: week_end.to_string(),
            entries: reports
                .iter()
                .map(|r| KpiContextEntry {
                    name: r.kpi.label().to_string(),
                    current: r.current_value,
                    prior: r.prior_value,
                    change: r.change.to_string(),
                })
                .collect(),
        };
        let context_json = serde_json::to_string_pretty(&context).unwrap_or_default();
        let schema_json = KpiContext::schema_as_json().unwrap_or_default();
        let prompt = prompts::kpi_prompt(&table, &context_json, &schema_json, context_notes);
        self.request("KPI commentary", prompt).await
    }

    pub async fn coverage_commentary(&self, report: &CoverageReport, currency: &str) -> String {
        let (tx_table, rev_table) = coverage_tables(report, currency);
        let (span_start, span_end, latest) = match (report.daily.last(), report.daily.first()) {
            (Some(oldest), Some(newest)) => (
                oldest.date.format("%b %d").to_string(),
                newest.date.format("%b %d, %Y").to_string(),
                newest.date.format("%b %d, %Y").to_string(),
            ),
            _ => ("n/a".to_string(), "n/a".to_string(), "n/a".to_string()),
        };
        let prompt = prompts::coverage_prompt(
            &render_table(tx_table),
            &render_table(rev_table),
            &span_start,
            &span_end,
            &latest,
        );
        self.request("coverage commentary", prompt).await
    }

    pub async fn product_commentary(&self, ranking: &ProductRanking, currency: &str) -> String {
        let prompt = prompts::product_prompt(&render_table(product_table(ranking, currency)));
        self.request("top products commentary", prompt).await
    }
}
