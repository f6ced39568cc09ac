use crate::chart::{write_chart_artifact, ChartRenderer, ChartSeries, ChartSpec, RenderedChart};
use crate::error::{ReportError, Result};
use crate::feeds::{
    build_rate_table, BehavioralFeed, ContextFeed, RateFeed, ReconciliationFeed,
    TransactionalFeed,
};
use crate::kpi::{Kpi, KpiReport};
use crate::llm::{AnthropicClient, CommentaryEngine, DEFAULT_MODEL};
use crate::markup::{format_money_k, format_thousands, Document, Inline};
use crate::periods::{ComparisonWindows, ReferenceDate};
use crate::publish::{DocumentStorePublisher, EmbeddedImage, SlackPublisher};
use crate::ranking::ProductRanking;
use crate::retry::RetryPolicy;
use crate::schema::ReportConfig;
use crate::{ReportArtifacts, ReportProcessor};
use chrono::{Days, Local, NaiveDate};
use log::{info, warn};
use std::path::PathBuf;

/// Credentials and targets for one delivery environment.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub anthropic_api_key: String,
    pub model: String,
    pub slack_token: String,
    pub slack_channel_id: String,
    pub document_endpoint: Option<String>,
    pub document_api_key: Option<String>,
    /// Where chart artifacts are written for hand-off to publishing.
    pub work_dir: PathBuf,
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ReportError::MissingConfiguration(key.to_string()))
}

impl DeliveryConfig {
    /// Reads the delivery environment. Fails before any data is fetched
    /// when a required key is absent.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY")?,
            model: std::env::var("REPORT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            slack_token: required_env("SLACK_TOKEN")?,
            slack_channel_id: required_env("SLACK_CHANNEL_ID")?,
            document_endpoint: std::env::var("DOCS_ENDPOINT").ok(),
            document_api_key: std::env::var("DOCS_API_KEY").ok(),
            work_dir: std::env::var("REPORT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("weekly-report")),
        })
    }
}

/// What one run managed to publish.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub slack_message_ts: Option<String>,
    pub charts_published: usize,
    pub document_archived: bool,
}

/// One scheduled run: fetch, reconcile, comment, render, publish. The
/// run aborts only on missing configuration or a dead transactional
/// feed; every other failure degrades to a partial report.
pub struct ReportPipeline {
    config: ReportConfig,
    delivery: DeliveryConfig,
    policy: RetryPolicy,
}

impl ReportPipeline {
    pub fn new(config: ReportConfig, delivery: DeliveryConfig) -> Self {
        Self {
            config,
            delivery,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn run<T, B, C, R, X>(
        &self,
        transactional: &T,
        behavioral: &B,
        reconciliation: &C,
        rates: &R,
        context: &X,
        renderer: &dyn ChartRenderer,
    ) -> Result<RunSummary>
    where
        T: TransactionalFeed + ?Sized,
        B: BehavioralFeed + ?Sized,
        C: ReconciliationFeed + ?Sized,
        R: RateFeed + ?Sized,
        X: ContextFeed + ?Sized,
    {
        let reference = match self.config.reference_date {
            Some(date) => ReferenceDate::Date(date),
            None => ReferenceDate::Today,
        };
        let windows = ComparisonWindows::resolve(reference)?;
        let (fetch_start, fetch_end) = self.fetch_range(&windows);
        info!(
            "Running weekly report: current {}..{}, fetching {}..{}",
            windows.current.start, windows.current.end, fetch_start, fetch_end
        );

        // The transactional feed is the source of truth; without it there
        // is no report.
        let sales = transactional.fetch_sales(fetch_start, fetch_end).await?;

        // Everything else degrades to an empty series.
        let traffic = match behavioral.fetch_traffic(fetch_start, fetch_end).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Behavioral feed unavailable ({}); session KPIs will read zero", e);
                Vec::new()
            }
        };
        let product_rows = match behavioral
            .fetch_product_sales(fetch_start, fetch_end)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Product feed unavailable ({}); skipping top products", e);
                Vec::new()
            }
        };
        let coverage_rows = match reconciliation.fetch_coverage(fetch_start, fetch_end).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Reconciliation feed unavailable ({}); skipping coverage", e);
                Vec::new()
            }
        };

        let rate_table = build_rate_table(
            rates,
            &sales,
            &self.config.reporting_currency,
            self.config.rate_buffer_days,
        )
        .await;

        let artifacts = ReportProcessor::process(
            &self.config,
            &rate_table,
            &sales,
            &traffic,
            &coverage_rows,
            &product_rows,
        )?;

        let notes = context
            .fetch_notes(windows.current.start, windows.current.end)
            .await;

        let engine = CommentaryEngine::new(
            AnthropicClient::new(
                self.delivery.anthropic_api_key.clone(),
                self.delivery.model.clone(),
            ),
            self.policy,
        );
        let currency = &self.config.reporting_currency;
        let kpi_text = engine
            .kpi_commentary(
                &artifacts.kpis,
                windows.current.start,
                windows.current.end,
                currency,
                &notes,
            )
            .await;
        let coverage_text = engine
            .coverage_commentary(&artifacts.coverage, currency)
            .await;
        let product_text = if artifacts.products.top.is_empty() {
            None
        } else {
            Some(
                engine
                    .product_commentary(&artifacts.products, currency)
                    .await,
            )
        };

        let charts = self.render_charts(&artifacts, renderer);

        let document = build_report_document(
            &artifacts,
            currency,
            &kpi_text,
            &coverage_text,
            product_text.as_deref(),
        );

        self.publish(&document, &charts).await
    }

    /// Feed query range: the rolling horizon (which contains both
    /// comparison windows), cut off before today because the most recent
    /// analytics day is still settling.
    fn fetch_range(&self, windows: &ComparisonWindows) -> (NaiveDate, NaiveDate) {
        let span = self.config.horizon_days.max(14) as u64;
        let start = windows.current.end - Days::new(span - 1);
        let yesterday = Local::now().date_naive() - Days::new(1);
        (start, windows.current.end.min(yesterday))
    }

    fn render_charts(
        &self,
        artifacts: &ReportArtifacts,
        renderer: &dyn ChartRenderer,
    ) -> Vec<(ChartSpec, RenderedChart, PathBuf)> {
        let mut rendered = Vec::new();
        for spec in chart_specs(&artifacts.kpis, &artifacts.products) {
            match renderer.render(&spec) {
                Ok(chart) => match write_chart_artifact(&self.delivery.work_dir, &spec, &chart) {
                    Ok(path) => rendered.push((spec, chart, path)),
                    Err(e) => warn!("Could not write chart '{}': {}", spec.slug, e),
                },
                Err(e) => warn!("Chart '{}' failed to render: {}", spec.slug, e),
            }
        }
        rendered
    }

    async fn publish(
        &self,
        document: &Document,
        charts: &[(ChartSpec, RenderedChart, PathBuf)],
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let slack = SlackPublisher::new(
            self.delivery.slack_token.clone(),
            self.delivery.slack_channel_id.clone(),
            self.policy,
        );
        match slack.post_document(document).await {
            Ok(ts) => summary.slack_message_ts = Some(ts),
            Err(e) => warn!("Slack post failed: {}", e),
        }
        for (spec, _, path) in charts {
            match slack.upload_chart(path, &spec.title).await {
                Ok(()) => summary.charts_published += 1,
                Err(e) => warn!("Chart upload '{}' failed: {}", spec.slug, e),
            }
        }

        if let (Some(endpoint), Some(api_key)) = (
            self.delivery.document_endpoint.clone(),
            self.delivery.document_api_key.clone(),
        ) {
            let store = DocumentStorePublisher::new(endpoint, api_key, self.policy);
            // Charts are embedded alongside the body so the store never
            // references an image it has not received.
            let images: Vec<EmbeddedImage> = charts
                .iter()
                .map(|(spec, chart, _)| {
                    EmbeddedImage::new(spec.slug.clone(), chart.mime_type.clone(), &chart.bytes)
                })
                .collect();
            let title = document_title(document);
            match store.publish(&title, document, &images).await {
                Ok(()) => summary.document_archived = true,
                Err(e) => warn!("Document archive failed: {}", e),
            }
        }

        Ok(summary)
    }
}

fn document_title(document: &Document) -> String {
    use crate::markup::Block;
    document
        .blocks
        .iter()
        .find_map(|b| match b {
            Block::Heading(spans) => Some(
                spans
                    .iter()
                    .map(|s| match s {
                        Inline::Text(t) | Inline::Bold(t) => t.as_str(),
                    })
                    .collect::<String>(),
            ),
            _ => None,
        })
        .unwrap_or_else(|| "Weekly report".to_string())
}

/// Charts shipped with every report: the revenue and conversion-rate
/// timelines, plus the top products' daily revenue share.
pub fn chart_specs(kpis: &[KpiReport], products: &ProductRanking) -> Vec<ChartSpec> {
    let mut specs = Vec::new();

    for (kpi, slug, title) in [
        (Kpi::Revenue, "revenue-daily", "Daily revenue"),
        (
            Kpi::ConversionRate,
            "conversion-rate-daily",
            "Daily conversion rate",
        ),
    ] {
        if let Some(report) = kpis.iter().find(|r| r.kpi == kpi) {
            if !report.timeline.is_empty() {
                specs.push(ChartSpec {
                    slug: slug.to_string(),
                    title: title.to_string(),
                    series: vec![ChartSeries {
                        name: kpi.label().to_string(),
                        points: report.timeline.clone(),
                    }],
                });
            }
        }
    }

    let share_series: Vec<ChartSeries> = products
        .top
        .iter()
        .filter(|p| !p.share_timeline.is_empty())
        .map(|p| ChartSeries {
            name: p.product_name.clone(),
            points: p.share_timeline.clone(),
        })
        .collect();
    if !share_series.is_empty() {
        specs.push(ChartSpec {
            slug: "top-product-share".to_string(),
            title: "Top products, share of daily revenue".to_string(),
            series: share_series,
        });
    }

    specs
}

/// Assembles the full report as the tagged document model; renderers per
/// publishing target take it from here.
pub fn build_report_document(
    artifacts: &ReportArtifacts,
    currency: &str,
    kpi_text: &str,
    coverage_text: &str,
    product_text: Option<&str>,
) -> Document {
    let windows = &artifacts.windows;
    let mut doc = Document::new();

    doc.heading(vec![Inline::text(format!(
        "Weekly trading report {} – {}",
        windows.current.start, windows.current.end
    ))]);
    doc.paragraph(vec![Inline::text(kpi_text)]);
    for report in &artifacts.kpis {
        let value = match report.kpi {
            Kpi::Orders | Kpi::Sessions => format_thousands(report.current_value as i64),
            Kpi::Revenue => format_money_k(report.current_value, currency),
            Kpi::ConversionRate => format!("{:.1}%", report.current_value),
            _ => format!("{:.1}", report.current_value),
        };
        doc.bullet(vec![
            Inline::bold(report.kpi.label()),
            Inline::text(format!(": {} ({})", value, report.change)),
        ]);
    }

    let coverage = &artifacts.coverage;
    doc.heading(vec![Inline::text(format!(
        "Tracking coverage {}",
        coverage.status.indicator()
    ))]);
    doc.paragraph(vec![Inline::text(coverage_text)]);
    doc.bullet(vec![
        Inline::bold("Transactions"),
        Inline::text(format!(
            ": {} vs {} - ",
            format_thousands(coverage.current_week.primary_count),
            format_thousands(coverage.current_week.secondary_count),
        )),
        Inline::bold("Coverage"),
        Inline::text(format!(
            ": {:.1}% ({} {:+.1}%)",
            coverage.current_week.transaction_coverage,
            coverage.transaction_direction.arrow(),
            coverage.current_week.transaction_coverage - coverage.prior_week.transaction_coverage,
        )),
    ]);
    doc.bullet(vec![
        Inline::bold("Revenue"),
        Inline::text(format!(
            ": {} vs {} - ",
            format_money_k(coverage.current_week.primary_revenue, currency),
            format_money_k(coverage.current_week.secondary_revenue, currency),
        )),
        Inline::bold("Coverage"),
        Inline::text(format!(
            ": {:.1}% ({} {:+.1}%)",
            coverage.current_week.revenue_coverage,
            coverage.revenue_direction.arrow(),
            coverage.current_week.revenue_coverage - coverage.prior_week.revenue_coverage,
        )),
    ]);

    if let Some(text) = product_text {
        doc.heading(vec![Inline::text("Top products")]);
        doc.paragraph(vec![Inline::text(text)]);
        for product in &artifacts.products.top {
            doc.bullet(vec![
                Inline::bold(product.product_name.clone()),
                Inline::text(format!(
                    ": {} ({:.1}% of revenue, {})",
                    format_money_k(product.current_revenue, currency),
                    product.current_share,
                    product.change,
                )),
            ]);
        }
    }

    doc
}
