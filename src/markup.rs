//! Intermediate representation for report text.
//!
//! Sections are assembled as tagged spans and blocks once, then rendered
//! per publishing target (Slack mrkdwn, markdown for prompts and the
//! document store). Nothing downstream re-parses delimiter characters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inline {
    Text(String),
    Bold(String),
}

impl Inline {
    pub fn text(content: impl Into<String>) -> Self {
        Inline::Text(content.into())
    }

    pub fn bold(content: impl Into<String>) -> Self {
        Inline::Bold(content.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    Heading(Vec<Inline>),
    Paragraph(Vec<Inline>),
    Bullet(Vec<Inline>),
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(&mut self, spans: Vec<Inline>) -> &mut Self {
        self.blocks.push(Block::Heading(spans));
        self
    }

    pub fn paragraph(&mut self, spans: Vec<Inline>) -> &mut Self {
        self.blocks.push(Block::Paragraph(spans));
        self
    }

    pub fn bullet(&mut self, spans: Vec<Inline>) -> &mut Self {
        self.blocks.push(Block::Bullet(spans));
        self
    }

    pub fn table(&mut self, table: Table) -> &mut Self {
        self.blocks.push(Block::Table(table));
        self
    }
}

fn render_spans(spans: &[Inline], bold_marker: &str) -> String {
    spans
        .iter()
        .map(|span| match span {
            Inline::Text(t) => t.clone(),
            Inline::Bold(t) => format!("{}{}{}", bold_marker, t, bold_marker),
        })
        .collect()
}

fn render_pipe_table(table: &Table) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", table.headers.join(" | ")));
    out.push_str(&format!(
        "|{}|\n",
        table
            .headers
            .iter()
            .map(|_| "---")
            .collect::<Vec<_>>()
            .join("|")
    ));
    for row in &table.rows {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    out
}

/// Slack mrkdwn: `*bold*`, `•` bullets, tables as fixed-width code blocks
/// (mrkdwn has no table syntax).
#[must_use]
pub fn render_slack(document: &Document) -> String {
    let mut out = String::new();
    for block in &document.blocks {
        match block {
            Block::Heading(spans) => {
                out.push_str(&format!("*{}*\n", render_spans(spans, "")));
            }
            Block::Paragraph(spans) => {
                out.push_str(&render_spans(spans, "*"));
                out.push('\n');
            }
            Block::Bullet(spans) => {
                out.push_str(&format!("• {}\n", render_spans(spans, "*")));
            }
            Block::Table(table) => {
                out.push_str("```\n");
                out.push_str(&render_pipe_table(table));
                out.push_str("```\n");
            }
        }
    }
    out.trim_end().to_string()
}

/// Standard markdown, used for LLM prompt tables and the document store.
#[must_use]
pub fn render_markdown(document: &Document) -> String {
    let mut out = String::new();
    for block in &document.blocks {
        match block {
            Block::Heading(spans) => {
                out.push_str(&format!("## {}\n\n", render_spans(spans, "")));
            }
            Block::Paragraph(spans) => {
                out.push_str(&render_spans(spans, "**"));
                out.push_str("\n\n");
            }
            Block::Bullet(spans) => {
                out.push_str(&format!("- {}\n", render_spans(spans, "**")));
            }
            Block::Table(table) => {
                out.push_str(&render_pipe_table(table));
                out.push('\n');
            }
        }
    }
    out.trim_end().to_string()
}

/// `1503` -> `"1,503"`.
#[must_use]
pub fn format_thousands(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Revenue in thousands with one decimal: `40810.0, "EUR"` -> `"€40.8K"`.
#[must_use]
pub fn format_money_k(value: f64, currency: &str) -> String {
    let symbol = match currency {
        "EUR" => "€".to_string(),
        "USD" => "$".to_string(),
        "GBP" => "£".to_string(),
        other => format!("{} ", other),
    };
    if value.abs() >= 1000.0 {
        format!("{}{:.1}K", symbol, value / 1000.0)
    } else {
        format!("{}{:.2}", symbol, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.heading(vec![Inline::text("Weekly Report")])
            .paragraph(vec![
                Inline::text("Revenue is "),
                Inline::bold("up 12%"),
                Inline::text(" this week."),
            ])
            .bullet(vec![Inline::bold("Orders"), Inline::text(": 1,503")])
            .table(Table {
                headers: vec!["date".to_string(), "revenue".to_string()],
                rows: vec![vec!["2024-05-06".to_string(), "920.0".to_string()]],
            });
        doc
    }

    #[test]
    fn test_render_slack() {
        let rendered = render_slack(&sample());
        assert!(rendered.contains("*Weekly Report*"));
        assert!(rendered.contains("Revenue is *up 12%* this week."));
        assert!(rendered.contains("• *Orders*: 1,503"));
        assert!(rendered.contains("```\n| date | revenue |"));
    }

    #[test]
    fn test_render_markdown() {
        let rendered = render_markdown(&sample());
        assert!(rendered.contains("## Weekly Report"));
        assert!(rendered.contains("Revenue is **up 12%** this week."));
        assert!(rendered.contains("- **Orders**: 1,503"));
        assert!(rendered.contains("| 2024-05-06 | 920.0 |"));
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(7), "7");
        assert_eq!(format_thousands(1503), "1,503");
        assert_eq!(format_thousands(1234567), "1,234,567");
        assert_eq!(format_thousands(-4200), "-4,200");
    }

    #[test]
    fn test_format_money_k() {
        assert_eq!(format_money_k(40810.0, "EUR"), "€40.8K");
        assert_eq!(format_money_k(40810.0, "USD"), "$40.8K");
        assert_eq!(format_money_k(512.5, "EUR"), "€512.50");
        assert_eq!(format_money_k(40810.0, "SEK"), "SEK 40.8K");
    }
}
