// Prompt text for the per-section commentary requests. The model's output
// is pasted into the report as-is, so every prompt pins the exact format.

pub const COVERAGE_SYSTEM_CONTEXT: &str = r#"
I need you to analyze our tracking coverage rates and provide a standardized weekly report. The data compares our order management system (the source of truth) against our web analytics tracking.

## Status Indicators
Select the appropriate emoji indicator based on these criteria:
- Critical (🚨): coverage below 50%, or a significant drop versus the previous week
- Warning (⚠️): coverage below 80%, or a slight decline over several days
- Good (✅): coverage stable and at or above 80%

## Direction Indicators
- Use (↑) for increases in coverage
- Use (↓) for decreases in coverage
- Use (→) for changes smaller than 0.5 percentage points

## Output Format Requirements
Your analysis must strictly follow this format:

```
[EMOJI] *[a few words for the highlight]* - [latest_date]
[1-2 concise sentences on the most important trend.]
- *Transactions*: [primary] (orders) vs [secondary] (analytics) - *Coverage*: [rate]% ([arrow] [delta]%)
- *Revenue*: [primary] vs [secondary] - *Coverage*: [rate]% ([arrow] [delta]%)
```

## Important Notes
1. Use exactly the format shown above, including bullet points, bolding, and emoji placement
2. Round percentages to 1 decimal place
3. Format counts with thousands separators (e.g., 1,503)
4. Format revenue in thousands (K) with 1 decimal place
5. Your entire response must be exactly in this format, without any additional text
"#;

pub const KPI_SYSTEM_CONTEXT: &str = r#"
You are writing the weekly trading update for an online retailer. You receive last week's KPIs, the week before for comparison, and the percentage change per KPI.

## Output Format Requirements
```
*[one-line headline naming the most significant KPI movement]*
[2-3 sentences of analysis. Name concrete numbers. Call out any KPI that moved more than 10% in either direction, and say whether revenue and order movements are explained by traffic (sessions) or by basket changes (AOV, units per order).]
```

## Important Notes
1. Round all figures to 1 decimal place; counts are whole numbers with thousands separators
2. A change shown as +∞% means the prior week was zero; describe it as "new this week", never as an infinite increase
3. Do not speculate about causes outside the data unless a context note explicitly supports it
4. Your entire response must follow the format exactly, without any additional text
"#;

pub const PRODUCT_SYSTEM_CONTEXT: &str = r#"
You are summarizing last week's top products for an online retailer. You receive the top products by revenue, each with its revenue, share of total revenue, and week-over-week change.

## Output Format Requirements
```
*[one-line highlight naming the strongest product movement]*
- [2-4 bullets, one per notable product: name, share of revenue, and what changed]
```

## Important Notes
1. Only mention products from the table; never invent product names
2. A change shown as +∞% means the product had no revenue in the prior week; call it a new entry
3. Shares are of the full catalog's revenue, so the listed shares will not sum to 100%
4. Your entire response must follow the format exactly, without any additional text
"#;

pub fn coverage_prompt(
    transaction_table: &str,
    revenue_table: &str,
    span_start: &str,
    span_end: &str,
    latest_date: &str,
) -> String {
    format!(
        "{}\n\
         ## Context\n\
         - The data covers {} to {}\n\
         - The most recent complete day is **{}** (we hold back the last 24 hours until analytics data settles)\n\
         - Normal coverage for our business is typically between 80-95%\n\n\
         ## Transactions Coverage Data\n\
         This table shows transactions recorded by each source and the daily transaction coverage rate.\n\
         {}\n\n\
         ## Revenue Coverage Data\n\
         This table shows revenue recorded by each source and the daily revenue coverage rate.\n\
         {}",
        COVERAGE_SYSTEM_CONTEXT, span_start, span_end, latest_date, transaction_table, revenue_table
    )
}

pub fn kpi_prompt(
    kpi_table: &str,
    numeric_context: &str,
    field_definitions: &str,
    context_notes: &[String],
) -> String {
    let notes = if context_notes.is_empty() {
        "None.".to_string()
    } else {
        context_notes
            .iter()
            .map(|n| format!("- {}", n))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "{}\n\
         ## Weekly KPI Data\n\
         {}\n\n\
         ## Numeric Context (JSON)\n\
         ```json\n{}\n```\n\n\
         ## Field Definitions (JSON Schema)\n\
         ```json\n{}\n```\n\n\
         ## Context Notes\n\
         {}",
        KPI_SYSTEM_CONTEXT, kpi_table, numeric_context, field_definitions, notes
    )
}

pub fn product_prompt(product_table: &str) -> String {
    format!(
        "{}\n\
         ## Top Products Data\n\
         {}",
        PRODUCT_SYSTEM_CONTEXT, product_table
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_prompt_embeds_tables_and_dates() {
        let prompt = coverage_prompt(
            "| tx |", "| rev |", "Apr 29", "May 12, 2024", "May 12, 2024",
        );
        assert!(prompt.contains("| tx |"));
        assert!(prompt.contains("| rev |"));
        assert!(prompt.contains("Apr 29 to May 12, 2024"));
        assert!(prompt.contains("**May 12, 2024**"));
    }

    #[test]
    fn test_kpi_prompt_lists_notes() {
        let notes = vec!["Public holiday on May 9 in DE/FR".to_string()];
        let prompt = kpi_prompt("| kpis |", "{}", "{}", &notes);
        assert!(prompt.contains("- Public holiday on May 9"));

        let empty = kpi_prompt("| kpis |", "{}", "{}", &[]);
        assert!(empty.contains("None."));
    }
}
