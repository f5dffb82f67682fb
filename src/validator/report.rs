//! Self-contained HTML validation report.
//!
//! One collapsible `<details>` section per [`ReportSection`], in fixed order,
//! each with its total and a few example rows. The document is built in
//! memory; writing it is the caller's job.

use super::types::{Finding, ReportSection, ValidationOutcome};
use anyhow::Result;
use polars::prelude::*;

const CSS_STYLE: &str = r"<style>
body { font-family: 'Segoe UI', sans-serif; background-color: #f0fff4; color: #333; padding: 20px; }
h1 { color: #2e7d32; }
details { background-color: #e6f4ea; margin: 10px 0; padding: 10px; border-radius: 8px; }
summary { font-weight: bold; cursor: pointer; }
table { border-collapse: collapse; width: 100%; margin-top: 10px; }
th, td { border: 1px solid #999; padding: 8px; text-align: left; }
th { background-color: #a5d6a7; color: #000; }
.meta, .note { color: #555; }
</style>";

/// Rendered in place of a missing cell.
const MISSING_CELL: &str = "—";

pub fn render_html(
    outcome: &ValidationOutcome,
    source_name: &str,
    preview_limit: usize,
) -> Result<String> {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
    html.push_str("<title>Validation Report</title>");
    html.push_str(CSS_STYLE);
    html.push_str("</head><body>\n<h1>Data Validation Report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\"><b>Source:</b> {} &middot; <b>Rows:</b> {} &middot; <b>Columns:</b> {} &middot; <b>Flagged rows:</b> {}</p>\n",
        escape_html(source_name),
        outcome.row_count,
        outcome.column_count,
        outcome.flagged.distinct_row_count()
    ));

    for skipped in &outcome.skipped {
        html.push_str(&format!(
            "<p class=\"note\">Check <code>{}</code> did not run: {}</p>\n",
            escape_html(&skipped.detector),
            escape_html(&skipped.reason)
        ));
    }

    for section in ReportSection::ALL {
        let findings: Vec<&Finding> = outcome.flagged.in_section(section).collect();
        let total = outcome.section_total(section);
        render_section(&mut html, section, &findings, total, preview_limit)?;
    }

    html.push_str("</body></html>\n");
    Ok(html)
}

fn render_section(
    html: &mut String,
    section: ReportSection,
    findings: &[&Finding],
    total: usize,
    preview_limit: usize,
) -> Result<()> {
    let title = section.title();

    if total == 0 {
        html.push_str(&format!(
            "<details><summary>{title}</summary><p>No {title} found.</p></details>\n"
        ));
        return Ok(());
    }

    html.push_str(&format!(
        "<details><summary>{title} ({total} rows)</summary><p><b>Total:</b> {total}</p>\n"
    ));

    let Some(first) = findings.first() else {
        return Ok(());
    };
    html.push_str("<table>\n<tr><th>issue</th>");
    for name in first.rows.get_column_names() {
        html.push_str(&format!("<th>{}</th>", escape_html(name)));
    }
    html.push_str("</tr>\n");

    let mut shown = 0;
    'rows: for finding in findings {
        let columns = finding.rows.get_columns();
        for row in 0..finding.rows.height() {
            if shown >= preview_limit {
                break 'rows;
            }
            html.push_str(&format!("<tr><td>{}</td>", escape_html(&finding.label)));
            for column in columns {
                let cell = cell_text(column.as_materialized_series(), row)?;
                html.push_str(&format!("<td>{}</td>", escape_html(&cell)));
            }
            html.push_str("</tr>\n");
            shown += 1;
        }
    }
    html.push_str("</table>\n");

    if total > shown {
        html.push_str("<p>...and more rows not shown</p>\n");
    }
    html.push_str("</details>\n");
    Ok(())
}

/// Dataset columns are `Int64`, `Float64` or `String`.
fn cell_text(series: &Series, row: usize) -> Result<String> {
    let text = match series.dtype() {
        DataType::Int64 => series.i64()?.get(row).map(|v| v.to_string()),
        DataType::Float64 => series.f64()?.get(row).map(|v| v.to_string()),
        DataType::String => series.str()?.get(row).map(str::to_owned),
        _ => match series.get(row)? {
            AnyValue::Null => None,
            other => Some(other.to_string()),
        },
    };
    Ok(text.unwrap_or_else(|| MISSING_CELL.to_owned()))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_cell_text_formats_numbers_and_missing() -> Result<()> {
        let s = Series::new("v".into(), vec![Some(12.0), None, Some(-0.5)]);
        assert_eq!(cell_text(&s, 0)?, "12");
        assert_eq!(cell_text(&s, 1)?, MISSING_CELL);
        assert_eq!(cell_text(&s, 2)?, "-0.5");

        let ids = Series::new("id".into(), vec![Some(9_007_199_254_740_993_i64), None]);
        assert_eq!(cell_text(&ids, 0)?, "9007199254740993");
        assert_eq!(cell_text(&ids, 1)?, MISSING_CELL);
        Ok(())
    }
}
