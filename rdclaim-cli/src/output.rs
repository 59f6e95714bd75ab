use anyhow::{Context, Result};
use clap::ValueEnum;
use rdclaim_engine::{claim_summary, line_breakdown, person_summary, ClaimWorkspace};
use rust_decimal::Decimal;
use serde::Serialize;
use shared_types::{ClaimSummary, LineBreakdownRow, LineStatus, PersonSummary};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// CT600L-ready claim summary
    Summary,
    /// One row per line item
    Breakdown,
    /// Totals per employee or supplier
    People,
}

pub fn write_report<W: Write>(
    workspace: &ClaimWorkspace,
    kind: ReportKind,
    format: OutputFormat,
    writer: W,
) -> Result<()> {
    match (kind, format) {
        (ReportKind::Summary, OutputFormat::Json) => write_json(&claim_summary(workspace), writer),
        (ReportKind::Breakdown, OutputFormat::Json) => {
            write_json(&line_breakdown(workspace), writer)
        }
        (ReportKind::People, OutputFormat::Json) => write_json(&person_summary(workspace), writer),
        (ReportKind::Summary, OutputFormat::Csv) => {
            write_csv(summary_rows(&claim_summary(workspace)), writer)
        }
        (ReportKind::Breakdown, OutputFormat::Csv) => write_csv(
            line_breakdown(workspace).iter().map(BreakdownCsvRow::from),
            writer,
        ),
        (ReportKind::People, OutputFormat::Csv) => write_csv(
            person_summary(workspace).iter().map(PersonCsvRow::from),
            writer,
        ),
    }
}

fn write_json<T: Serialize, W: Write>(value: &T, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value).context("Failed to write JSON report")?;
    writeln!(writer)?;
    Ok(())
}

fn write_csv<T: Serialize, W: Write>(rows: impl IntoIterator<Item = T>, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer
            .serialize(row)
            .context("Failed to write CSV row")?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SummaryCsvRow {
    item: String,
    value: String,
}

fn summary_rows(summary: &ClaimSummary) -> Vec<SummaryCsvRow> {
    let row = |item: &str, value: String| SummaryCsvRow {
        item: item.to_string(),
        value,
    };

    let mut rows = vec![
        row("Company", summary.company.clone()),
        row("Claim", summary.claim_name.clone()),
        row(
            "Accounting period",
            format!("{} to {}", summary.period_start, summary.period_end),
        ),
        row("Scheme", summary.scheme.to_string()),
    ];

    for category in &summary.categories {
        rows.push(row(
            &format!("{} gross", category.display_name),
            category.gross.to_string(),
        ));
        rows.push(row(
            &format!("{} qualifying", category.display_name),
            category.qualifying.to_string(),
        ));
        if category.under_review > Decimal::ZERO {
            rows.push(row(
                &format!("{} under review", category.display_name),
                category.under_review.to_string(),
            ));
        }
    }

    rows.push(row("Gross costs", summary.gross_costs.to_string()));
    rows.push(row(
        "Qualifying before caps",
        summary.qualifying_before_caps.to_string(),
    ));
    if let Some(cap) = &summary.paye_cap {
        rows.push(row("PAYE cap", cap.cap.to_string()));
        rows.push(row("PAYE cap binding", cap.binding.to_string()));
    }
    rows.push(row(
        "Qualifying expenditure",
        summary.qualifying_expenditure.to_string(),
    ));
    rows.push(row("Grant adjustments", summary.grant_adjustments.to_string()));
    rows.push(row("Net qualifying", summary.net_qualifying.to_string()));
    rows.push(row("Credit rate", format!("{}%", summary.credit_rate)));
    rows.push(row("Estimated credit", summary.estimated_credit.to_string()));
    rows.push(row("Line items", summary.line_count.to_string()));
    rows.push(row("Excluded lines", summary.excluded_lines.to_string()));
    rows.push(row("Pending lines", summary.pending_lines.to_string()));
    for flag in &summary.claim_flags {
        rows.push(row("Flag", flag.clone()));
    }

    rows
}

#[derive(Debug, Serialize)]
struct BreakdownCsvRow {
    name: String,
    category: &'static str,
    date: String,
    description: String,
    gross: Decimal,
    rd_percentage: String,
    qualifying: Decimal,
    under_review: Decimal,
    connection: String,
    status: &'static str,
    flags: String,
    annotations: usize,
}

impl From<&LineBreakdownRow> for BreakdownCsvRow {
    fn from(row: &LineBreakdownRow) -> Self {
        Self {
            name: row.name.clone(),
            category: row.category.display_name(),
            date: row.date.format("%Y-%m-%d").to_string(),
            description: row.description.clone(),
            gross: row.gross,
            rd_percentage: row.rd_percentage.clone(),
            qualifying: row.qualifying,
            under_review: row.under_review,
            connection: row.connection.clone(),
            status: match row.status {
                LineStatus::Included => "Included",
                LineStatus::Excluded => "Excluded",
                LineStatus::Pending => "Pending",
            },
            flags: row
                .flags
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            annotations: row.annotations,
        }
    }
}

#[derive(Debug, Serialize)]
struct PersonCsvRow {
    name: String,
    categories: String,
    gross: Decimal,
    qualifying: Decimal,
    line_count: usize,
}

impl From<&PersonSummary> for PersonCsvRow {
    fn from(person: &PersonSummary) -> Self {
        Self {
            name: person.name.clone(),
            categories: person
                .categories
                .iter()
                .map(|c| c.display_name())
                .collect::<Vec<_>>()
                .join("; "),
            gross: person.gross,
            qualifying: person.qualifying,
            line_count: person.line_count,
        }
    }
}
