//! Report export
//!
//! Renders a [`Report`] as the budget summary table and writes it to a
//! timestamped CSV file. Rendering is pure; only [`export_report`] touches
//! the filesystem.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::aggregate::Report;
use crate::error::{Error, Result};
use crate::models::{format_magnitude, format_signed};

/// Default directory for report files
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

const TOTAL_LABEL: &str = "TOTAL";

/// One line of the summary table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "Given Category")]
    pub given_category: String,
    #[serde(rename = "Main Category")]
    pub main_category: String,
    #[serde(rename = "Subcategory")]
    pub subcategory: String,
}

impl ReportRow {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::blank()
    }
}

/// Build the summary table rows in display order
pub fn report_rows(report: &Report) -> Vec<ReportRow> {
    let mut rows = vec![
        ReportRow {
            date: "Files Processed:".to_string(),
            description: report.files.join(", "),
            ..ReportRow::default()
        },
        ReportRow::blank(),
    ];

    for group in report.buckets.groups() {
        let main = group.main.to_string();

        for sub in &group.subcategories {
            rows.push(ReportRow {
                description: format!("== {}: {} ==", main, sub.name),
                amount: format_magnitude(sub.total()),
                main_category: main.clone(),
                subcategory: sub.name.clone(),
                ..ReportRow::default()
            });

            for classified in &sub.transactions {
                let tx = &classified.transaction;
                rows.push(ReportRow {
                    date: tx.date.raw.clone(),
                    description: tx.description.clone(),
                    amount: format_signed(tx.amount),
                    account: tx.account.clone(),
                    given_category: tx.raw_category_str().to_string(),
                    main_category: main.clone(),
                    subcategory: sub.name.clone(),
                });
            }

            rows.push(ReportRow::blank());
        }

        rows.push(ReportRow {
            description: format!("=== {} {} ===", TOTAL_LABEL, main),
            amount: format_magnitude(group.total()),
            main_category: main.clone(),
            subcategory: TOTAL_LABEL.to_string(),
            ..ReportRow::default()
        });
        rows.push(ReportRow::blank());
    }

    rows.push(ReportRow {
        description: "=== OVERALL TOTAL ===".to_string(),
        amount: format_signed(report.grand_total()),
        main_category: TOTAL_LABEL.to_string(),
        subcategory: TOTAL_LABEL.to_string(),
        ..ReportRow::default()
    });

    rows
}

/// Write the summary table, with a header row, as CSV
pub fn write_report_csv<W: Write>(report: &Report, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in report_rows(report) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// File name for a report generated at `now`
pub fn report_file_name(now: NaiveDateTime) -> String {
    format!("budget_summary_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// First path in `dir` not already taken: the plain name, then `_1`, `_2`, ...
fn available_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = file_name.trim_end_matches(".csv");
    (1..)
        .map(|n| dir.join(format!("{}_{}.csv", stem, n)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Write the report into `output_dir` and return the file path
///
/// Content goes to a temporary file in the same directory first and is
/// moved into place only when complete, so a failed export leaves no
/// partial report behind.
pub fn export_report(report: &Report, output_dir: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|e| {
        Error::Export(format!(
            "Failed to create output directory {}: {}",
            output_dir.display(),
            e
        ))
    })?;

    let mut tmp = NamedTempFile::new_in(output_dir)?;
    write_report_csv(report, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;

    let path = available_path(output_dir, &report_file_name(now));
    debug!("Persisting report to {}", path.display());
    tmp.persist_noclobber(&path).map_err(|e| {
        Error::Export(format!("Failed to write {}: {}", path.display(), e.error))
    })?;

    info!("Exported report to {}", path.display());
    Ok(path)
}

/// Render the terminal summary
pub fn render_summary(report: &Report) -> String {
    let mut lines = vec![String::new(), "===== TRANSACTION SUMMARY =====".to_string()];

    for group in report.buckets.groups() {
        lines.push(String::new());
        lines.push(format!("== {} ==", group.main));

        for sub in &group.subcategories {
            lines.push(String::new());
            lines.push(format!(
                "{} ({})",
                sub.name.to_uppercase(),
                format_magnitude(sub.total())
            ));
            for classified in &sub.transactions {
                let tx = &classified.transaction;
                lines.push(format!(
                    "  {} | {} | {} | {}",
                    tx.date,
                    tx.account,
                    tx.description,
                    format_signed(tx.amount)
                ));
            }
        }

        lines.push(String::new());
        lines.push(format!(
            "Total {}: {}",
            group.main,
            format_magnitude(group.total())
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "===== OVERALL TOTAL: {} =====",
        format_signed(report.grand_total())
    ));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ClassificationOutcome, ClassifiedTransaction, MainCategory, Transaction, TransactionDate,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn classified(
        date: &str,
        description: &str,
        amount: &str,
        raw_category: Option<&str>,
        outcome: ClassificationOutcome,
    ) -> ClassifiedTransaction {
        let tx = Transaction {
            date: TransactionDate::new(date, None),
            description: description.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            account: "chase".to_string(),
            raw_category: raw_category.map(str::to_string),
            transaction_type: String::new(),
            balance: None,
            source_file: "chase_checking.csv".to_string(),
            source_line: 2,
        };
        ClassifiedTransaction::new(tx, &outcome)
    }

    fn single_groceries_report() -> Report {
        Report::build(
            vec!["chase_checking.csv".to_string()],
            vec![classified(
                "01/05/2024",
                "SAMSCLUB #1234",
                "-54.12",
                None,
                ClassificationOutcome::success(MainCategory::Spending, "groceries"),
            )],
        )
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap()
    }

    fn render(report: &Report) -> String {
        let mut buf = Vec::new();
        write_report_csv(report, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_single_transaction_csv() {
        let expected = "\
Date,Description,Amount,Account,Given Category,Main Category,Subcategory
Files Processed:,chase_checking.csv,,,,,
,,,,,,
,== Spending: groceries ==,$54.12,,,Spending,groceries
01/05/2024,SAMSCLUB #1234,-$54.12,chase,,Spending,groceries
,,,,,,
,=== TOTAL Spending ===,$54.12,,,Spending,TOTAL
,,,,,,
,=== OVERALL TOTAL ===,-$54.12,,,TOTAL,TOTAL
";
        assert_eq!(render(&single_groceries_report()), expected);
    }

    #[test]
    fn test_rows_layout_multiple_categories() {
        let report = Report::build(
            vec!["a.csv".to_string(), "b.csv".to_string()],
            vec![
                classified(
                    "01/01/2024",
                    "ACME PAYROLL",
                    "1200.00",
                    None,
                    ClassificationOutcome::success(MainCategory::Incoming, "work"),
                ),
                classified(
                    "01/02/2024",
                    "NETFLIX.COM",
                    "-15.99",
                    Some("Entertainment"),
                    ClassificationOutcome::success(MainCategory::Spending, "subscriptions"),
                ),
                classified(
                    "01/03/2024",
                    "MYSTERY",
                    "-4.01",
                    None,
                    ClassificationOutcome::failure("timeout"),
                ),
            ],
        );

        let rows = report_rows(&report);
        assert_eq!(rows[0].description, "a.csv, b.csv");
        assert!(rows[1].is_blank());

        let netflix = rows
            .iter()
            .find(|r| r.description == "NETFLIX.COM")
            .unwrap();
        assert_eq!(netflix.given_category, "Entertainment");
        assert_eq!(netflix.amount, "-$15.99");

        let unknown = rows
            .iter()
            .find(|r| r.description == "== Unknown: error ==")
            .unwrap();
        assert_eq!(unknown.amount, "$4.01");

        let last = rows.last().unwrap();
        assert_eq!(last.description, "=== OVERALL TOTAL ===");
        assert_eq!(last.amount, "+$1180.00");

        let totals: Vec<_> = rows
            .iter()
            .filter(|r| r.subcategory == "TOTAL" && r.main_category != "TOTAL")
            .map(|r| r.description.as_str())
            .collect();
        assert_eq!(
            totals,
            vec![
                "=== TOTAL Incoming ===",
                "=== TOTAL Spending ===",
                "=== TOTAL Unknown ==="
            ]
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let report = single_groceries_report();
        assert_eq!(render(&report), render(&report));
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(report_file_name(now()), "budget_summary_20240201_093005.csv");
    }

    #[test]
    fn test_export_creates_dir_and_unique_names() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("outputs");
        let report = single_groceries_report();

        let first = export_report(&report, &out, now()).unwrap();
        let second = export_report(&report, &out, now()).unwrap();

        assert_eq!(
            first.file_name().unwrap().to_str().unwrap(),
            "budget_summary_20240201_093005.csv"
        );
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "budget_summary_20240201_093005_1.csv"
        );
        assert_eq!(
            fs::read(&first).unwrap(),
            fs::read(&second).unwrap()
        );

        // Only the two reports remain; no temp files left behind
        assert_eq!(fs::read_dir(&out).unwrap().count(), 2);
    }

    #[test]
    fn test_export_to_unwritable_location_fails() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();

        let result = export_report(&single_groceries_report(), &blocker, now());
        assert!(matches!(result, Err(Error::Export(_))));
    }

    #[test]
    fn test_render_summary() {
        let summary = render_summary(&single_groceries_report());
        assert!(summary.contains("== Spending =="));
        assert!(summary.contains("GROCERIES ($54.12)"));
        assert!(summary.contains("  01/05/2024 | chase | SAMSCLUB #1234 | -$54.12"));
        assert!(summary.contains("Total Spending: $54.12"));
        assert!(summary.ends_with("===== OVERALL TOTAL: -$54.12 ====="));
    }
}
