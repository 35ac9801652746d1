//! CSV import for account exports
//!
//! Two layouts are recognized from the header record:
//! - checking/debit: `Details,Posting Date,Description,Amount,Type,Balance`
//! - credit: `Transaction Date,...,Description,Category,Type,Amount`
//!
//! Anything else is read with the credit mapping and flagged as ambiguous.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{SourceSchema, Transaction, TransactionDate};

/// Columns that identify a checking export (either spelling of the first)
const CHECKING_SIGNATURE: &[&[&str]] = &[
    &["details", "detail"],
    &["posting date"],
    &["description"],
    &["amount"],
    &["type"],
    &["balance"],
];

/// Largest accepted amount, in whole currency units
const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000;

/// Columns a credit export must have to be recognized without a warning
const CREDIT_SIGNATURE: &[&str] = &["transaction date", "description", "amount"];

/// Outcome of header inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDetection {
    pub schema: SourceSchema,
    /// True when the header matched neither signature and the credit
    /// mapping is a best-effort fallback
    pub ambiguous: bool,
}

/// A row that could not be turned into a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub file: String,
    /// 1-based CSV line, 0 when the reader could not tell
    pub line: u64,
    pub reason: String,
}

/// Transactions read from one export plus the rows that were rejected
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    pub file_name: String,
    pub account: String,
    pub detection: SchemaDetection,
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RowError>,
}

/// Column positions for the canonical fields
#[derive(Debug, Default)]
struct ColumnMap {
    date: Option<usize>,
    description: Option<usize>,
    amount: Option<usize>,
    category: Option<usize>,
    transaction_type: Option<usize>,
    balance: Option<usize>,
}

fn normalized_headers(headers: &StringRecord) -> Vec<String> {
    headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect()
}

fn position(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h.as_str()))
}

/// Detect the export layout from its header record
pub fn detect_schema(headers: &StringRecord) -> SchemaDetection {
    let cols = normalized_headers(headers);

    let is_checking = CHECKING_SIGNATURE
        .iter()
        .all(|names| position(&cols, names).is_some());
    if is_checking {
        return SchemaDetection {
            schema: SourceSchema::Checking,
            ambiguous: false,
        };
    }

    let is_credit = CREDIT_SIGNATURE
        .iter()
        .all(|name| position(&cols, &[name]).is_some());

    SchemaDetection {
        schema: SourceSchema::Credit,
        ambiguous: !is_credit,
    }
}

fn column_map(headers: &StringRecord, schema: SourceSchema) -> ColumnMap {
    let cols = normalized_headers(headers);
    match schema {
        SourceSchema::Checking => ColumnMap {
            date: position(&cols, &["posting date"]),
            description: position(&cols, &["description"]),
            amount: position(&cols, &["amount"]),
            category: None,
            transaction_type: position(&cols, &["type"]),
            balance: position(&cols, &["balance"]),
        },
        SourceSchema::Credit => ColumnMap {
            date: position(&cols, &["transaction date"]),
            description: position(&cols, &["description"]),
            amount: position(&cols, &["amount"]),
            category: position(&cols, &["category"]),
            transaction_type: position(&cols, &["type"]),
            balance: None,
        },
    }
}

/// Account name from an export file name: the text before the first `_`,
/// or the file stem when there is no underscore
pub fn account_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    match file_name.split_once('_') {
        Some((account, _)) if !account.is_empty() => account.to_string(),
        _ => path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or(file_name),
    }
}

/// Read one export file
///
/// Failing to open the file or read its header is fatal; bad rows are
/// collected in `rejected`.
pub fn normalize_file(path: &Path) -> Result<NormalizedFile> {
    let file = File::open(path)
        .map_err(|e| Error::Import(format!("Failed to open {}: {}", path.display(), e)))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    normalize_reader(file, &account_from_path(path), &file_name)
}

/// Parse CSV data into canonical transactions
pub fn normalize_reader<R: Read>(
    reader: R,
    account: &str,
    file_name: &str,
) -> Result<NormalizedFile> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let detection = detect_schema(&headers);
    let columns = column_map(&headers, detection.schema);

    if detection.ambiguous {
        warn!(
            file = %file_name,
            "Header matches no known schema, reading with credit mapping"
        );
    }

    let mut transactions = Vec::new();
    let mut rejected = Vec::new();

    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                warn!(file = %file_name, line, "Skipping unreadable record: {}", e);
                rejected.push(RowError {
                    file: file_name.to_string(),
                    line,
                    reason: format!("Unreadable record: {}", e),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        match map_record(&record, &columns, account, file_name, line) {
            Ok(tx) => transactions.push(tx),
            Err(e) => {
                warn!(file = %file_name, line, "Skipping row: {}", e);
                rejected.push(RowError {
                    file: file_name.to_string(),
                    line,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Read {} transactions from {} ({} format)",
        transactions.len(),
        file_name,
        detection.schema
    );
    debug!(rejected = rejected.len(), account, "Finished {}", file_name);

    Ok(NormalizedFile {
        file_name: file_name.to_string(),
        account: account.to_string(),
        detection,
        transactions,
        rejected,
    })
}

fn field(record: &StringRecord, col: Option<usize>) -> &str {
    col.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
}

fn map_record(
    record: &StringRecord,
    columns: &ColumnMap,
    account: &str,
    file_name: &str,
    line: u64,
) -> Result<Transaction> {
    let amount_str = columns
        .amount
        .and_then(|i| record.get(i))
        .ok_or_else(|| Error::Import("Missing amount".into()))?;
    let amount = parse_amount(amount_str)?;

    let date_str = field(record, columns.date);
    let raw_category = Some(field(record, columns.category).to_string()).filter(|s| !s.is_empty());
    let balance = match field(record, columns.balance) {
        "" => None,
        s => parse_amount(s).ok(),
    };

    Ok(Transaction {
        date: TransactionDate::new(date_str, parse_date(date_str)),
        description: field(record, columns.description).to_string(),
        amount,
        account: account.to_string(),
        raw_category,
        transaction_type: field(record, columns.transaction_type).to_string(),
        balance,
        source_file: file_name.to_string(),
        source_line: line,
    })
}

/// Parse a date string in the formats account exports use
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    // %Y accepts one to four digits, so the two-digit form must go first
    let formats = [
        "%m/%d/%y", // 01/15/24
        "%m/%d/%Y", // 01/15/2024
        "%Y-%m-%d", // 2024-01-15
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse an amount string, stripping currency symbols and thousands separators
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err(Error::Import(format!("Unable to parse amount: '{}'", s)));
    }

    let amount = Decimal::from_str(&cleaned)
        .map_err(|_| Error::Import(format!("Unable to parse amount: '{}'", s)))?;

    if amount.abs() > max_amount() {
        return Err(Error::Import(format!("Amount out of range: '{}'", s)));
    }
    Ok(amount)
}

/// Largest accepted magnitude; keeps report totals far from `Decimal` overflow
fn max_amount() -> Decimal {
    Decimal::new(MAX_AMOUNT_UNITS, 0)
}
