//! Comma- and tab-delimited text codecs for import and export.
//!
//! The CSV variant is plain header-first parsing. The tab-delimited variant understands
//! register exports: it locates the column header row amid leading title/footer lines by
//! looking for the `Date` column, drops rows whose date cell does not parse as a date, and
//! the export side can prepend a title/date-range preamble and append payment/deposit
//! totals.

use crate::Result;
use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// The column used to find the header row and to qualify data rows in register exports.
const DATE_COLUMN: &str = "Date";
const PAYMENT_COLUMN: &str = "Payment";
const DEPOSIT_COLUMN: &str = "Deposit";

/// A parsed delimited file: ordered column names plus rows aligned to them.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// The index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The cell under `column` in `row`, or an empty string.
    pub fn cell<'a>(&self, row: &'a [String], column: &str) -> &'a str {
        self.column_index(column)
            .and_then(|ix| row.get(ix))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Parses comma-delimited text; the first record is the header row.
pub fn parse_csv(text: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();
    let columns = match records.next() {
        Some(header) => header?.iter().map(|f| f.trim().to_string()).collect(),
        None => return Ok(Table::default()),
    };
    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    Ok(Table { columns, rows })
}

/// Serializes a table as comma-delimited text with a header row.
pub fn serialize_csv(table: &Table) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .context("Failed to flush CSV writer")?;
    String::from_utf8(bytes)
        .context("CSV output was not UTF-8")
        .map_err(Into::into)
}

/// Matches M/D/YYYY, MM/DD/YYYY, or YYYY-MM-DD.
fn looks_like_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%m/%d/%Y").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Parses a tab-delimited register export.
///
/// The header row is the first tab-separated line of three or more fields containing a
/// `Date` column; anything above it (titles, date ranges) is skipped, and rows below it
/// are kept only when their date cell parses as a date, which drops totals footers. With
/// no recognizable header row, the first non-empty line is used.
pub fn parse_tsv(text: &str) -> Table {
    let lines: Vec<&str> = text.split(['\r', '\n']).collect();

    let mut header_index = None;
    let mut columns: Vec<String> = Vec::new();
    for (ix, line) in lines.iter().enumerate() {
        let parts: Vec<&str> = line.split('\t').map(str::trim).collect();
        if parts.len() >= 3 && parts.contains(&DATE_COLUMN) {
            header_index = Some(ix);
            columns = parts.iter().map(|s| s.to_string()).collect();
            break;
        }
    }
    if header_index.is_none() {
        for (ix, line) in lines.iter().enumerate() {
            if !line.trim().is_empty() {
                header_index = Some(ix);
                columns = line.split('\t').map(|s| s.trim().to_string()).collect();
                break;
            }
        }
    }
    let Some(header_index) = header_index else {
        return Table::default();
    };

    let date_index = columns.iter().position(|c| c == DATE_COLUMN);
    let mut rows = Vec::new();
    for line in &lines[header_index + 1..] {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<String> = line.split('\t').map(|s| s.trim().to_string()).collect();
        if let Some(date_index) = date_index {
            let date_cell = parts.get(date_index).map(String::as_str).unwrap_or("");
            if !looks_like_date(date_cell) {
                continue;
            }
        }
        // Align the row to the header width.
        let mut row = parts;
        row.resize(columns.len(), String::new());
        rows.push(row);
    }

    // Drop unnamed trailing columns from the header.
    let named: Vec<String> = columns.iter().filter(|c| !c.is_empty()).cloned().collect();
    if named.len() != columns.len() {
        let keep: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(ix, _)| ix)
            .collect();
        rows = rows
            .into_iter()
            .map(|row| keep.iter().map(|&ix| row[ix].clone()).collect())
            .collect();
        return Table { columns: named, rows };
    }

    Table { columns, rows }
}

/// Optional preamble lines for a register export.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TsvOptions {
    pub title: Option<String>,
    pub date_range: Option<String>,
}

fn column_total(table: &Table, column: &str) -> Decimal {
    let Some(ix) = table.column_index(column) else {
        return Decimal::ZERO;
    };
    table
        .rows
        .iter()
        .map(|row| {
            row.get(ix)
                .and_then(|cell| Decimal::from_str(cell.trim()).ok())
                .unwrap_or_default()
        })
        .sum()
}

/// Serializes a table as a tab-delimited register export with optional title and date
/// range lines and, when payment or deposit columns are present, a totals footer. Lines
/// are CRLF-joined.
pub fn serialize_tsv(table: &Table, options: &TsvOptions) -> String {
    if table.rows.is_empty() && table.columns.is_empty() {
        return String::new();
    }
    let mut lines: Vec<String> = Vec::new();

    if let Some(title) = &options.title {
        lines.push(title.clone());
        lines.push(String::new());
    }
    if let Some(date_range) = &options.date_range {
        lines.push(date_range.clone());
        lines.push(String::new());
    }

    lines.push(table.columns.join("\t"));
    for row in &table.rows {
        lines.push(row.join("\t"));
    }

    let has_payment = table.column_index(PAYMENT_COLUMN).is_some();
    let has_deposit = table.column_index(DEPOSIT_COLUMN).is_some();
    if has_payment || has_deposit {
        lines.push(String::new());
        if has_deposit {
            lines.push(format!(
                "Total Deposits\t{:.2}",
                column_total(table, DEPOSIT_COLUMN)
            ));
        }
        if has_payment {
            lines.push(format!(
                "Total Payments\t{:.2}",
                column_total(table, PAYMENT_COLUMN)
            ));
        }
        if has_deposit && has_payment {
            let net = column_total(table, DEPOSIT_COLUMN) - column_total(table, PAYMENT_COLUMN);
            lines.push(format!("Net Total\t{net:.2}"));
        }
    }

    lines.join("\r\n")
}
