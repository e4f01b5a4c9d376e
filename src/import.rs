//! Bulk transaction import with all-or-nothing semantics.
//!
//! The caller parses a file with the `codec` module, maps file columns onto transaction
//! fields (auto-mapping by header name as a starting point), and hands the table here.
//! Construction is two-pass: the whole batch is validated (every account reference
//! resolved, every date and amount parsed) before a single transaction is built, so a bad
//! row can never leave a partial import behind.

use crate::codec::Table;
use crate::model::{new_id, Account, Money, Transaction};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// The transaction fields an imported column can feed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportField {
    Date,
    CheckNum,
    Payee,
    Description,
    Payment,
    Deposit,
    Category,
    Cleared,
    /// An account name, resolved against the accounts collection.
    Account,
}

serde_plain::derive_display_from_serialize!(ImportField);

impl ImportField {
    /// Guesses the field for a file column by case-insensitive substring match, the same
    /// way a user would eyeball a header.
    pub fn guess(header: &str) -> Option<ImportField> {
        let lower = header.to_lowercase();
        const CANDIDATES: &[(&str, ImportField)] = &[
            ("date", ImportField::Date),
            ("check", ImportField::CheckNum),
            ("payment", ImportField::Payment),
            ("payee", ImportField::Payee),
            ("description", ImportField::Description),
            ("deposit", ImportField::Deposit),
            ("category", ImportField::Category),
            ("cleared", ImportField::Cleared),
            ("account", ImportField::Account),
        ];
        CANDIDATES
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, field)| *field)
    }
}

/// Maps file column names onto transaction fields.
pub type ColumnMapping = HashMap<String, ImportField>;

/// Builds the default mapping for a parsed file by guessing from its column names.
pub fn auto_map(columns: &[String]) -> ColumnMapping {
    columns
        .iter()
        .filter_map(|column| ImportField::guess(column).map(|field| (column.clone(), field)))
        .collect()
}

/// Builds transactions from a parsed table, all-or-nothing.
///
/// Rows resolve their account from the mapped account column when present (matching
/// account names case-insensitively on trimmed text), falling back to
/// `default_account_id`. Unresolvable names collect across the whole batch and abort it
/// with `Error::ImportAborted` listing the distinct offenders; date or amount problems
/// abort with `Error::Validation`. Nothing is constructed until the whole batch validates.
pub fn build_transactions(
    table: &Table,
    mapping: &ColumnMapping,
    accounts: &[Account],
    default_account_id: Option<&str>,
) -> Result<Vec<Transaction>> {
    let fields: Vec<(usize, ImportField)> = mapping
        .iter()
        .filter_map(|(column, field)| table.column_index(column).map(|ix| (ix, *field)))
        .collect();

    let by_name: HashMap<String, &str> = accounts
        .iter()
        .map(|account| (account.name.trim().to_lowercase(), account.id.as_str()))
        .collect();

    // First pass: resolve and validate the entire batch.
    let mut unresolved: Vec<String> = Vec::new();
    let mut seen_unresolved: HashSet<String> = HashSet::new();
    let mut resolved: Vec<HashMap<ImportField, String>> = Vec::new();

    for (row_ix, row) in table.rows.iter().enumerate() {
        let mut cells: HashMap<ImportField, String> = HashMap::new();
        for (column_ix, field) in &fields {
            if let Some(cell) = row.get(*column_ix) {
                cells.insert(*field, cell.trim().to_string());
            }
        }

        let account_id = match cells.get(&ImportField::Account).filter(|s| !s.is_empty()) {
            Some(name) => match by_name.get(&name.to_lowercase()) {
                Some(id) => Some(id.to_string()),
                None => {
                    if seen_unresolved.insert(name.clone()) {
                        unresolved.push(name.clone());
                    }
                    None
                }
            },
            None => default_account_id.map(str::to_string),
        };
        if account_id.is_none() && unresolved.is_empty() {
            return Err(Error::validation(format!(
                "Row {}: no account named and no target account selected",
                row_ix + 1
            )));
        }

        let date = cells
            .get(&ImportField::Date)
            .map(String::as_str)
            .unwrap_or("");
        if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            return Err(Error::validation(format!(
                "Row {}: invalid or missing date '{date}', expected YYYY-MM-DD",
                row_ix + 1
            )));
        }
        for money_field in [ImportField::Payment, ImportField::Deposit] {
            if let Some(cell) = cells.get(&money_field) {
                if Money::from_str(cell).is_err() {
                    return Err(Error::validation(format!(
                        "Row {}: invalid {money_field} amount '{cell}'",
                        row_ix + 1
                    )));
                }
            }
        }

        if let Some(account_id) = account_id {
            cells.insert(ImportField::Account, account_id);
            resolved.push(cells);
        }
    }

    if !unresolved.is_empty() {
        return Err(Error::ImportAborted { names: unresolved });
    }

    // Second pass: construct. Everything has already validated.
    let transactions = resolved
        .into_iter()
        .map(|cells| {
            let cell = |field: ImportField| cells.get(&field).cloned().unwrap_or_default();
            Ok(Transaction {
                id: new_id(),
                account_id: cell(ImportField::Account),
                date: NaiveDate::parse_from_str(&cell(ImportField::Date), "%Y-%m-%d")
                    .map_err(|e| Error::validation(e.to_string()))?,
                check_num: cell(ImportField::CheckNum),
                payee: cell(ImportField::Payee),
                description: cell(ImportField::Description),
                payment: Money::from_str(&cell(ImportField::Payment))?,
                deposit: Money::from_str(&cell(ImportField::Deposit))?,
                category: cell(ImportField::Category),
                cleared: cell(ImportField::Cleared).eq_ignore_ascii_case("true"),
                reconciliation_id: String::new(),
            })
        })
        .collect::<Result<Vec<Transaction>>>()?;
    Ok(transactions)
}
