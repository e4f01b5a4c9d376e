//! Tab naming and row mapping between the normalized model and the document's tabs.
//!
//! Every fixed tab is header-first with a stable column order; those header lists are a
//! persistence contract. Transactions are split across one tab per account, named with the
//! `txn_` prefix, and the naming policy here is a pure function of the ordered accounts
//! list so a save cycle can delete and recreate the tabs deterministically.

use crate::model::{
    Account, AccountType, Category, Metadata, Money, Payee, Reconciliation, Transaction,
    SCHEMA_VERSION,
};
use crate::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

pub const META_TAB: &str = "_meta";
pub const ACCOUNTS_TAB: &str = "accounts";
pub const PAYEES_TAB: &str = "payees";
pub const CATEGORIES_TAB: &str = "categories";
pub const RECONCILIATIONS_TAB: &str = "reconciliations";

/// Prefix carried by every per-account transaction tab.
pub const TXN_TAB_PREFIX: &str = "txn_";

/// Maximum length of a tab name, prefix included.
const MAX_TAB_NAME_LEN: usize = 100;

/// Length of the account-id fragment used to disambiguate colliding tab names.
const COLLISION_ID_LEN: usize = 4;

pub const META_HEADERS: &[&str] = &["title", "owner", "lastSaved", "version"];
pub const ACCOUNT_HEADERS: &[&str] = &[
    "id",
    "name",
    "nickname",
    "address",
    "phone",
    "webAddress",
    "type",
    "createdAt",
];
pub const PAYEE_HEADERS: &[&str] = &["id", "name"];
pub const CATEGORY_HEADERS: &[&str] = &["id", "name"];
pub const RECONCILIATION_HEADERS: &[&str] = &[
    "id",
    "accountId",
    "date",
    "statementOpeningBalance",
    "statementClosingBalance",
    "transactionIds",
];
pub const TRANSACTION_HEADERS: &[&str] = &[
    "id",
    "accountId",
    "date",
    "checkNum",
    "payee",
    "description",
    "payment",
    "deposit",
    "category",
    "cleared",
    "reconciliationId",
];

/// The fixed tabs every document carries, in creation order.
pub fn fixed_tabs() -> [&'static str; 5] {
    [
        META_TAB,
        ACCOUNTS_TAB,
        PAYEES_TAB,
        CATEGORIES_TAB,
        RECONCILIATIONS_TAB,
    ]
}

/// The header contract for a fixed tab.
pub(crate) fn fixed_tab_headers(tab: &str) -> &'static [&'static str] {
    match tab {
        META_TAB => META_HEADERS,
        ACCOUNTS_TAB => ACCOUNT_HEADERS,
        PAYEES_TAB => PAYEE_HEADERS,
        CATEGORIES_TAB => CATEGORY_HEADERS,
        _ => RECONCILIATION_HEADERS,
    }
}

/// True when `name` is a per-account transaction tab.
pub fn is_transaction_tab(name: &str) -> bool {
    name.starts_with(TXN_TAB_PREFIX)
}

/// Strips characters a tab name cannot carry and truncates so the prefixed name stays
/// within the maximum tab-name length.
pub fn sanitize_tab_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | '[' | ']'))
        .take(MAX_TAB_NAME_LEN - TXN_TAB_PREFIX.len())
        .collect()
}

/// Assigns a transaction tab name to every account, in order.
///
/// When two accounts sanitize to the same base name, every occurrence gets the first four
/// characters of its account id appended in parentheses; unique names are never suffixed.
/// The result is deterministic for a given accounts list.
pub fn assign_transaction_tabs(accounts: &[Account]) -> Vec<(String, String)> {
    let bases: Vec<String> = accounts
        .iter()
        .map(|a| sanitize_tab_name(&a.name))
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for base in &bases {
        *counts.entry(base.as_str()).or_default() += 1;
    }

    accounts
        .iter()
        .zip(&bases)
        .map(|(account, base)| {
            let name = if counts[base.as_str()] > 1 {
                let short: String = account.id.chars().take(COLLISION_ID_LEN).collect();
                format!("{TXN_TAB_PREFIX}{base} ({short})")
            } else {
                format!("{TXN_TAB_PREFIX}{base}")
            };
            (account.id.clone(), name)
        })
        .collect()
}

/// Converts a 1-based column count to its A1 column letter, e.g. 1 -> A, 27 -> AA.
pub(crate) fn column_letter(mut n: usize) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quotes a tab name for use in an A1 range.
fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

/// The whole-tab range used for reads and clears.
pub(crate) fn full_range(tab: &str) -> String {
    format!("{}!A:ZZ", quote_tab(tab))
}

/// The exact range for a header-first block of `rows` rows and `columns` columns.
pub(crate) fn block_range(tab: &str, columns: usize, rows: usize) -> String {
    format!("{}!A1:{}{rows}", quote_tab(tab), column_letter(columns))
}

/// Recovers the tab name from an A1 range, tolerating quoted and unquoted forms. Quoted
/// names may themselves contain `!` and doubled quotes.
pub(crate) fn range_tab(range: &str) -> String {
    let Some(rest) = range.strip_prefix('\'') else {
        return range.split('!').next().unwrap_or(range).to_string();
    };
    let mut name = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                name.push('\'');
            } else {
                break;
            }
        } else {
            name.push(c);
        }
    }
    name
}

/// Looks cells up by header name within one tab's rows. Built from the tab's first row,
/// so persisted files survive column reordering.
pub(crate) struct HeaderMap(HashMap<String, usize>);

impl HeaderMap {
    pub(crate) fn new(header_row: &[String]) -> Self {
        Self(
            header_row
                .iter()
                .enumerate()
                .map(|(ix, h)| (h.trim().to_string(), ix))
                .collect(),
        )
    }

    /// The cell under `header`, or an empty string when the column or cell is absent.
    pub(crate) fn cell(&self, row: &[String], header: &str) -> String {
        self.0
            .get(header)
            .and_then(|&ix| row.get(ix))
            .cloned()
            .unwrap_or_default()
    }
}

/// Parses one tab's rows into records via `parse`. The first row is the header; a missing
/// header row or zero data rows yields an empty list, not an error. Rows with no content
/// are skipped.
pub(crate) fn parse_records<T>(
    rows: &[Vec<String>],
    parse: impl Fn(&HeaderMap, &[String]) -> Result<T>,
) -> Result<Vec<T>> {
    let Some((header_row, data_rows)) = rows.split_first() else {
        return Ok(Vec::new());
    };
    let map = HeaderMap::new(header_row);
    data_rows
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| parse(&map, row))
        .collect()
}

fn parse_date(s: &str, what: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::validation(format!("Invalid {what} date '{s}', expected YYYY-MM-DD")))
}

fn parse_decimal(s: &str, what: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim())
        .map_err(|_| Error::validation(format!("Invalid {what} amount '{s}'")))
}

pub(crate) fn metadata_row(m: &Metadata) -> Vec<String> {
    vec![
        m.title.clone(),
        m.owner.clone(),
        m.last_saved.clone(),
        m.version.clone(),
    ]
}

pub(crate) fn metadata_from_row(map: &HeaderMap, row: &[String]) -> Result<Metadata> {
    let version = map.cell(row, "version");
    Ok(Metadata {
        title: map.cell(row, "title"),
        owner: map.cell(row, "owner"),
        last_saved: map.cell(row, "lastSaved"),
        version: if version.is_empty() {
            SCHEMA_VERSION.to_string()
        } else {
            version
        },
    })
}

pub(crate) fn account_row(a: &Account) -> Vec<String> {
    vec![
        a.id.clone(),
        a.name.clone(),
        a.nickname.clone(),
        a.address.clone(),
        a.phone.clone(),
        a.web_address.clone(),
        a.account_type.to_string(),
        a.created_at.clone(),
    ]
}

pub(crate) fn account_from_row(map: &HeaderMap, row: &[String]) -> Result<Account> {
    Ok(Account {
        id: map.cell(row, "id"),
        name: map.cell(row, "name"),
        nickname: map.cell(row, "nickname"),
        address: map.cell(row, "address"),
        phone: map.cell(row, "phone"),
        web_address: map.cell(row, "webAddress"),
        account_type: AccountType::from_str(&map.cell(row, "type")).unwrap_or_default(),
        created_at: map.cell(row, "createdAt"),
    })
}

pub(crate) fn payee_row(p: &Payee) -> Vec<String> {
    vec![p.id.clone(), p.name.clone()]
}

pub(crate) fn payee_from_row(map: &HeaderMap, row: &[String]) -> Result<Payee> {
    Ok(Payee {
        id: map.cell(row, "id"),
        name: map.cell(row, "name"),
    })
}

pub(crate) fn category_row(c: &Category) -> Vec<String> {
    vec![c.id.clone(), c.name.clone()]
}

pub(crate) fn category_from_row(map: &HeaderMap, row: &[String]) -> Result<Category> {
    Ok(Category {
        id: map.cell(row, "id"),
        name: map.cell(row, "name"),
    })
}

pub(crate) fn reconciliation_row(r: &Reconciliation) -> Vec<String> {
    vec![
        r.id.clone(),
        r.account_id.clone(),
        r.date.format("%Y-%m-%d").to_string(),
        format!("{:.2}", r.statement_opening_balance),
        format!("{:.2}", r.statement_closing_balance),
        r.transaction_ids.join(","),
    ]
}

pub(crate) fn reconciliation_from_row(map: &HeaderMap, row: &[String]) -> Result<Reconciliation> {
    let transaction_ids = map.cell(row, "transactionIds");
    Ok(Reconciliation {
        id: map.cell(row, "id"),
        account_id: map.cell(row, "accountId"),
        date: parse_date(&map.cell(row, "date"), "statement")?,
        statement_opening_balance: parse_decimal(
            &map.cell(row, "statementOpeningBalance"),
            "statement opening",
        )?,
        statement_closing_balance: parse_decimal(
            &map.cell(row, "statementClosingBalance"),
            "statement closing",
        )?,
        transaction_ids: transaction_ids
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

pub(crate) fn transaction_row(t: &Transaction) -> Vec<String> {
    vec![
        t.id.clone(),
        t.account_id.clone(),
        t.date.format("%Y-%m-%d").to_string(),
        t.check_num.clone(),
        t.payee.clone(),
        t.description.clone(),
        t.payment.to_string(),
        t.deposit.to_string(),
        t.category.clone(),
        if t.cleared { "TRUE" } else { "FALSE" }.to_string(),
        t.reconciliation_id.clone(),
    ]
}

pub(crate) fn transaction_from_row(map: &HeaderMap, row: &[String]) -> Result<Transaction> {
    Ok(Transaction {
        id: map.cell(row, "id"),
        account_id: map.cell(row, "accountId"),
        date: parse_date(&map.cell(row, "date"), "transaction")?,
        check_num: map.cell(row, "checkNum"),
        payee: map.cell(row, "payee"),
        description: map.cell(row, "description"),
        payment: Money::from_str(&map.cell(row, "payment"))?,
        deposit: Money::from_str(&map.cell(row, "deposit"))?,
        category: map.cell(row, "category"),
        cleared: map.cell(row, "cleared").eq_ignore_ascii_case("true"),
        reconciliation_id: map.cell(row, "reconciliationId"),
    })
}
