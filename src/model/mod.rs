//! Types that represent the core data model, such as `Account` and `Transaction`.
mod money;

pub use money::{Money, MoneyError};

use chrono::{NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The schema version tag written to the metadata tab.
pub const SCHEMA_VERSION: &str = "1";

/// Generates a new opaque entity id. Uniqueness within the document is the only invariant.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// The current time as an RFC 3339 timestamp string, the format used for `created_at` and
/// `last_saved` stamps.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The kind of bank account.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
}

serde_plain::derive_display_from_serialize!(AccountType);
serde_plain::derive_fromstr_from_deserialize!(AccountType);

/// A bank account. Deleting one cascades to every transaction that references it.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    /// Required, non-empty.
    pub name: String,
    /// Optional display override for `name`.
    pub nickname: String,
    pub address: String,
    pub phone: String,
    pub web_address: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl Account {
    /// Creates an account with a fresh id and creation stamp.
    pub fn new(name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            account_type,
            created_at: timestamp(),
            ..Self::default()
        }
    }

    /// The nickname when set, otherwise the account name.
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.name
        } else {
            &self.nickname
        }
    }
}

/// A single register entry. `payment` is money out, `deposit` is money in; one, the other,
/// or neither may be populated, never meaningfully both.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub check_num: String,
    pub payee: String,
    pub description: String,
    pub payment: Money,
    pub deposit: Money,
    pub category: String,
    /// True once the transaction has been matched against a bank statement.
    pub cleared: bool,
    /// Empty until set by a reconciliation.
    pub reconciliation_id: String,
}

impl Transaction {
    /// The signed amount this entry contributes to a balance: deposit minus payment.
    pub fn signed_amount(&self) -> Decimal {
        self.deposit.value() - self.payment.value()
    }

    /// Applies a partial update in place.
    pub fn apply(&mut self, patch: &TransactionPatch) {
        if let Some(cleared) = patch.cleared {
            self.cleared = cleared;
        }
        if let Some(reconciliation_id) = &patch.reconciliation_id {
            self.reconciliation_id = reconciliation_id.clone();
        }
    }
}

/// A partial transaction update, keyed by id, as carried by the batch-update action.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub id: String,
    pub cleared: Option<bool>,
    pub reconciliation_id: Option<String>,
}

/// A payee name the user has entered at least once.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Payee {
    pub id: String,
    pub name: String,
}

/// A spending category name.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// The record of one completed statement reconciliation. Immutable once created; there is
/// no un-reconcile.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub id: String,
    pub account_id: String,
    /// The statement date.
    pub date: NaiveDate,
    pub statement_opening_balance: Decimal,
    pub statement_closing_balance: Decimal,
    /// The ids of the transactions this reconciliation cleared.
    pub transaction_ids: Vec<String>,
}

/// Document-level metadata, stored as the single row of the metadata tab.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: String,
    pub owner: String,
    /// RFC 3339 stamp of the last successful save.
    pub last_saved: String,
    pub version: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            owner: String::new(),
            last_saved: String::new(),
            version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Represents all the collections of one ledger document.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LedgerData {
    pub metadata: Metadata,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub payees: Vec<Payee>,
    pub categories: Vec<Category>,
    pub reconciliations: Vec<Reconciliation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_account_type_round_trip() {
        assert_eq!(AccountType::Checking.to_string(), "checking");
        assert_eq!(AccountType::Savings.to_string(), "savings");
        assert_eq!(
            AccountType::from_str("savings").unwrap(),
            AccountType::Savings
        );
        assert!(AccountType::from_str("brokerage").is_err());
    }

    #[test]
    fn test_new_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn test_signed_amount() {
        let txn = Transaction {
            payment: Money::from_str("10.00").unwrap(),
            deposit: Money::empty(),
            ..Transaction::default()
        };
        assert_eq!(txn.signed_amount(), Decimal::from_str("-10.00").unwrap());
    }

    #[test]
    fn test_apply_patch() {
        let mut txn = Transaction::default();
        txn.apply(&TransactionPatch {
            id: txn.id.clone(),
            cleared: Some(true),
            reconciliation_id: Some("rec-1".to_string()),
        });
        assert!(txn.cleared);
        assert_eq!(txn.reconciliation_id, "rec-1");
    }

    #[test]
    fn test_metadata_default_version() {
        assert_eq!(Metadata::default().version, "1");
    }

    #[test]
    fn test_display_name_prefers_nickname() {
        let mut account = Account::new("First National Checking", AccountType::Checking);
        assert_eq!(account.display_name(), "First National Checking");
        account.nickname = "Everyday".to_string();
        assert_eq!(account.display_name(), "Everyday");
    }
}
