//! The statement-reconciliation engine.
//!
//! Stateless computations over a statement's declared balances and a selected subset of an
//! account's uncleared transactions. Nothing here mutates the model; `commit` produces the
//! immutable reconciliation record and the batch of cleared patches for the store to
//! dispatch.

use crate::model::{new_id, Reconciliation, Transaction, TransactionPatch};
use crate::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// The balances a bank statement declares for one account.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Statement {
    pub account_id: String,
    /// The statement date.
    pub date: NaiveDate,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
}

/// The computed outcome of checking selected transactions against a statement.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Summary {
    /// Sum of (deposit - payment) over the selected transactions.
    pub selected_total: Decimal,
    /// Opening balance plus the selected total.
    pub expected_balance: Decimal,
    /// Statement closing balance minus the expected balance.
    pub difference: Decimal,
    /// True when the difference is within the half-cent tolerance.
    pub balanced: bool,
}

/// Half a cent. Differences smaller than this count as balanced, absorbing rounding noise
/// from upstream data entry.
fn tolerance() -> Decimal {
    Decimal::new(5, 3)
}

/// The account's uncleared transactions, date ascending, insertion order on equal dates.
/// This is the pool the user selects from while working a statement.
pub fn uncleared_transactions<'a>(
    transactions: &'a [Transaction],
    account_id: &str,
) -> Vec<&'a Transaction> {
    let mut uncleared: Vec<&Transaction> = transactions
        .iter()
        .filter(|txn| txn.account_id == account_id && !txn.cleared)
        .collect();
    uncleared.sort_by_key(|txn| txn.date);
    uncleared
}

/// Computes the expected balance and difference for the selected subset.
pub fn summarize(statement: &Statement, selected: &[&Transaction]) -> Summary {
    let selected_total: Decimal = selected.iter().map(|txn| txn.signed_amount()).sum();
    let expected_balance = statement.opening_balance + selected_total;
    let difference = statement.closing_balance - expected_balance;
    Summary {
        selected_total,
        expected_balance,
        difference,
        balanced: difference.abs() < tolerance(),
    }
}

/// Produces the reconciliation record and the batch update that clears the selected
/// transactions.
///
/// Refuses when the statement does not balance, so an unbalanced selection can never
/// produce mutations no matter what the caller does. Callers should still gate the
/// confirmation step on `Summary::balanced`.
pub fn commit(
    statement: &Statement,
    selected: &[&Transaction],
) -> Result<(Reconciliation, Vec<TransactionPatch>)> {
    let summary = summarize(statement, selected);
    if !summary.balanced {
        return Err(Error::validation(format!(
            "The statement does not balance; the difference is {:.2}",
            summary.difference
        )));
    }
    let reconciliation = Reconciliation {
        id: new_id(),
        account_id: statement.account_id.clone(),
        date: statement.date,
        statement_opening_balance: statement.opening_balance,
        statement_closing_balance: statement.closing_balance,
        transaction_ids: selected.iter().map(|txn| txn.id.clone()).collect(),
    };
    let patches = selected
        .iter()
        .map(|txn| TransactionPatch {
            id: txn.id.clone(),
            cleared: Some(true),
            reconciliation_id: Some(reconciliation.id.clone()),
        })
        .collect();
    Ok((reconciliation, patches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Money;
    use std::str::FromStr;

    fn txn(id: &str, account_id: &str, day: u32, payment: &str, deposit: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            account_id: account_id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            payment: Money::from_str(payment).unwrap(),
            deposit: Money::from_str(deposit).unwrap(),
            ..Transaction::default()
        }
    }

    fn statement(opening: &str, closing: &str) -> Statement {
        Statement {
            account_id: "acct-1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            opening_balance: Decimal::from_str(opening).unwrap(),
            closing_balance: Decimal::from_str(closing).unwrap(),
        }
    }

    #[test]
    fn test_uncleared_filters_and_sorts() {
        let mut cleared = txn("t1", "acct-1", 5, "1.00", "");
        cleared.cleared = true;
        let transactions = vec![
            txn("t2", "acct-1", 9, "2.00", ""),
            cleared,
            txn("t3", "acct-2", 1, "3.00", ""),
            txn("t4", "acct-1", 2, "4.00", ""),
        ];
        let uncleared = uncleared_transactions(&transactions, "acct-1");
        let ids: Vec<&str> = uncleared.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t4", "t2"]);
    }

    #[test]
    fn test_equal_dates_keep_insertion_order() {
        let transactions = vec![
            txn("first", "acct-1", 10, "1.00", ""),
            txn("second", "acct-1", 10, "2.00", ""),
            txn("third", "acct-1", 10, "3.00", ""),
        ];
        let ids: Vec<&str> = uncleared_transactions(&transactions, "acct-1")
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_worked_example_balances() {
        let transactions = vec![
            txn("t1", "acct-1", 1, "", "60.00"),
            txn("t2", "acct-1", 2, "10.00", ""),
        ];
        let selected: Vec<&Transaction> = transactions.iter().collect();
        let summary = summarize(&statement("100.00", "150.00"), &selected);
        assert_eq!(summary.selected_total, Decimal::from_str("50.00").unwrap());
        assert_eq!(
            summary.expected_balance,
            Decimal::from_str("150.00").unwrap()
        );
        assert_eq!(summary.difference, Decimal::ZERO);
        assert!(summary.balanced);
    }

    #[test]
    fn test_difference_outside_tolerance_is_unbalanced() {
        let transactions = vec![txn("t1", "acct-1", 1, "", "60.00")];
        let selected: Vec<&Transaction> = transactions.iter().collect();
        let summary = summarize(&statement("100.00", "150.00"), &selected);
        assert_eq!(summary.difference, Decimal::from_str("-10.00").unwrap());
        assert!(!summary.balanced);
    }

    #[test]
    fn test_sub_half_cent_difference_is_balanced() {
        let selected_txn = txn("t1", "acct-1", 1, "", "50.00");
        let summary = summarize(&statement("100.004", "150.00"), &[&selected_txn]);
        assert_eq!(summary.difference, Decimal::from_str("-0.004").unwrap());
        assert!(summary.balanced);
    }

    #[test]
    fn test_commit_emits_record_and_patches() {
        let transactions = vec![
            txn("t1", "acct-1", 1, "", "60.00"),
            txn("t2", "acct-1", 2, "10.00", ""),
        ];
        let selected: Vec<&Transaction> = transactions.iter().collect();
        let statement = statement("100.00", "150.00");
        let (record, patches) = commit(&statement, &selected).unwrap();

        assert_eq!(record.account_id, "acct-1");
        assert_eq!(record.transaction_ids, vec!["t1", "t2"]);
        assert_eq!(patches.len(), 2);
        for patch in &patches {
            assert_eq!(patch.cleared, Some(true));
            assert_eq!(patch.reconciliation_id.as_deref(), Some(record.id.as_str()));
        }
    }

    #[test]
    fn test_commit_refuses_unbalanced() {
        let transactions = vec![txn("t1", "acct-1", 1, "", "60.00")];
        let selected: Vec<&Transaction> = transactions.iter().collect();
        let err = commit(&statement("100.00", "150.00"), &selected).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_empty_selection() {
        let summary = summarize(&statement("100.00", "100.00"), &[]);
        assert_eq!(summary.selected_total, Decimal::ZERO);
        assert!(summary.balanced);
    }
}
