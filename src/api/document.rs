//! The document-level protocol: full reads, full writes, and creation of the fixed tab
//! skeleton, built on a dynamically-dispatched `SheetApi`.

use crate::api::{SheetApi, SheetRange};
use crate::model::LedgerData;
use crate::tabs::{
    account_from_row, account_row, assign_transaction_tabs, block_range, category_from_row,
    category_row, fixed_tab_headers, fixed_tabs, full_range, is_transaction_tab,
    metadata_from_row, metadata_row, parse_records, payee_from_row, payee_row,
    reconciliation_from_row, reconciliation_row, transaction_from_row, transaction_row,
    ACCOUNTS_TAB, ACCOUNT_HEADERS, CATEGORIES_TAB, CATEGORY_HEADERS, META_HEADERS, META_TAB,
    PAYEES_TAB, PAYEE_HEADERS, RECONCILIATIONS_TAB, RECONCILIATION_HEADERS,
    TRANSACTION_HEADERS,
};
use crate::Result;
use tracing::debug;

/// Reads and writes whole ledger documents through a `SheetApi`.
pub struct DocumentStore {
    api: Box<dyn SheetApi + Send>,
}

impl DocumentStore {
    /// Create a new `DocumentStore` that will use a dynamically-dispatched `api` to get and
    /// send its data.
    pub fn new(api: Box<dyn SheetApi + Send>) -> Self {
        Self { api }
    }

    /// Creates a new document with the fixed tab skeleton and writes every fixed tab's
    /// header row in one batched call. Returns the new document's id.
    pub async fn create_document(&mut self, title: &str) -> Result<String> {
        let tabs: Vec<String> = fixed_tabs().iter().map(|s| s.to_string()).collect();
        let id = self.api.create_document(title, &tabs).await?;
        let headers: Vec<SheetRange> = fixed_tabs()
            .iter()
            .map(|tab| tab_block(tab, fixed_tab_headers(tab), Vec::new()))
            .collect();
        self.api.write_ranges(&id, &headers).await?;
        debug!("Created document {id} titled '{title}'");
        Ok(id)
    }

    /// The document's title.
    pub async fn document_title(&mut self, document_id: &str) -> Result<String> {
        self.api.document_title(document_id).await
    }

    /// Fetches every fixed tab and every transaction tab in one batched read and parses
    /// the rows into normalized collections.
    ///
    /// Transaction rows are merged across tabs without regard to which tab they came from;
    /// account affiliation is recovered solely from the embedded accountId column.
    pub async fn read_all_tabs(&mut self, document_id: &str) -> Result<LedgerData> {
        let tabs = self.api.tab_titles(document_id).await?;
        let mut ranges: Vec<String> = fixed_tabs().iter().map(|tab| full_range(tab)).collect();
        ranges.extend(
            tabs.iter()
                .filter(|tab| is_transaction_tab(tab))
                .map(|tab| full_range(tab)),
        );

        let mut data = LedgerData::default();
        for (tab, rows) in self.api.read_ranges(document_id, &ranges).await? {
            if is_transaction_tab(&tab) {
                data.transactions
                    .extend(parse_records(&rows, transaction_from_row)?);
                continue;
            }
            match tab.as_str() {
                META_TAB => {
                    data.metadata = parse_records(&rows, metadata_from_row)?
                        .into_iter()
                        .next()
                        .unwrap_or_default();
                }
                ACCOUNTS_TAB => data.accounts = parse_records(&rows, account_from_row)?,
                PAYEES_TAB => data.payees = parse_records(&rows, payee_from_row)?,
                CATEGORIES_TAB => data.categories = parse_records(&rows, category_from_row)?,
                RECONCILIATIONS_TAB => {
                    data.reconciliations = parse_records(&rows, reconciliation_from_row)?
                }
                _ => {}
            }
        }
        debug!(
            "Read {} accounts, {} transactions from {document_id}",
            data.accounts.len(),
            data.transactions.len()
        );
        Ok(data)
    }

    /// Writes the whole ledger to the document.
    ///
    /// The per-account transaction tabs are rebuilt destructively: every existing
    /// transaction-prefixed tab is deleted and the fresh set added in a single structural
    /// request, so a failure cannot leave the document between delete and recreate. The
    /// fixed tabs are then cleared in one batched call and all contents written in one
    /// batched call. Any failing step aborts the save.
    pub async fn write_all_tabs(&mut self, document_id: &str, data: &LedgerData) -> Result<()> {
        let existing: Vec<String> = self
            .api
            .tab_titles(document_id)
            .await?
            .into_iter()
            .filter(|tab| is_transaction_tab(tab))
            .collect();

        let assignments = assign_transaction_tabs(&data.accounts);
        let fresh: Vec<String> = assignments.iter().map(|(_, tab)| tab.clone()).collect();
        self.api.modify_tabs(document_id, &fresh, &existing).await?;

        let clears: Vec<String> = fixed_tabs().iter().map(|tab| full_range(tab)).collect();
        self.api.clear_ranges(document_id, &clears).await?;

        let mut blocks = vec![
            tab_block(META_TAB, META_HEADERS, vec![metadata_row(&data.metadata)]),
            tab_block(
                ACCOUNTS_TAB,
                ACCOUNT_HEADERS,
                data.accounts.iter().map(account_row).collect(),
            ),
            tab_block(
                PAYEES_TAB,
                PAYEE_HEADERS,
                data.payees.iter().map(payee_row).collect(),
            ),
            tab_block(
                CATEGORIES_TAB,
                CATEGORY_HEADERS,
                data.categories.iter().map(category_row).collect(),
            ),
            tab_block(
                RECONCILIATIONS_TAB,
                RECONCILIATION_HEADERS,
                data.reconciliations.iter().map(reconciliation_row).collect(),
            ),
        ];
        for (account_id, tab) in &assignments {
            let rows: Vec<Vec<String>> = data
                .transactions
                .iter()
                .filter(|txn| &txn.account_id == account_id)
                .map(transaction_row)
                .collect();
            blocks.push(tab_block(tab, TRANSACTION_HEADERS, rows));
        }
        self.api.write_ranges(document_id, &blocks).await?;
        debug!("Wrote {} tabs to {document_id}", blocks.len());
        Ok(())
    }
}

/// A header-first block covering one whole tab.
fn tab_block(tab: &str, headers: &[&str], rows: Vec<Vec<String>>) -> SheetRange {
    let mut values = Vec::with_capacity(rows.len() + 1);
    values.push(headers.iter().map(|s| s.to_string()).collect());
    values.extend(rows);
    SheetRange {
        range: block_range(tab, headers.len(), values.len()),
        values,
    }
}
