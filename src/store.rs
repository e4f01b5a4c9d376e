//! The application state store.
//!
//! `State` is the single source of truth for the normalized collections plus session
//! state. All mutation flows through `reduce`, a pure function from state and a tagged
//! action to the next state. `Store` owns a `State`, routes actions through the reducer
//! (dirtying the autosave tracker for every data mutation), derives views like balances,
//! and orchestrates load/save/create-new/save-as against the remote document.
//!
//! `Store` methods take `&mut self`, so two operations on one store can never interleave.
//! To share a store between the autosave timer and user-triggered operations, wrap it with
//! `Store::shared`, which serializes everything through one async mutex. The timer save
//! and an explicit save can never run concurrently, and overlapping saves degrade to
//! last-completed-write-wins.

use crate::api::DocumentStore;
use crate::autosave::{AutoSave, AutoSaveStatus, SaveFn};
use crate::codec::Table;
use crate::import::{build_transactions, ColumnMapping};
use crate::model::{
    new_id, timestamp, Account, Category, LedgerData, Metadata, Payee, Reconciliation,
    Transaction, TransactionPatch,
};
use crate::reconcile::{self, Statement};
use crate::session::Session;
use crate::{Error, Result, APP_TITLE};
use rust_decimal::Decimal;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The full application state. Collections are normalized; balances are always derived,
/// never stored.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct State {
    pub is_authenticated: bool,
    pub document_id: Option<String>,
    pub document_title: String,
    pub metadata: Metadata,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub payees: Vec<Payee>,
    pub categories: Vec<Category>,
    pub reconciliations: Vec<Reconciliation>,
    pub selected_account_id: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub save_status: AutoSaveStatus,
}

/// A partial metadata update.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub owner: Option<String>,
    pub last_saved: Option<String>,
}

/// Every recognized state transition.
#[derive(Debug, Clone)]
pub enum Action {
    SetAuth(bool),
    SetLoading(bool),
    SetError(Option<String>),
    SetDocument { id: String, title: String },
    LoadData(LedgerData),
    ClearData,
    SelectAccount(Option<String>),
    AddAccount(Account),
    UpdateAccount(Account),
    DeleteAccount(String),
    AddTransaction(Transaction),
    UpdateTransaction(Transaction),
    DeleteTransaction(String),
    ImportTransactions(Vec<Transaction>),
    AddPayee(Payee),
    UpdatePayee(Payee),
    DeletePayee(String),
    AddCategory(Category),
    UpdateCategory(Category),
    DeleteCategory(String),
    AddReconciliation(Reconciliation),
    UpdateTransactionsBatch(Vec<TransactionPatch>),
    SetMetadata(MetadataPatch),
    SetSaveStatus(AutoSaveStatus),
}

impl Action {
    /// True for actions that change persisted data. Each of these must dirty the autosave
    /// tracker exactly once when dispatched.
    pub fn is_data_mutation(&self) -> bool {
        matches!(
            self,
            Action::AddAccount(_)
                | Action::UpdateAccount(_)
                | Action::DeleteAccount(_)
                | Action::AddTransaction(_)
                | Action::UpdateTransaction(_)
                | Action::DeleteTransaction(_)
                | Action::ImportTransactions(_)
                | Action::AddPayee(_)
                | Action::UpdatePayee(_)
                | Action::DeletePayee(_)
                | Action::AddCategory(_)
                | Action::UpdateCategory(_)
                | Action::DeleteCategory(_)
                | Action::AddReconciliation(_)
                | Action::UpdateTransactionsBatch(_)
                | Action::SetMetadata(_)
        )
    }
}

/// The pure reducer: current state plus an action yields the next state.
pub fn reduce(mut state: State, action: Action) -> State {
    match action {
        Action::SetAuth(value) => state.is_authenticated = value,
        Action::SetLoading(value) => state.loading = value,
        Action::SetError(error) => state.error = error,
        Action::SetDocument { id, title } => {
            state.document_id = Some(id);
            state.document_title = title;
        }
        Action::LoadData(data) => {
            state.metadata = data.metadata;
            state.accounts = data.accounts;
            state.transactions = data.transactions;
            state.payees = data.payees;
            state.categories = data.categories;
            state.reconciliations = data.reconciliations;
            state.loading = false;
        }
        Action::ClearData => {
            state.metadata = Metadata::default();
            state.accounts.clear();
            state.transactions.clear();
            state.payees.clear();
            state.categories.clear();
            state.reconciliations.clear();
            state.selected_account_id = None;
            state.document_id = None;
            state.document_title.clear();
        }
        Action::SelectAccount(id) => state.selected_account_id = id,
        Action::AddAccount(account) => state.accounts.push(account),
        Action::UpdateAccount(account) => {
            if let Some(slot) = state.accounts.iter_mut().find(|a| a.id == account.id) {
                *slot = account;
            }
        }
        Action::DeleteAccount(id) => {
            state.accounts.retain(|a| a.id != id);
            state.transactions.retain(|t| t.account_id != id);
            if state.selected_account_id.as_deref() == Some(id.as_str()) {
                state.selected_account_id = None;
            }
        }
        Action::AddTransaction(transaction) => state.transactions.push(transaction),
        Action::UpdateTransaction(transaction) => {
            if let Some(slot) = state
                .transactions
                .iter_mut()
                .find(|t| t.id == transaction.id)
            {
                *slot = transaction;
            }
        }
        Action::DeleteTransaction(id) => state.transactions.retain(|t| t.id != id),
        Action::ImportTransactions(transactions) => state.transactions.extend(transactions),
        Action::AddPayee(payee) => state.payees.push(payee),
        Action::UpdatePayee(payee) => {
            if let Some(slot) = state.payees.iter_mut().find(|p| p.id == payee.id) {
                *slot = payee;
            }
        }
        Action::DeletePayee(id) => state.payees.retain(|p| p.id != id),
        Action::AddCategory(category) => state.categories.push(category),
        Action::UpdateCategory(category) => {
            if let Some(slot) = state.categories.iter_mut().find(|c| c.id == category.id) {
                *slot = category;
            }
        }
        Action::DeleteCategory(id) => state.categories.retain(|c| c.id != id),
        Action::AddReconciliation(reconciliation) => state.reconciliations.push(reconciliation),
        Action::UpdateTransactionsBatch(patches) => {
            for patch in &patches {
                if let Some(transaction) =
                    state.transactions.iter_mut().find(|t| t.id == patch.id)
                {
                    transaction.apply(patch);
                }
            }
        }
        Action::SetMetadata(patch) => {
            if let Some(title) = patch.title {
                state.metadata.title = title;
            }
            if let Some(owner) = patch.owner {
                state.metadata.owner = owner;
            }
            if let Some(last_saved) = patch.last_saved {
                state.metadata.last_saved = last_saved;
            }
        }
        Action::SetSaveStatus(status) => state.save_status = status,
    }
    state
}

fn name_exists<'a>(mut names: impl Iterator<Item = &'a str>, candidate: &str) -> bool {
    names.any(|name| name.eq_ignore_ascii_case(candidate))
}

/// Owns the state, the remote document client, the autosave tracker, and the session file.
pub struct Store {
    state: State,
    documents: DocumentStore,
    tracker: AutoSave,
    session: Session,
}

impl Store {
    pub fn new(documents: DocumentStore, tracker: AutoSave, session: Session) -> Self {
        Self {
            state: State::default(),
            documents,
            tracker,
            session,
        }
    }

    /// Builds a store whose autosave timer drives `save` through a shared handle. The
    /// returned mutex is the only way in, which serializes timer saves, explicit saves,
    /// and loads against each other.
    pub fn shared(
        documents: DocumentStore,
        session: Session,
        autosave_interval: Duration,
    ) -> Arc<Mutex<Store>> {
        // Weak, not Arc: the save closure lives inside the store it saves.
        let slot: Arc<OnceLock<Weak<Mutex<Store>>>> = Arc::new(OnceLock::new());
        let save_slot = slot.clone();
        let save: SaveFn = Arc::new(move || {
            let save_slot = save_slot.clone();
            Box::pin(async move {
                match save_slot.get().and_then(Weak::upgrade) {
                    Some(store) => store.lock().await.save().await,
                    None => Ok(()),
                }
            })
        });
        let tracker = AutoSave::new(save, autosave_interval);
        let store = Arc::new(Mutex::new(Store::new(documents, tracker, session)));
        let _ = slot.set(Arc::downgrade(&store));
        store
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn tracker(&self) -> &AutoSave {
        &self.tracker
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Applies an action through the reducer. Data-mutating actions dirty the autosave
    /// tracker as an observable side effect, exactly once per action.
    pub fn dispatch(&mut self, action: Action) {
        let dirties = action.is_data_mutation();
        self.apply(action);
        if dirties {
            self.tracker.mark_dirty();
            self.sync_save_status();
        }
    }

    /// Reduces without touching the dirty tracker. Orchestration-internal updates (load
    /// results, save stamps) go through here so that saving does not itself dirty.
    fn apply(&mut self, action: Action) {
        self.state = reduce(std::mem::take(&mut self.state), action);
    }

    fn sync_save_status(&mut self) {
        let status = self.tracker.status();
        self.apply(Action::SetSaveStatus(status));
    }

    // ---- validated entity operations -------------------------------------------------

    /// Adds an account after checking the required name.
    pub fn add_account(&mut self, account: Account) -> Result<()> {
        if account.name.trim().is_empty() {
            return Err(Error::validation("An account name is required"));
        }
        self.dispatch(Action::AddAccount(account));
        Ok(())
    }

    /// Adds a transaction, implicitly creating its payee and category names the first
    /// time they are seen. Name comparison is case-insensitive, matching the explicit
    /// add path.
    pub fn add_transaction(&mut self, transaction: Transaction) {
        let payee = transaction.payee.trim().to_string();
        let category = transaction.category.trim().to_string();
        self.dispatch(Action::AddTransaction(transaction));
        if !payee.is_empty()
            && !name_exists(self.state.payees.iter().map(|p| p.name.as_str()), &payee)
        {
            self.dispatch(Action::AddPayee(Payee {
                id: new_id(),
                name: payee,
            }));
        }
        if !category.is_empty()
            && !name_exists(
                self.state.categories.iter().map(|c| c.name.as_str()),
                &category,
            )
        {
            self.dispatch(Action::AddCategory(Category {
                id: new_id(),
                name: category,
            }));
        }
    }

    /// Adds a payee, rejecting case-insensitive duplicates.
    pub fn add_payee(&mut self, name: &str) -> Result<Payee> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("A payee name is required"));
        }
        if name_exists(self.state.payees.iter().map(|p| p.name.as_str()), name) {
            return Err(Error::validation(format!(
                "A payee named '{name}' already exists"
            )));
        }
        let payee = Payee {
            id: new_id(),
            name: name.to_string(),
        };
        self.dispatch(Action::AddPayee(payee.clone()));
        Ok(payee)
    }

    /// Adds a category, rejecting case-insensitive duplicates.
    pub fn add_category(&mut self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("A category name is required"));
        }
        if name_exists(self.state.categories.iter().map(|c| c.name.as_str()), name) {
            return Err(Error::validation(format!(
                "A category named '{name}' already exists"
            )));
        }
        let category = Category {
            id: new_id(),
            name: name.to_string(),
        };
        self.dispatch(Action::AddCategory(category.clone()));
        Ok(category)
    }

    /// Validates and imports a parsed file as one all-or-nothing batch. Returns the
    /// number of transactions added.
    pub fn import_table(
        &mut self,
        table: &Table,
        mapping: &ColumnMapping,
        default_account_id: Option<&str>,
    ) -> Result<usize> {
        let transactions =
            build_transactions(table, mapping, &self.state.accounts, default_account_id)?;
        let count = transactions.len();
        self.dispatch(Action::ImportTransactions(transactions));
        Ok(count)
    }

    /// Commits a balanced reconciliation: records it and clears the selected
    /// transactions in one batch update. Fails without mutating when the statement does
    /// not balance.
    pub fn reconcile(
        &mut self,
        statement: &Statement,
        selected_ids: &[String],
    ) -> Result<Reconciliation> {
        let uncleared =
            reconcile::uncleared_transactions(&self.state.transactions, &statement.account_id);
        let selected: Vec<&Transaction> = uncleared
            .into_iter()
            .filter(|t| selected_ids.contains(&t.id))
            .collect();
        let (record, patches) = reconcile::commit(statement, &selected)?;
        self.dispatch(Action::AddReconciliation(record.clone()));
        self.dispatch(Action::UpdateTransactionsBatch(patches));
        Ok(record)
    }

    // ---- derived views ---------------------------------------------------------------

    /// An account's transactions, date ascending, insertion order on equal dates.
    pub fn transactions_for(&self, account_id: &str) -> Vec<&Transaction> {
        let mut list: Vec<&Transaction> = self
            .state
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .collect();
        list.sort_by_key(|t| t.date);
        list
    }

    /// The derived balance: sum of (deposit - payment) over the account's transactions.
    pub fn account_balance(&self, account_id: &str) -> Decimal {
        self.transactions_for(account_id)
            .iter()
            .map(|t| t.signed_amount())
            .sum()
    }

    /// Running balances per transaction, in register order.
    pub fn running_balances(&self, account_id: &str) -> Vec<(String, Decimal)> {
        let mut running = Decimal::ZERO;
        self.transactions_for(account_id)
            .iter()
            .map(|t| {
                running += t.signed_amount();
                (t.id.clone(), running)
            })
            .collect()
    }

    /// The selectable pool for reconciliation.
    pub fn uncleared_transactions(&self, account_id: &str) -> Vec<&Transaction> {
        reconcile::uncleared_transactions(&self.state.transactions, account_id)
    }

    // ---- orchestration ---------------------------------------------------------------

    /// Loads a document into the store and remembers it for the next session. On failure
    /// the prior collections are untouched; only the error and loading flags change.
    pub async fn load(&mut self, document_id: &str) -> Result<()> {
        self.apply(Action::SetLoading(true));
        self.apply(Action::SetError(None));
        match self.documents.read_all_tabs(document_id).await {
            Ok(data) => {
                let title = data.metadata.title.clone();
                self.apply(Action::LoadData(data));
                self.apply(Action::SetDocument {
                    id: document_id.to_string(),
                    title,
                });
                if let Err(e) = self.session.remember_document(document_id).await {
                    warn!("Unable to remember document id: {e}");
                }
                self.tracker.mark_clean();
                self.sync_save_status();
                Ok(())
            }
            Err(e) => {
                self.apply(Action::SetError(Some(e.to_string())));
                self.apply(Action::SetLoading(false));
                Err(e)
            }
        }
    }

    /// Writes the current state to the active document. A no-op when not authenticated.
    /// When no document exists yet, one is created from the metadata title (falling back
    /// to the application title) and its id remembered for reuse.
    pub async fn save(&mut self) -> Result<()> {
        if !self.state.is_authenticated {
            debug!("Skipping save: not authenticated");
            return Ok(());
        }
        self.apply(Action::SetLoading(true));
        let result = self.save_inner().await;
        if let Err(e) = &result {
            self.apply(Action::SetError(Some(e.to_string())));
        }
        self.apply(Action::SetLoading(false));
        result
    }

    async fn save_inner(&mut self) -> Result<()> {
        let document_id = match self.state.document_id.clone() {
            Some(id) => id,
            None => {
                let title = if self.state.metadata.title.trim().is_empty() {
                    APP_TITLE.to_string()
                } else {
                    self.state.metadata.title.clone()
                };
                let id = self.documents.create_document(&title).await?;
                self.apply(Action::SetDocument {
                    id: id.clone(),
                    title: title.clone(),
                });
                self.apply(Action::SetMetadata(MetadataPatch {
                    title: Some(title),
                    ..MetadataPatch::default()
                }));
                if let Err(e) = self.session.remember_document(&id).await {
                    warn!("Unable to remember document id: {e}");
                }
                id
            }
        };
        let stamp = timestamp();
        let data = self.ledger_data(&stamp);
        self.documents.write_all_tabs(&document_id, &data).await?;
        self.tracker.mark_clean();
        self.apply(Action::SetMetadata(MetadataPatch {
            last_saved: Some(stamp),
            ..MetadataPatch::default()
        }));
        self.sync_save_status();
        Ok(())
    }

    /// Creates a fresh, empty document and makes it the active one.
    pub async fn create_new(&mut self, title: &str, owner: &str) -> Result<()> {
        self.apply(Action::SetLoading(true));
        self.apply(Action::SetError(None));
        let result = self.create_new_inner(title, owner).await;
        if let Err(e) = &result {
            self.apply(Action::SetError(Some(e.to_string())));
        }
        self.apply(Action::SetLoading(false));
        result
    }

    async fn create_new_inner(&mut self, title: &str, owner: &str) -> Result<()> {
        let id = self.documents.create_document(title).await?;
        let stamp = timestamp();
        self.apply(Action::ClearData);
        self.apply(Action::SetMetadata(MetadataPatch {
            title: Some(title.to_string()),
            owner: Some(owner.to_string()),
            last_saved: Some(stamp.clone()),
        }));
        self.apply(Action::SetDocument {
            id: id.clone(),
            title: title.to_string(),
        });
        if let Err(e) = self.session.remember_document(&id).await {
            warn!("Unable to remember document id: {e}");
        }
        let data = self.ledger_data(&stamp);
        self.documents.write_all_tabs(&id, &data).await?;
        self.tracker.mark_clean();
        self.sync_save_status();
        Ok(())
    }

    /// Writes the current state into a brand-new document and switches to it. The old
    /// document is left untouched.
    pub async fn save_as(&mut self, title: &str) -> Result<()> {
        self.apply(Action::SetLoading(true));
        self.apply(Action::SetError(None));
        let result = self.save_as_inner(title).await;
        if let Err(e) = &result {
            self.apply(Action::SetError(Some(e.to_string())));
        }
        self.apply(Action::SetLoading(false));
        result
    }

    async fn save_as_inner(&mut self, title: &str) -> Result<()> {
        let id = self.documents.create_document(title).await?;
        let stamp = timestamp();
        self.apply(Action::SetMetadata(MetadataPatch {
            title: Some(title.to_string()),
            last_saved: Some(stamp.clone()),
            ..MetadataPatch::default()
        }));
        self.apply(Action::SetDocument {
            id: id.clone(),
            title: title.to_string(),
        });
        if let Err(e) = self.session.remember_document(&id).await {
            warn!("Unable to remember document id: {e}");
        }
        let data = self.ledger_data(&stamp);
        self.documents.write_all_tabs(&id, &data).await?;
        self.tracker.mark_clean();
        self.sync_save_status();
        Ok(())
    }

    /// Snapshots the collections for persistence, stamping the save time.
    fn ledger_data(&self, last_saved: &str) -> LedgerData {
        LedgerData {
            metadata: Metadata {
                last_saved: last_saved.to_string(),
                ..self.state.metadata.clone()
            },
            accounts: self.state.accounts.clone(),
            transactions: self.state.transactions.clone(),
            payees: self.state.payees.clone(),
            categories: self.state.categories.clone(),
            reconciliations: self.state.reconciliations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheets;
    use crate::model::{AccountType, Money};
    use chrono::NaiveDate;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn txn(account_id: &str, day: u32, payment: &str, deposit: &str) -> Transaction {
        Transaction {
            id: new_id(),
            account_id: account_id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 4, day).unwrap(),
            payment: Money::from_str(payment).unwrap(),
            deposit: Money::from_str(deposit).unwrap(),
            ..Transaction::default()
        }
    }

    fn test_store(dir: &TempDir) -> Store {
        let documents = DocumentStore::new(Box::new(TestSheets::new()));
        let tracker = AutoSave::new(
            Arc::new(|| Box::pin(async { Ok(()) })),
            Duration::from_secs(3600),
        );
        Store::new(documents, tracker, Session::new_in(dir.path()))
    }

    #[test]
    fn test_reduce_delete_account_cascades() {
        let mut state = State::default();
        state.accounts.push(Account {
            id: "a1".to_string(),
            name: "Chase".to_string(),
            ..Account::default()
        });
        state.transactions.push(txn("a1", 1, "1.00", ""));
        state.transactions.push(txn("a2", 1, "2.00", ""));
        state.selected_account_id = Some("a1".to_string());

        let state = reduce(state, Action::DeleteAccount("a1".to_string()));
        assert!(state.accounts.is_empty());
        assert_eq!(state.transactions.len(), 1);
        assert_eq!(state.transactions[0].account_id, "a2");
        assert_eq!(state.selected_account_id, None);
    }

    #[test]
    fn test_reduce_delete_account_keeps_other_selection() {
        let mut state = State::default();
        state.selected_account_id = Some("a2".to_string());
        let state = reduce(state, Action::DeleteAccount("a1".to_string()));
        assert_eq!(state.selected_account_id, Some("a2".to_string()));
    }

    #[test]
    fn test_reduce_batch_update() {
        let mut state = State::default();
        state.transactions.push(txn("a1", 1, "1.00", ""));
        let id = state.transactions[0].id.clone();
        let state = reduce(
            state,
            Action::UpdateTransactionsBatch(vec![TransactionPatch {
                id: id.clone(),
                cleared: Some(true),
                reconciliation_id: Some("r1".to_string()),
            }]),
        );
        assert!(state.transactions[0].cleared);
        assert_eq!(state.transactions[0].reconciliation_id, "r1");
    }

    #[test]
    fn test_reduce_rename_payee_and_category() {
        let mut state = State::default();
        state.payees.push(Payee {
            id: "p1".to_string(),
            name: "Electric Co".to_string(),
        });
        state.categories.push(Category {
            id: "c1".to_string(),
            name: "Utilties".to_string(),
        });
        let state = reduce(
            state,
            Action::UpdatePayee(Payee {
                id: "p1".to_string(),
                name: "Electric Cooperative".to_string(),
            }),
        );
        let state = reduce(
            state,
            Action::UpdateCategory(Category {
                id: "c1".to_string(),
                name: "Utilities".to_string(),
            }),
        );
        assert_eq!(state.payees[0].name, "Electric Cooperative");
        assert_eq!(state.categories[0].name, "Utilities");

        // An unknown id changes nothing.
        let state = reduce(
            state,
            Action::UpdatePayee(Payee {
                id: "p9".to_string(),
                name: "Ghost".to_string(),
            }),
        );
        assert_eq!(state.payees.len(), 1);
    }

    #[test]
    fn test_reduce_clear_data_resets_document_pointer() {
        let mut state = State::default();
        state.document_id = Some("doc-1".to_string());
        state.document_title = "Ledger".to_string();
        state.accounts.push(Account::default());
        let state = reduce(state, Action::ClearData);
        assert_eq!(state.document_id, None);
        assert!(state.document_title.is_empty());
        assert!(state.accounts.is_empty());
        assert_eq!(state.metadata, Metadata::default());
    }

    #[tokio::test]
    async fn test_dispatch_marks_dirty_exactly_once_per_action() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let notifications = Arc::new(std::sync::Mutex::new(0usize));
        let counter = notifications.clone();
        store.tracker().subscribe(move |status| {
            if status.has_unsaved_changes {
                *counter.lock().unwrap() += 1;
            }
        });

        store.dispatch(Action::AddAccount(Account::new(
            "Chase",
            AccountType::Checking,
        )));
        assert_eq!(*notifications.lock().unwrap(), 1);
        assert!(store.state().save_status.has_unsaved_changes);

        // Non-data actions do not dirty.
        store.dispatch(Action::SetLoading(true));
        store.dispatch(Action::SelectAccount(Some("a1".to_string())));
        assert_eq!(*notifications.lock().unwrap(), 1);
        store.tracker().dispose();
    }

    #[tokio::test]
    async fn test_add_account_requires_name() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let err = store
            .add_account(Account::new("   ", AccountType::Checking))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.state().accounts.is_empty());
        assert!(!store.tracker().has_unsaved_changes());
        store.tracker().dispose();
    }

    #[tokio::test]
    async fn test_add_transaction_auto_creates_names_once() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let mut first = txn("a1", 1, "5.00", "");
        first.payee = "Corner Store".to_string();
        first.category = "Groceries".to_string();
        store.add_transaction(first);
        assert_eq!(store.state().payees.len(), 1);
        assert_eq!(store.state().categories.len(), 1);

        // Case differences do not create twins.
        let mut second = txn("a1", 2, "6.00", "");
        second.payee = "corner store".to_string();
        second.category = "GROCERIES".to_string();
        store.add_transaction(second);
        assert_eq!(store.state().payees.len(), 1);
        assert_eq!(store.state().categories.len(), 1);
        store.tracker().dispose();
    }

    #[tokio::test]
    async fn test_add_payee_rejects_case_insensitive_duplicate() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        store.add_payee("Electric Co").unwrap();
        let err = store.add_payee("electric co").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.state().payees.len(), 1);
        store.tracker().dispose();
    }

    #[tokio::test]
    async fn test_balance_is_derived_and_tie_broken_by_insertion() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        // Inserted out of date order; the view re-sorts.
        store.dispatch(Action::AddTransaction(txn("a1", 9, "", "100.00")));
        store.dispatch(Action::AddTransaction(txn("a1", 2, "30.00", "")));
        store.dispatch(Action::AddTransaction(txn("a1", 9, "20.00", "")));
        store.dispatch(Action::AddTransaction(txn("a2", 1, "999.00", "")));

        assert_eq!(
            store.account_balance("a1"),
            Decimal::from_str("50.00").unwrap()
        );
        let balances = store.running_balances("a1");
        assert_eq!(balances.len(), 3);
        // Day 2 first, then the two day-9 entries in insertion order.
        assert_eq!(balances[0].1, Decimal::from_str("-30.00").unwrap());
        assert_eq!(balances[1].1, Decimal::from_str("70.00").unwrap());
        assert_eq!(balances[2].1, Decimal::from_str("50.00").unwrap());
        store.tracker().dispose();
    }

    #[tokio::test]
    async fn test_reconcile_worked_example() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let deposit = txn("a1", 1, "", "60.00");
        let payment = txn("a1", 2, "10.00", "");
        let selected_ids = vec![deposit.id.clone(), payment.id.clone()];
        store.dispatch(Action::AddTransaction(deposit));
        store.dispatch(Action::AddTransaction(payment));

        let statement = Statement {
            account_id: "a1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
            opening_balance: Decimal::from_str("100.00").unwrap(),
            closing_balance: Decimal::from_str("150.00").unwrap(),
        };
        let record = store.reconcile(&statement, &selected_ids).unwrap();

        assert_eq!(store.state().reconciliations.len(), 1);
        assert_eq!(record.transaction_ids, selected_ids);
        for transaction in &store.state().transactions {
            assert!(transaction.cleared);
            assert_eq!(transaction.reconciliation_id, record.id);
        }
        // Cleared transactions leave the selectable pool.
        assert!(store.uncleared_transactions("a1").is_empty());
        store.tracker().dispose();
    }

    #[tokio::test]
    async fn test_reconcile_unbalanced_mutates_nothing() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let deposit = txn("a1", 1, "", "60.00");
        let selected_ids = vec![deposit.id.clone()];
        store.dispatch(Action::AddTransaction(deposit));

        let statement = Statement {
            account_id: "a1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
            opening_balance: Decimal::from_str("100.00").unwrap(),
            closing_balance: Decimal::from_str("150.00").unwrap(),
        };
        let err = store.reconcile(&statement, &selected_ids).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.state().reconciliations.is_empty());
        assert!(!store.state().transactions[0].cleared);
        store.tracker().dispose();
    }
}
