//! End-to-end tests driving the state store against the in-memory sheet client.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sheetbook::api::{DocumentStore, TestSheets};
use sheetbook::autosave::AutoSave;
use sheetbook::model::{Account, AccountType, Money, Transaction};
use sheetbook::session::Session;
use sheetbook::store::{Action, Store};
use sheetbook::tabs;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

type SharedSheets = Arc<Mutex<TestSheets>>;

fn shared_sheets() -> SharedSheets {
    Arc::new(Mutex::new(TestSheets::new()))
}

fn store_over(sheets: &SharedSheets, dir: &TempDir) -> Store {
    let documents = DocumentStore::new(Box::new(sheets.clone()));
    let tracker = AutoSave::new(
        Arc::new(|| Box::pin(async { Ok(()) })),
        Duration::from_secs(3600),
    );
    Store::new(documents, tracker, Session::new_in(dir.path()))
}

fn account(id: &str, name: &str) -> Account {
    let mut account = Account::new(name, AccountType::Checking);
    account.id = id.to_string();
    account
}

fn txn(account_id: &str, day: u32, payment: &str, deposit: &str) -> Transaction {
    Transaction {
        id: sheetbook::model::new_id(),
        account_id: account_id.to_string(),
        date: NaiveDate::from_ymd_opt(2026, 5, day).unwrap(),
        payment: Money::from_str(payment).unwrap(),
        deposit: Money::from_str(deposit).unwrap(),
        payee: "Grocer".to_string(),
        ..Transaction::default()
    }
}

#[tokio::test]
async fn first_save_creates_document_and_remembers_it() {
    let sheets = shared_sheets();
    let dir = TempDir::new().unwrap();
    let mut store = store_over(&sheets, &dir);

    store.dispatch(Action::SetAuth(true));
    store.add_account(account("aaaa1111", "Chase")).unwrap();
    store.add_transaction(txn("aaaa1111", 3, "12.00", ""));
    assert!(store.tracker().has_unsaved_changes());

    store.save().await.unwrap();

    let document_id = store.state().document_id.clone().expect("document id");
    assert!(!store.tracker().has_unsaved_changes());
    assert!(!store.state().metadata.last_saved.is_empty());
    // The untitled document falls back to the application title.
    assert_eq!(store.state().document_title, sheetbook::APP_TITLE);
    assert_eq!(
        store.session().last_document_id().await,
        Some(document_id.clone())
    );

    let tab_names = sheets.lock().await.tab_names(&document_id);
    assert!(tab_names.contains(&"accounts".to_string()));
    assert!(tab_names.contains(&"txn_Chase".to_string()));
    store.tracker().dispose();
}

#[tokio::test]
async fn save_then_load_round_trips_collections() {
    let sheets = shared_sheets();
    let dir = TempDir::new().unwrap();
    let mut store = store_over(&sheets, &dir);

    store.dispatch(Action::SetAuth(true));
    store.add_account(account("aaaa1111", "Chase")).unwrap();
    store.add_account(account("bbbb2222", "Chase")).unwrap();
    store.add_transaction(txn("aaaa1111", 1, "10.00", ""));
    store.add_transaction(txn("bbbb2222", 2, "", "250.00"));
    store.add_payee("Electric Co").unwrap();
    store.add_category("Utilities").unwrap();
    store.save().await.unwrap();

    let document_id = store.state().document_id.clone().unwrap();
    let saved = store.state().clone();

    // Colliding account names split into disambiguated tabs.
    let tab_names = sheets.lock().await.tab_names(&document_id);
    assert!(tab_names.contains(&"txn_Chase (aaaa)".to_string()));
    assert!(tab_names.contains(&"txn_Chase (bbbb)".to_string()));

    let mut fresh = store_over(&sheets, &dir);
    fresh.load(&document_id).await.unwrap();
    assert_eq!(fresh.state().accounts, saved.accounts);
    assert_eq!(fresh.state().transactions, saved.transactions);
    assert_eq!(fresh.state().payees, saved.payees);
    assert_eq!(fresh.state().categories, saved.categories);
    assert_eq!(fresh.state().reconciliations, saved.reconciliations);
    assert!(!fresh.tracker().has_unsaved_changes());

    store.tracker().dispose();
    fresh.tracker().dispose();
}

#[tokio::test]
async fn save_is_noop_when_not_authenticated() {
    let sheets = shared_sheets();
    let dir = TempDir::new().unwrap();
    let mut store = store_over(&sheets, &dir);

    store.add_account(account("aaaa1111", "Chase")).unwrap();
    store.save().await.unwrap();
    assert_eq!(store.state().document_id, None);
    // Still dirty: nothing was written.
    assert!(store.tracker().has_unsaved_changes());
    store.tracker().dispose();
}

#[tokio::test]
async fn load_failure_leaves_prior_state_untouched() {
    let sheets = shared_sheets();
    let dir = TempDir::new().unwrap();
    let mut store = store_over(&sheets, &dir);

    store.dispatch(Action::SetAuth(true));
    store.add_account(account("aaaa1111", "Chase")).unwrap();
    store.save().await.unwrap();
    let before = store.state().clone();

    let err = store.load("no-such-document").await.unwrap_err();
    assert!(matches!(err, sheetbook::Error::Remote { .. }));
    assert_eq!(store.state().accounts, before.accounts);
    assert_eq!(store.state().document_id, before.document_id);
    assert!(!store.state().loading);
    assert!(store.state().error.is_some());
    store.tracker().dispose();
}

#[tokio::test]
async fn save_as_switches_documents_and_leaves_old_one() {
    let sheets = shared_sheets();
    let dir = TempDir::new().unwrap();
    let mut store = store_over(&sheets, &dir);

    store.dispatch(Action::SetAuth(true));
    store.add_account(account("aaaa1111", "Chase")).unwrap();
    store.save().await.unwrap();
    let original_id = store.state().document_id.clone().unwrap();

    store.add_account(account("bbbb2222", "Rainy Day")).unwrap();
    store.save_as("Ledger Copy").await.unwrap();
    let copy_id = store.state().document_id.clone().unwrap();
    assert_ne!(original_id, copy_id);
    assert_eq!(store.state().metadata.title, "Ledger Copy");

    // The old document still has only the first account's tab.
    let old_tabs = sheets.lock().await.tab_names(&original_id);
    assert!(old_tabs.contains(&"txn_Chase".to_string()));
    assert!(!old_tabs.contains(&"txn_Rainy Day".to_string()));

    let new_tabs = sheets.lock().await.tab_names(&copy_id);
    assert!(new_tabs.contains(&"txn_Chase".to_string()));
    assert!(new_tabs.contains(&"txn_Rainy Day".to_string()));
    store.tracker().dispose();
}

#[tokio::test]
async fn create_new_resets_collections() {
    let sheets = shared_sheets();
    let dir = TempDir::new().unwrap();
    let mut store = store_over(&sheets, &dir);

    store.dispatch(Action::SetAuth(true));
    store.add_account(account("aaaa1111", "Chase")).unwrap();
    store.save().await.unwrap();

    store.create_new("Fresh Ledger", "Sam").await.unwrap();
    assert!(store.state().accounts.is_empty());
    assert!(store.state().transactions.is_empty());
    assert_eq!(store.state().metadata.title, "Fresh Ledger");
    assert_eq!(store.state().metadata.owner, "Sam");
    assert_eq!(store.state().metadata.version, "1");
    assert!(!store.tracker().has_unsaved_changes());

    // The new document's metadata tab carries the skeleton row.
    let document_id = store.state().document_id.clone().unwrap();
    let rows = sheets.lock().await.rows(&document_id, "_meta");
    assert_eq!(rows[0], vec!["title", "owner", "lastSaved", "version"]);
    assert_eq!(rows[1][0], "Fresh Ledger");
    store.tracker().dispose();
}

#[tokio::test]
async fn renaming_an_account_rebuilds_its_tab() {
    let sheets = shared_sheets();
    let dir = TempDir::new().unwrap();
    let mut store = store_over(&sheets, &dir);

    store.dispatch(Action::SetAuth(true));
    let mut chase = account("aaaa1111", "Chase");
    store.add_account(chase.clone()).unwrap();
    store.add_transaction(txn("aaaa1111", 1, "10.00", ""));
    store.save().await.unwrap();
    let document_id = store.state().document_id.clone().unwrap();

    chase.name = "First National".to_string();
    store.dispatch(Action::UpdateAccount(chase));
    store.save().await.unwrap();

    let tabs_now = sheets.lock().await.tab_names(&document_id);
    assert!(tabs_now.contains(&"txn_First National".to_string()));
    assert!(!tabs_now.contains(&"txn_Chase".to_string()));

    // The transaction survived the rebuild.
    let mut fresh = store_over(&sheets, &dir);
    fresh.load(&document_id).await.unwrap();
    assert_eq!(fresh.state().transactions.len(), 1);
    store.tracker().dispose();
    fresh.tracker().dispose();
}

#[tokio::test]
async fn transactions_merge_across_tabs_by_account_id() {
    // Rows land in per-account tabs on save, but reading recovers account affiliation
    // from the accountId column alone.
    let sheets = shared_sheets();
    let dir = TempDir::new().unwrap();
    let mut store = store_over(&sheets, &dir);

    store.dispatch(Action::SetAuth(true));
    store.add_account(account("aaaa1111", "Chase")).unwrap();
    store.add_account(account("bbbb2222", "Savings")).unwrap();
    store.add_transaction(txn("aaaa1111", 1, "1.00", ""));
    store.add_transaction(txn("bbbb2222", 2, "2.00", ""));
    store.save().await.unwrap();
    let document_id = store.state().document_id.clone().unwrap();

    let mut fresh = store_over(&sheets, &dir);
    fresh.load(&document_id).await.unwrap();
    assert_eq!(fresh.account_balance("aaaa1111"), Decimal::from_str("-1.00").unwrap());
    assert_eq!(fresh.account_balance("bbbb2222"), Decimal::from_str("-2.00").unwrap());
    store.tracker().dispose();
    fresh.tracker().dispose();
}

#[tokio::test(start_paused = true)]
async fn autosave_timer_flushes_dirty_store() {
    let sheets = shared_sheets();
    let dir = TempDir::new().unwrap();
    let documents = DocumentStore::new(Box::new(sheets.clone()));
    let store = Store::shared(
        documents,
        Session::new_in(dir.path()),
        Duration::from_secs(60),
    );

    {
        let mut guard = store.lock().await;
        guard.dispatch(Action::SetAuth(true));
        guard.add_account(account("aaaa1111", "Chase")).unwrap();
        assert!(guard.tracker().has_unsaved_changes());
    }

    tokio::time::sleep(Duration::from_secs(61)).await;

    let guard = store.lock().await;
    let document_id = guard.state().document_id.clone().expect("autosaved");
    assert!(!guard.tracker().has_unsaved_changes());
    let rows = sheets.lock().await.rows(&document_id, tabs::ACCOUNTS_TAB);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1], "Chase");
    guard.tracker().dispose();
}
