//! The synchronization and reconciliation core of a checkbook-style finance tracker whose
//! persistent store is a user-owned spreadsheet document.
//!
//! The crate holds the normalized data model and its reducer-driven state store, the
//! mapping between that model and the document's named tabs (one transaction tab per
//! account), the batched remote client, the autosave/dirty tracker, and the statement
//! reconciliation engine. Visual components, routing, the document picker, and the OAuth
//! flow live outside; they connect through the `Store` API and the `AuthProvider` trait.

pub mod api;
pub mod autosave;
pub mod codec;
mod error;
pub mod format;
pub mod import;
pub mod model;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod tabs;

pub use error::Error;
pub use error::Result;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// The default document title used when saving before the user has named anything.
pub const APP_TITLE: &str = "Sheetbook";

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use the default log level for this crate only.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
