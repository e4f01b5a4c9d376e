//! The remote-store seam: a trait for the tabular backend, its HTTP implementation, an
//! in-memory implementation for running the whole core without the network, and the
//! document-level protocol built on top.

mod document;
mod remote;
mod test_client;

use crate::Result;

pub use document::DocumentStore;
pub use remote::{AuthProvider, RemoteSheets, StaticAuth};
pub use test_client::TestSheets;

/// A contiguous block of rows addressed by an A1 range.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SheetRange {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

/// The low-level contract against the tabular backend.
///
/// Every method is one logical backend operation, and the batched methods
/// (`modify_tabs`, `clear_ranges`, `write_ranges`, `read_ranges`) must issue exactly one
/// backend call no matter how many tabs or ranges they carry. That bounds the number of
/// partial-failure windows inside an otherwise-atomic save or load.
#[async_trait::async_trait]
pub trait SheetApi {
    /// Creates a new document carrying the given tabs, returning its id.
    async fn create_document(&mut self, title: &str, tabs: &[String]) -> Result<String>;

    /// The document's title.
    async fn document_title(&mut self, document_id: &str) -> Result<String>;

    /// The names of every tab in the document, in sheet order.
    async fn tab_titles(&mut self, document_id: &str) -> Result<Vec<String>>;

    /// Deletes the `remove` tabs and adds the `add` tabs in one structural request. The
    /// backend applies the request as a unit, so a rebuild cannot be left half done.
    async fn modify_tabs(&mut self, document_id: &str, add: &[String], remove: &[String])
        -> Result<()>;

    /// Clears every listed range in one batched call.
    async fn clear_ranges(&mut self, document_id: &str, ranges: &[String]) -> Result<()>;

    /// Writes every listed block in one batched call.
    async fn write_ranges(&mut self, document_id: &str, data: &[SheetRange]) -> Result<()>;

    /// Reads every listed range in one batched call, returning `(tab name, rows)` pairs in
    /// request order. A range with no values yields an empty row list.
    async fn read_ranges(
        &mut self,
        document_id: &str,
        ranges: &[String],
    ) -> Result<Vec<(String, Vec<Vec<String>>)>>;
}
