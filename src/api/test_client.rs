//! Implements the `SheetApi` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" build so that the whole core can be run
//! top-to-bottom without touching the network.

use crate::api::{SheetApi, SheetRange};
use crate::tabs::range_tab;
use crate::{Error, Result};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
struct TestDocument {
    title: String,
    /// Tab names in sheet order.
    tabs: Vec<String>,
    /// Rows per tab.
    data: HashMap<String, Vec<Vec<String>>>,
}

/// An implementation of the `SheetApi` trait that holds every document in memory and
/// mimics the backend's behavior for missing documents, missing tabs, and duplicate tab
/// names.
#[derive(Debug, Default)]
pub struct TestSheets {
    documents: HashMap<String, TestDocument>,
    next_id: u32,
}

impl TestSheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tab names of a document, for test assertions.
    pub fn tab_names(&self, document_id: &str) -> Vec<String> {
        self.documents
            .get(document_id)
            .map(|doc| doc.tabs.clone())
            .unwrap_or_default()
    }

    /// The raw rows of one tab, for test assertions.
    pub fn rows(&self, document_id: &str, tab: &str) -> Vec<Vec<String>> {
        self.documents
            .get(document_id)
            .and_then(|doc| doc.data.get(tab))
            .cloned()
            .unwrap_or_default()
    }

    fn document(&mut self, document_id: &str) -> Result<&mut TestDocument> {
        self.documents.get_mut(document_id).ok_or(Error::Remote {
            status: Some(404),
            message: format!("Requested entity was not found: {document_id}"),
        })
    }
}

fn missing_tab(tab: &str) -> Error {
    Error::Remote {
        status: Some(400),
        message: format!("Unable to parse range: {tab}"),
    }
}

#[async_trait::async_trait]
impl SheetApi for TestSheets {
    async fn create_document(&mut self, title: &str, tabs: &[String]) -> Result<String> {
        self.next_id += 1;
        let id = format!("doc-{:04}", self.next_id);
        let mut document = TestDocument {
            title: title.to_string(),
            ..TestDocument::default()
        };
        for tab in tabs {
            document.tabs.push(tab.clone());
            document.data.insert(tab.clone(), Vec::new());
        }
        self.documents.insert(id.clone(), document);
        Ok(id)
    }

    async fn document_title(&mut self, document_id: &str) -> Result<String> {
        Ok(self.document(document_id)?.title.clone())
    }

    async fn tab_titles(&mut self, document_id: &str) -> Result<Vec<String>> {
        Ok(self.document(document_id)?.tabs.clone())
    }

    async fn modify_tabs(
        &mut self,
        document_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<()> {
        let document = self.document(document_id)?;
        document.tabs.retain(|tab| !remove.contains(tab));
        for tab in remove {
            document.data.remove(tab);
        }
        for tab in add {
            if document.tabs.contains(tab) {
                return Err(Error::Remote {
                    status: Some(400),
                    message: format!("A sheet with the name \"{tab}\" already exists"),
                });
            }
            document.tabs.push(tab.clone());
            document.data.insert(tab.clone(), Vec::new());
        }
        Ok(())
    }

    async fn clear_ranges(&mut self, document_id: &str, ranges: &[String]) -> Result<()> {
        let document = self.document(document_id)?;
        for range in ranges {
            let tab = range_tab(range);
            let Some(rows) = document.data.get_mut(&tab) else {
                return Err(missing_tab(&tab));
            };
            rows.clear();
        }
        Ok(())
    }

    async fn write_ranges(&mut self, document_id: &str, data: &[SheetRange]) -> Result<()> {
        let document = self.document(document_id)?;
        for block in data {
            let tab = range_tab(&block.range);
            let Some(rows) = document.data.get_mut(&tab) else {
                return Err(missing_tab(&tab));
            };
            *rows = block.values.clone();
        }
        Ok(())
    }

    async fn read_ranges(
        &mut self,
        document_id: &str,
        ranges: &[String],
    ) -> Result<Vec<(String, Vec<Vec<String>>)>> {
        let document = self.document(document_id)?;
        let mut result = Vec::with_capacity(ranges.len());
        for range in ranges {
            let tab = range_tab(range);
            let Some(rows) = document.data.get(&tab) else {
                return Err(missing_tab(&tab));
            };
            result.push((tab, rows.clone()));
        }
        Ok(result)
    }
}

/// Lets a test keep a handle on the `TestSheets` it hands to a `DocumentStore`, so it can
/// inspect the stored tabs afterwards.
#[async_trait::async_trait]
impl SheetApi for std::sync::Arc<tokio::sync::Mutex<TestSheets>> {
    async fn create_document(&mut self, title: &str, tabs: &[String]) -> Result<String> {
        self.lock().await.create_document(title, tabs).await
    }

    async fn document_title(&mut self, document_id: &str) -> Result<String> {
        self.lock().await.document_title(document_id).await
    }

    async fn tab_titles(&mut self, document_id: &str) -> Result<Vec<String>> {
        self.lock().await.tab_titles(document_id).await
    }

    async fn modify_tabs(
        &mut self,
        document_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<()> {
        self.lock().await.modify_tabs(document_id, add, remove).await
    }

    async fn clear_ranges(&mut self, document_id: &str, ranges: &[String]) -> Result<()> {
        self.lock().await.clear_ranges(document_id, ranges).await
    }

    async fn write_ranges(&mut self, document_id: &str, data: &[SheetRange]) -> Result<()> {
        self.lock().await.write_ranges(document_id, data).await
    }

    async fn read_ranges(
        &mut self,
        document_id: &str,
        ranges: &[String],
    ) -> Result<Vec<(String, Vec<Vec<String>>)>> {
        self.lock().await.read_ranges(document_id, ranges).await
    }
}
