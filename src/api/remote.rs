//! Implements the `SheetApi` trait against the spreadsheet service's REST API.

use crate::api::{SheetApi, SheetRange};
use crate::tabs::range_tab;
use crate::{Error, Result};
use anyhow::Context;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::trace;
use url::Url;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// The credential boundary. Token acquisition, refresh, and the sign-in flow all live
/// outside this crate; the core only ever asks for the current access token.
pub trait AuthProvider: Send + Sync {
    /// The current access token, or `None` when the user is not signed in.
    fn access_token(&self) -> Option<String>;

    fn is_signed_in(&self) -> bool {
        self.access_token().is_some()
    }
}

/// An `AuthProvider` holding a fixed token. Useful for wiring and for driving
/// `RemoteSheets` from tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth(pub Option<String>);

impl AuthProvider for StaticAuth {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Implements `SheetApi` over HTTP. Every call fetches the bearer token from the injected
/// `AuthProvider` and fails with `Error::NotAuthenticated` when none is available.
pub struct RemoteSheets {
    http: reqwest::Client,
    auth: Arc<dyn AuthProvider>,
}

impl RemoteSheets {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
        }
    }

    fn token(&self) -> Result<String> {
        self.auth.access_token().ok_or(Error::NotAuthenticated)
    }

    /// Sends a request and maps non-2xx responses to `Error::Remote`, carrying the
    /// backend's own message when the error body has one.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.bearer_auth(self.token()?).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Sheets API error: {}", status.as_u16()));
            return Err(Error::Remote {
                status: Some(status.as_u16()),
                message,
            });
        }
        Ok(response.json().await?)
    }

    /// Fetches `(title, sheetId)` for every tab in the document.
    async fn sheet_properties(&self, document_id: &str) -> Result<Vec<(String, i64)>> {
        let url = format!("{SHEETS_BASE}/{document_id}?fields=sheets.properties");
        let body = self.execute(self.http.get(&url)).await?;
        let sheets = body
            .pointer("/sheets")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(sheets
            .iter()
            .filter_map(|sheet| {
                let properties = sheet.get("properties")?;
                let title = properties.get("title")?.as_str()?.to_string();
                let sheet_id = properties.get("sheetId")?.as_i64()?;
                Some((title, sheet_id))
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl SheetApi for RemoteSheets {
    async fn create_document(&mut self, title: &str, tabs: &[String]) -> Result<String> {
        trace!("create_document '{title}'");
        let sheets: Vec<Value> = tabs
            .iter()
            .map(|tab| json!({ "properties": { "title": tab } }))
            .collect();
        let body = json!({ "properties": { "title": title }, "sheets": sheets });
        let response = self.execute(self.http.post(SHEETS_BASE).json(&body)).await?;
        let id = response
            .get("spreadsheetId")
            .and_then(Value::as_str)
            .context("Create response missing 'spreadsheetId'")?;
        Ok(id.to_string())
    }

    async fn document_title(&mut self, document_id: &str) -> Result<String> {
        trace!("document_title for {document_id}");
        let url = format!("{SHEETS_BASE}/{document_id}?fields=properties.title");
        let body = self.execute(self.http.get(&url)).await?;
        Ok(body
            .pointer("/properties/title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled")
            .to_string())
    }

    async fn tab_titles(&mut self, document_id: &str) -> Result<Vec<String>> {
        trace!("tab_titles for {document_id}");
        let properties = self.sheet_properties(document_id).await?;
        Ok(properties.into_iter().map(|(title, _)| title).collect())
    }

    async fn modify_tabs(
        &mut self,
        document_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<()> {
        trace!("modify_tabs for {document_id}: +{} -{}", add.len(), remove.len());
        let properties = self.sheet_properties(document_id).await?;
        let mut requests: Vec<Value> = Vec::new();
        for (title, sheet_id) in &properties {
            if remove.contains(title) {
                requests.push(json!({ "deleteSheet": { "sheetId": sheet_id } }));
            }
        }
        for tab in add {
            requests.push(json!({ "addSheet": { "properties": { "title": tab } } }));
        }
        if requests.is_empty() {
            return Ok(());
        }
        let url = format!("{SHEETS_BASE}/{document_id}:batchUpdate");
        self.execute(self.http.post(&url).json(&json!({ "requests": requests })))
            .await?;
        Ok(())
    }

    async fn clear_ranges(&mut self, document_id: &str, ranges: &[String]) -> Result<()> {
        trace!("clear_ranges for {document_id}: {ranges:?}");
        let url = format!("{SHEETS_BASE}/{document_id}/values:batchClear");
        self.execute(self.http.post(&url).json(&json!({ "ranges": ranges })))
            .await?;
        Ok(())
    }

    async fn write_ranges(&mut self, document_id: &str, data: &[SheetRange]) -> Result<()> {
        trace!("write_ranges for {document_id}: {} blocks", data.len());
        let blocks: Vec<Value> = data
            .iter()
            .map(|block| {
                json!({
                    "range": block.range,
                    "majorDimension": "ROWS",
                    "values": block.values,
                })
            })
            .collect();
        let url = format!("{SHEETS_BASE}/{document_id}/values:batchUpdate");
        let body = json!({ "valueInputOption": "RAW", "data": blocks });
        self.execute(self.http.post(&url).json(&body)).await?;
        Ok(())
    }

    async fn read_ranges(
        &mut self,
        document_id: &str,
        ranges: &[String],
    ) -> Result<Vec<(String, Vec<Vec<String>>)>> {
        trace!("read_ranges for {document_id}: {} ranges", ranges.len());
        let mut params: Vec<(&str, &str)> = ranges.iter().map(|r| ("ranges", r.as_str())).collect();
        params.push(("majorDimension", "ROWS"));
        let url = Url::parse_with_params(
            &format!("{SHEETS_BASE}/{document_id}/values:batchGet"),
            &params,
        )
        .context("Failed to build batchGet URL")?;
        let body = self.execute(self.http.get(url)).await?;
        let value_ranges = body
            .get("valueRanges")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(value_ranges
            .iter()
            .map(|vr| {
                let tab = vr
                    .get("range")
                    .and_then(Value::as_str)
                    .map(range_tab)
                    .unwrap_or_default();
                let rows = vr
                    .get("values")
                    .and_then(Value::as_array)
                    .map(|rows| {
                        rows.iter()
                            .map(|row| {
                                row.as_array()
                                    .map(|cells| {
                                        cells
                                            .iter()
                                            .map(|cell| match cell {
                                                Value::String(s) => s.clone(),
                                                other => other.to_string(),
                                            })
                                            .collect()
                                    })
                                    .unwrap_or_default()
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (tab, rows)
            })
            .collect())
    }
}
