//! Persists the last-used document id across process restarts.
//!
//! Simple key-value persistence: one small JSON file in the user data directory. A missing
//! or unreadable file reads as "no remembered document" because session recall is a
//! convenience, never an error source.

use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "sheetbook";
const SESSION_JSON: &str = "session.json";

/// Represents the serialization format of the session file.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
struct SessionFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    document_id: Option<String>,
}

/// Reads and writes the remembered document id.
#[derive(Debug, Clone)]
pub struct Session {
    path: PathBuf,
}

impl Session {
    /// A session file inside `dir`. Used by tests and by callers that manage their own
    /// data directory.
    pub fn new_in(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(SESSION_JSON),
        }
    }

    /// The session file in the platform user data directory, when one exists.
    pub fn in_user_data_dir() -> Option<Self> {
        dirs::data_dir().map(|dir| Self::new_in(dir.join(APP_DIR)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records `document_id` as the document to reopen next session.
    pub async fn remember_document(&self, document_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Unable to create {}", parent.display()))?;
        }
        let file = SessionFile {
            document_id: Some(document_id.to_string()),
        };
        let json = serde_json::to_string_pretty(&file).context("Unable to serialize session")?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Unable to write {}", self.path.display()))?;
        debug!("Remembered document {document_id}");
        Ok(())
    }

    /// The remembered document id, or `None` when there is no usable session file.
    pub async fn last_document_id(&self) -> Option<String> {
        let content = tokio::fs::read_to_string(&self.path).await.ok()?;
        let file: SessionFile = serde_json::from_str(&content).ok()?;
        file.document_id
    }

    /// Forgets the remembered document.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_remember_and_recall() {
        let dir = TempDir::new().unwrap();
        let session = Session::new_in(dir.path());
        assert_eq!(session.last_document_id().await, None);

        session.remember_document("doc-123").await.unwrap();
        assert_eq!(
            session.last_document_id().await,
            Some("doc-123".to_string())
        );

        session.remember_document("doc-456").await.unwrap();
        assert_eq!(
            session.last_document_id().await,
            Some("doc-456".to_string())
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let session = Session::new_in(dir.path());
        tokio::fs::write(session.path(), "not json").await.unwrap();
        assert_eq!(session.last_document_id().await, None);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let session = Session::new_in(dir.path());
        session.clear().await.unwrap();
        session.remember_document("doc-1").await.unwrap();
        session.clear().await.unwrap();
        assert_eq!(session.last_document_id().await, None);
    }

    #[tokio::test]
    async fn test_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let session = Session::new_in(dir.path().join("nested").join("deeper"));
        session.remember_document("doc-9").await.unwrap();
        assert_eq!(session.last_document_id().await, Some("doc-9".to_string()));
    }
}
