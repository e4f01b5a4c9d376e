//! The crate-wide error type and `Result` alias.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in the synchronization core.
///
/// The first four variants are the conditions callers are expected to match on; the
/// transparent variants carry lower-level failures from the libraries we sit on top of.
#[derive(Debug, Error)]
pub enum Error {
    /// A remote call was attempted with no credential available. Fatal to the operation,
    /// never retried.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The tabular backend rejected a request. Carries the backend's own message when one
    /// could be read from the response body.
    #[error("remote service error: {message}")]
    Remote {
        status: Option<u16>,
        message: String,
    },

    /// A value was rejected before any state mutation took place.
    #[error("{0}")]
    Validation(String),

    /// A bulk import named accounts that do not exist. The whole batch was rejected.
    #[error("import aborted, unresolved account names: {}", .names.join(", "))]
    ImportAborted { names: Vec<String> },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Constructs a `Validation` error from anything displayable.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}
