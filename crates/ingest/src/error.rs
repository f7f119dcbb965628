use std::fmt;

use kessler_store::StoreError;

#[derive(Debug)]
pub enum ImportError {
    /// Missing or rejected feed credentials. Aborts the import up front.
    Auth(String),
    /// An HTTP fetch failed after retries. Per-item failures are counted
    /// by the importers instead; this variant is for unrecoverable ones.
    Http(String),
    /// Input file could not be read.
    Io(String),
    /// CSV structure problem (missing column, unreadable row).
    Csv(String),
    Store(StoreError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(msg) => write!(f, "authentication failed: {msg}"),
            Self::Http(msg) => write!(f, "fetch failed: {msg}"),
            Self::Io(msg) => write!(f, "{msg}"),
            Self::Csv(msg) => write!(f, "bad csv input: {msg}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<StoreError> for ImportError {
    fn from(err: StoreError) -> Self {
        ImportError::Store(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Csv(err.to_string())
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Io(err.to_string())
    }
}
