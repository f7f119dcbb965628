use std::fmt;

use kessler_registry::RegistryError;

#[derive(Debug)]
pub enum StoreError {
    /// Could not open or initialize the database file. Fatal at startup.
    Open(String),
    /// SQLite error during a query or write.
    Sqlite(String),
    /// Envelope JSON failed to (de)serialize.
    Document(String),
    /// Invalid field path (validation happens before any store access).
    Path(RegistryError),
    /// Bad `field=value` filter expression.
    InvalidFilter(String),
    /// One designator resolves to two distinct envelopes — a data-quality
    /// error, surfaced instead of silently merged.
    DesignatorCollision {
        designator: String,
        first: String,
        second: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(msg) => write!(f, "cannot open envelope store: {msg}"),
            Self::Sqlite(msg) => write!(f, "store error: {msg}"),
            Self::Document(msg) => write!(f, "envelope document error: {msg}"),
            Self::Path(err) => write!(f, "{err}"),
            Self::InvalidFilter(msg) => write!(f, "invalid filter: {msg}"),
            Self::DesignatorCollision {
                designator,
                first,
                second,
            } => write!(
                f,
                "designator '{designator}' matches two distinct envelopes ('{first}', '{second}')"
            ),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Document(err.to_string())
    }
}

impl From<RegistryError> for StoreError {
    fn from(err: RegistryError) -> Self {
        StoreError::Path(err)
    }
}
