//! `kessler-registry` — Multi-source satellite envelope reconciliation engine.
//!
//! Pure engine crate: document model, identifier normalization,
//! canonicalization, and nested-path utilities. No IO or CLI dependencies;
//! persistence lives in `kessler-store`.

pub mod canonical;
pub mod designator;
pub mod document;
pub mod error;
pub mod fieldpath;
pub mod matcher;
pub mod value;

pub use canonical::update_canonical;
pub use document::{Envelope, Metadata, SourceRecord, Transformation};
pub use error::RegistryError;
pub use fieldpath::FieldPath;
pub use matcher::MatchKeys;
