//! `kessler-ingest` — feed importers.
//!
//! Each importer turns one external feed (CelesTrak element sets,
//! Space-Track GP queries, the UNOOSA registry CSV, the Kaggle catalog
//! snapshot) into per-source records and upserts them through the store,
//! which recomputes the canonical view. Importers run sequentially per
//! source; transient fetch failures are logged, counted, and skipped —
//! a failed source contribution is never re-attempted within a run.

pub mod celestrak;
pub mod error;
pub mod fetch;
pub mod kaggle;
pub mod spacetrack;
pub mod tle;
pub mod unoosa;

pub use error::ImportError;
pub use fetch::{FetchClient, TtlCache};
