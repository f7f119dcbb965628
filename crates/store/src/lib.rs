//! `kessler-store` — persistence for satellite envelopes.
//!
//! A single-file SQLite database holds one row per envelope: the full
//! document as JSON plus extracted canonical columns for querying, and a
//! `source_keys` side table for per-source NORAD/name lookups.
//!
//! # Concurrency
//!
//! All mutations are last-writer-wins at envelope granularity. The
//! read-modify-write cycle in upsert/promote carries no lock or
//! concurrency token: two writers racing on one identifier lose the
//! earlier writer's unseen changes. Batch imports therefore run
//! sequentially per source, and parallel fetchers serialize their store
//! writes on one thread.

pub mod envelopes;
pub mod error;
pub mod matcher;
pub mod promote;

pub use envelopes::{EnvelopeStore, Facet, SearchQuery, DEFAULT_SEARCH_LIMIT};
pub use error::StoreError;
pub use matcher::Matcher;
pub use promote::{
    parse_filter, Promoter, PromotionOutcome, PromotionPlan, PromotionPreview, PromotionRequest,
    CONFIRM_THRESHOLD, PREVIEW_LIMIT,
};
