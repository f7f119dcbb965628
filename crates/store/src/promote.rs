//! Batch attribute promotion.
//!
//! Copies a value from one document path to another across every envelope
//! matching a filter, recording each copy in the envelope's transformation
//! history. Null and empty-string source values are never promoted. A
//! structural failure on one envelope (setting through an existing scalar)
//! is recorded and the batch continues.

use serde_json::Value;

use kessler_registry::document::{Envelope, PROMOTED_BY_MANUAL};
use kessler_registry::fieldpath::{get_path, normalize, set_path, FieldPath};
use kessler_registry::value::{coerce_scalar, non_empty};

use crate::envelopes::EnvelopeStore;
use crate::error::StoreError;

/// Sample rows shown for a dry run or before confirmation.
pub const PREVIEW_LIMIT: usize = 10;

/// Batches touching more than this many envelopes require explicit
/// confirmation.
pub const CONFIRM_THRESHOLD: u64 = 10;

/// One requested promotion. Paths are taken in user notation and
/// normalized (`kaggle_1.x` → `sources.kaggle_1.x`) before use.
#[derive(Debug, Clone)]
pub struct PromotionRequest {
    pub source_field: String,
    pub target_field: String,
    pub filter: Vec<(String, Value)>,
    pub reason: Option<String>,
    pub dry_run: bool,
    /// Stop after this many candidates. `None` means the whole store.
    pub limit: Option<u64>,
}

impl PromotionRequest {
    pub fn new(source_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        PromotionRequest {
            source_field: source_field.into(),
            target_field: target_field.into(),
            filter: Vec::new(),
            reason: None,
            dry_run: false,
            limit: None,
        }
    }
}

/// What a promotion would touch, computed without writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionPlan {
    /// Envelopes that match the filter and carry a non-empty source value.
    pub candidates: u64,
    /// Candidates whose target already holds a non-empty value. The
    /// promotion overwrites these; the count is informational.
    pub conflicts: u64,
}

/// One would-be or actual promotion, for preview output.
#[derive(Debug, Clone)]
pub struct PromotionPreview {
    pub identifier: String,
    pub value: Value,
    pub existing: Option<Value>,
}

/// Result of a promotion batch.
#[derive(Debug, Clone, Default)]
pub struct PromotionOutcome {
    /// Envelopes written (or, on a dry run, that would be written).
    pub promoted: u64,
    /// Filter matches whose source value was absent, null, or "".
    pub skipped: u64,
    /// Promotions that overwrote a differing target value.
    pub conflicts: u64,
    /// Per-envelope structural failures; the batch continued past them.
    pub errors: Vec<String>,
    /// First `PREVIEW_LIMIT` candidates.
    pub previews: Vec<PromotionPreview>,
    pub dry_run: bool,
}

/// Parse a `field=value[,field=value]` filter expression. Values are
/// typed integer, then float, then string.
pub fn parse_filter(spec: &str) -> Result<Vec<(String, Value)>, StoreError> {
    let mut out = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (field, value) = part.split_once('=').ok_or_else(|| {
            StoreError::InvalidFilter(format!("expected field=value, got '{part}'"))
        })?;
        let field = field.trim();
        if field.is_empty() {
            return Err(StoreError::InvalidFilter(format!(
                "missing field name in '{part}'"
            )));
        }
        out.push((field.to_string(), coerce_scalar(value.trim())));
    }
    Ok(out)
}

pub struct Promoter<'a> {
    store: &'a EnvelopeStore,
}

impl<'a> Promoter<'a> {
    pub fn new(store: &'a EnvelopeStore) -> Promoter<'a> {
        Promoter { store }
    }

    /// Dry scan with the exact logic `execute` applies, so the plan and
    /// the batch can never disagree.
    pub fn plan(&self, request: &PromotionRequest) -> Result<PromotionPlan, StoreError> {
        let dry = PromotionRequest {
            dry_run: true,
            ..request.clone()
        };
        let outcome = self.execute(&dry)?;
        Ok(PromotionPlan {
            candidates: outcome.promoted,
            conflicts: outcome.conflicts,
        })
    }

    /// Run the batch. Path validation happens up front; per-envelope
    /// failures are collected, not fatal.
    pub fn execute(&self, request: &PromotionRequest) -> Result<PromotionOutcome, StoreError> {
        let source = FieldPath::parse(&normalize(&request.source_field))?;
        let target = FieldPath::parse(&normalize(&request.target_field))?;
        let filter: Vec<(FieldPath, Value)> = request
            .filter
            .iter()
            .map(|(field, value)| {
                Ok((FieldPath::parse(&normalize(field))?, value.clone()))
            })
            .collect::<Result<_, StoreError>>()?;

        let mut outcome = PromotionOutcome {
            dry_run: request.dry_run,
            ..PromotionOutcome::default()
        };
        for envelope in self.store.all()? {
            let mut doc = serde_json::to_value(&envelope)?;
            if !matches_filter(&doc, &filter) {
                continue;
            }
            let value = match get_path(&doc, &source).and_then(non_empty) {
                Some(v) => v.clone(),
                None => {
                    outcome.skipped += 1;
                    continue;
                }
            };
            if request.limit.is_some_and(|limit| outcome.promoted >= limit) {
                break;
            }
            let existing = get_path(&doc, &target).and_then(non_empty).cloned();
            if existing.is_some() {
                outcome.conflicts += 1;
            }
            if outcome.previews.len() < PREVIEW_LIMIT {
                outcome.previews.push(PromotionPreview {
                    identifier: envelope.identifier.clone(),
                    value: value.clone(),
                    existing: existing.clone(),
                });
            }
            if request.dry_run {
                outcome.promoted += 1;
                continue;
            }
            if let Err(err) = set_path(&mut doc, &target, value.clone()) {
                outcome.errors.push(format!("{}: {err}", envelope.identifier));
                continue;
            }
            let mut updated: Envelope = match serde_json::from_value(doc) {
                Ok(envelope) => envelope,
                Err(err) => {
                    outcome.errors.push(format!("{}: {err}", envelope.identifier));
                    continue;
                }
            };
            updated.record_transformation(
                source.as_str(),
                target.as_str(),
                value,
                PROMOTED_BY_MANUAL,
                request.reason.clone(),
            );
            updated.touch();
            self.store.replace(&updated)?;
            outcome.promoted += 1;
        }
        Ok(outcome)
    }
}

/// Exact equality on every filter clause. Absent fields never match.
fn matches_filter(doc: &Value, filter: &[(FieldPath, Value)]) -> bool {
    filter
        .iter()
        .all(|(path, expected)| get_path(doc, path) == Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn seeded_store() -> EnvelopeStore {
        let store = EnvelopeStore::open_in_memory().unwrap();
        store
            .upsert(
                "norad-900",
                "kaggle_1",
                fields(&[
                    ("norad_id", json!("900")),
                    ("orbital_band", json!("LEO")),
                    ("launch_mass_kg", json!(35)),
                ]),
            )
            .unwrap();
        store
            .upsert(
                "norad-901",
                "kaggle_1",
                fields(&[("norad_id", json!("901")), ("orbital_band", json!("GEO"))]),
            )
            .unwrap();
        store
            .upsert(
                "norad-902",
                "kaggle_1",
                fields(&[("norad_id", json!("902")), ("orbital_band", json!(""))]),
            )
            .unwrap();
        store
    }

    #[test]
    fn promotes_into_canonical_and_logs() {
        let store = seeded_store();
        let request =
            PromotionRequest::new("kaggle_1.orbital_band", "canonical.orbital_band_manual");
        let outcome = Promoter::new(&store).execute(&request).unwrap();
        assert_eq!(outcome.promoted, 2);
        assert_eq!(outcome.skipped, 1); // empty string never promoted
        assert!(outcome.errors.is_empty());

        let env = store.get("norad-900").unwrap().unwrap();
        assert_eq!(env.canonical.extra["orbital_band_manual"], json!("LEO"));
        let t = &env.metadata.transformations;
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].source_field, "sources.kaggle_1.orbital_band");
        assert_eq!(t[0].target_field, "canonical.orbital_band_manual");
        assert_eq!(t[0].value, json!("LEO"));
        assert_eq!(t[0].promoted_by, PROMOTED_BY_MANUAL);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let store = seeded_store();
        let mut request =
            PromotionRequest::new("kaggle_1.orbital_band", "canonical.orbital_band_manual");
        request.dry_run = true;
        let outcome = Promoter::new(&store).execute(&request).unwrap();
        assert!(outcome.dry_run);
        assert_eq!(outcome.promoted, 2);
        assert_eq!(outcome.previews.len(), 2);

        let env = store.get("norad-900").unwrap().unwrap();
        assert!(!env.canonical.extra.contains_key("orbital_band_manual"));
        assert!(env.metadata.transformations.is_empty());
    }

    #[test]
    fn filter_restricts_the_batch() {
        let store = seeded_store();
        let mut request =
            PromotionRequest::new("kaggle_1.orbital_band", "canonical.orbital_band_manual");
        request.filter = parse_filter("kaggle_1.orbital_band=GEO").unwrap();
        let outcome = Promoter::new(&store).execute(&request).unwrap();
        assert_eq!(outcome.promoted, 1);
        assert_eq!(outcome.skipped, 0);
        assert!(store
            .get("norad-900")
            .unwrap()
            .unwrap()
            .metadata
            .transformations
            .is_empty());
        assert_eq!(
            store.get("norad-901").unwrap().unwrap().canonical.extra["orbital_band_manual"],
            json!("GEO")
        );
    }

    #[test]
    fn filter_values_are_typed() {
        let filter = parse_filter("a.b=42,c.d=1.5,e.f=LEO").unwrap();
        assert_eq!(filter[0].1, json!(42));
        assert_eq!(filter[1].1, json!(1.5));
        assert_eq!(filter[2].1, json!("LEO"));
        assert!(parse_filter("no-equals-sign").is_err());
        assert!(parse_filter("=value").is_err());

        let store = seeded_store();
        let mut request = PromotionRequest::new("kaggle_1.norad_id", "canonical.norad_manual");
        request.filter = parse_filter("kaggle_1.launch_mass_kg=35").unwrap();
        let outcome = Promoter::new(&store).execute(&request).unwrap();
        assert_eq!(outcome.promoted, 1);
    }

    #[test]
    fn conflicts_counted_but_overwritten() {
        let store = seeded_store();
        let first = PromotionRequest::new("kaggle_1.orbital_band", "canonical.band_manual");
        Promoter::new(&store).execute(&first).unwrap();

        // Second pass from a field with different values.
        let second = PromotionRequest::new("kaggle_1.norad_id", "canonical.band_manual");
        let outcome = Promoter::new(&store).execute(&second).unwrap();
        assert_eq!(outcome.conflicts, 2);
        assert_eq!(outcome.promoted, 3);
        assert_eq!(
            store.get("norad-900").unwrap().unwrap().canonical.extra["band_manual"],
            json!("900")
        );
    }

    #[test]
    fn rerun_counts_every_occupied_target() {
        let store = seeded_store();
        let request = PromotionRequest::new("kaggle_1.orbital_band", "canonical.band_manual");
        let promoter = Promoter::new(&store);
        promoter.execute(&request).unwrap();

        // Same values again: the targets are occupied, so every candidate
        // counts as a conflict even though nothing changes.
        let outcome = promoter.execute(&request).unwrap();
        assert_eq!(outcome.promoted, 2);
        assert_eq!(outcome.conflicts, 2);
    }

    #[test]
    fn undeserializable_document_counts_as_error_not_abort() {
        let store = seeded_store();
        // canonical.orbit.apogee_km is a typed float; a string there makes
        // the envelope fail to deserialize after the set.
        let request =
            PromotionRequest::new("kaggle_1.orbital_band", "canonical.orbit.apogee_km");
        let outcome = Promoter::new(&store).execute(&request).unwrap();
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.promoted, 0);
        assert_eq!(outcome.skipped, 1); // the empty-string envelope

        // Nothing was written for the failed envelopes.
        let env = store.get("norad-900").unwrap().unwrap();
        assert!(env.canonical.orbit.apogee_km.is_none());
        assert!(env.metadata.transformations.is_empty());
    }

    #[test]
    fn structural_failure_skips_envelope_and_continues() {
        let store = seeded_store();
        // norad-900 has a scalar at sources.kaggle_1.orbital_band; setting
        // beneath it must fail for that envelope only.
        let request = PromotionRequest::new(
            "kaggle_1.norad_id",
            "sources.kaggle_1.orbital_band.nested",
        );
        let outcome = Promoter::new(&store).execute(&request).unwrap();
        assert_eq!(outcome.errors.len(), 3);
        assert_eq!(outcome.promoted, 0);

        // Failed envelopes kept their original scalar.
        let env = store.get("norad-900").unwrap().unwrap();
        assert_eq!(env.sources["kaggle_1"].fields["orbital_band"], json!("LEO"));
        assert!(env.metadata.transformations.is_empty());
    }

    #[test]
    fn plan_matches_execute() {
        let store = seeded_store();
        let request =
            PromotionRequest::new("kaggle_1.orbital_band", "canonical.orbital_band_manual");
        let promoter = Promoter::new(&store);
        let plan = promoter.plan(&request).unwrap();
        assert_eq!(plan, PromotionPlan { candidates: 2, conflicts: 0 });
        // Planning writes nothing.
        assert!(store
            .get("norad-901")
            .unwrap()
            .unwrap()
            .metadata
            .transformations
            .is_empty());

        let outcome = promoter.execute(&request).unwrap();
        assert_eq!(outcome.promoted, plan.candidates);
    }

    #[test]
    fn limit_stops_the_batch_early() {
        let store = seeded_store();
        let mut request =
            PromotionRequest::new("kaggle_1.orbital_band", "canonical.orbital_band_manual");
        request.limit = Some(1);
        let outcome = Promoter::new(&store).execute(&request).unwrap();
        assert_eq!(outcome.promoted, 1);

        let touched = store
            .all()
            .unwrap()
            .iter()
            .filter(|e| !e.metadata.transformations.is_empty())
            .count();
        assert_eq!(touched, 1);
    }

    #[test]
    fn preview_capped_at_limit() {
        let store = EnvelopeStore::open_in_memory().unwrap();
        for n in 0..15 {
            store
                .upsert(
                    &format!("norad-{n:03}"),
                    "kaggle_1",
                    fields(&[("orbital_band", json!("LEO"))]),
                )
                .unwrap();
        }
        let request = PromotionRequest::new("kaggle_1.orbital_band", "canonical.band_manual");
        let outcome = Promoter::new(&store).execute(&request).unwrap();
        assert_eq!(outcome.promoted, 15);
        assert_eq!(outcome.previews.len(), PREVIEW_LIMIT);
    }

    #[test]
    fn invalid_path_rejected_before_any_write() {
        let store = seeded_store();
        let request = PromotionRequest::new("kaggle_1.orbital band", "canonical.x");
        let err = Promoter::new(&store).execute(&request).unwrap_err();
        assert!(matches!(err, StoreError::Path(_)));
    }
}
