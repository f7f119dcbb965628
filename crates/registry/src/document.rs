use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Preference order applied when no explicit priority is configured.
pub const DEFAULT_SOURCE_PRIORITY: [&str; 4] = ["unoosa", "celestrak", "spacetrack", "kaggle"];

/// Who gets credited for automatic promotions performed by the CLI.
pub const PROMOTED_BY_MANUAL: &str = "manual_promotion";

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Per-object document: raw multi-source data plus the derived canonical view.
///
/// Open fields outside the typed shape (ad-hoc promotion targets) survive
/// serde round trips through the flattened `extra` maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Stable primary key. International designator when available, else
    /// registration number, else a synthetic `norad-<id>` token.
    /// Immutable once assigned; never recomputed from content.
    pub identifier: String,
    #[serde(default)]
    pub canonical: Canonical,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceRecord>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// New envelope seeded with a single source contribution. The caller
    /// runs the canonicalizer before persisting.
    pub fn new(identifier: impl Into<String>, source: &str, fields: Map<String, Value>) -> Self {
        let now = now_rfc3339();
        let mut sources = BTreeMap::new();
        sources.insert(
            source.to_string(),
            SourceRecord {
                fields,
                updated_at: now.clone(),
            },
        );
        Envelope {
            identifier: identifier.into(),
            canonical: Canonical::default(),
            sources,
            metadata: Metadata {
                created_at: now.clone(),
                last_updated_at: now,
                sources_available: vec![source.to_string()],
                source_priority: DEFAULT_SOURCE_PRIORITY
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                transformations: Vec::new(),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    /// Replace one source's contribution wholesale and refresh the
    /// bookkeeping. No field-level merge within a source.
    pub fn insert_source(&mut self, source: &str, fields: Map<String, Value>) {
        let now = now_rfc3339();
        self.sources.insert(
            source.to_string(),
            SourceRecord {
                fields,
                updated_at: now.clone(),
            },
        );
        self.metadata.sources_available = self.sources.keys().cloned().collect();
        self.metadata.last_updated_at = now;
    }

    /// Remove a source contribution (administrative merges only).
    pub fn remove_source(&mut self, source: &str) -> Option<SourceRecord> {
        let removed = self.sources.remove(source);
        self.metadata.sources_available = self.sources.keys().cloned().collect();
        removed
    }

    /// Refresh `last_updated_at`; every write path calls this.
    pub fn touch(&mut self) {
        self.metadata.last_updated_at = now_rfc3339();
    }

    /// Append one immutable transformation record to the history.
    pub fn record_transformation(
        &mut self,
        source_field: &str,
        target_field: &str,
        value: Value,
        promoted_by: &str,
        reason: Option<String>,
    ) {
        self.metadata.transformations.push(Transformation {
            timestamp: now_rfc3339(),
            source_field: source_field.to_string(),
            target_field: target_field.to_string(),
            value,
            promoted_by: promoted_by.to_string(),
            reason,
        });
    }
}

/// One origin's contribution: a free-form key/value bag plus its own
/// update timestamp. Overwritten wholesale on re-import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub updated_at: String,
}

impl SourceRecord {
    /// A field value, with null/empty-string normalized to absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).and_then(crate::value::non_empty)
    }
}

// ---------------------------------------------------------------------------
// Canonical view
// ---------------------------------------------------------------------------

/// The reconciled view, derived from `sources` by priority. One explicit
/// optional slot per canonical attribute; values keep their source type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Canonical {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_of_origin: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub international_designator: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norad_cat_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_launch: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_document: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub un_registered: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gso_location: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_decay_or_change: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secretariat_remarks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_website: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_vehicle: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_launch: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rcs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orbital_band: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub congestion_risk: Option<Value>,
    #[serde(default)]
    pub orbit: Orbit,
    #[serde(default)]
    pub tle: Tle,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_priority: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Orbital parameters, resolved independently per field — one source may
/// win for apogee while another wins for inclination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Orbit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apogee_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perigee_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclination_degrees: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_minutes: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Two-line element set, with the source keys `tle_line1`/`tle_line2`
/// renamed to `line1`/`line2` in the canonical view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Set once at envelope creation.
    pub created_at: String,
    /// Refreshed on every write.
    pub last_updated_at: String,
    /// Always equals `keys(sources)` after any write.
    #[serde(default)]
    pub sources_available: Vec<String>,
    /// Configured preference order; the canonicalizer filters it to the
    /// sources actually present.
    #[serde(default)]
    pub source_priority: Vec<String>,
    /// Append-only promotion history.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformations: Vec<Transformation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Metadata {
    fn default() -> Self {
        let now = now_rfc3339();
        Metadata {
            created_at: now.clone(),
            last_updated_at: now,
            sources_available: Vec::new(),
            source_priority: DEFAULT_SOURCE_PRIORITY
                .iter()
                .map(|s| s.to_string())
                .collect(),
            transformations: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// One entry in the promotion history. Immutable once appended; vector
/// order is chronological.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformation {
    pub timestamp: String,
    pub source_field: String,
    pub target_field: String,
    pub value: Value,
    pub promoted_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn new_envelope_bookkeeping() {
        let env = Envelope::new("1998-067A", "unoosa", fields(&[("status", json!("Operational"))]));
        assert_eq!(env.identifier, "1998-067A");
        assert_eq!(env.metadata.sources_available, vec!["unoosa"]);
        assert_eq!(
            env.metadata.source_priority,
            vec!["unoosa", "celestrak", "spacetrack", "kaggle"]
        );
        assert!(!env.metadata.created_at.is_empty());
    }

    #[test]
    fn insert_source_refreshes_sources_available() {
        let mut env = Envelope::new("1998-067A", "unoosa", Map::new());
        env.insert_source("celestrak", fields(&[("name", json!("ISS (ZARYA)"))]));
        assert_eq!(env.metadata.sources_available, vec!["celestrak", "unoosa"]);
        env.remove_source("unoosa");
        assert_eq!(env.metadata.sources_available, vec!["celestrak"]);
    }

    #[test]
    fn source_overwritten_wholesale() {
        let mut env = Envelope::new(
            "1998-067A",
            "celestrak",
            fields(&[("name", json!("ISS")), ("apogee_km", json!(420.0))]),
        );
        env.insert_source("celestrak", fields(&[("name", json!("ISS (ZARYA)"))]));
        let rec = &env.sources["celestrak"];
        assert_eq!(rec.field("name"), Some(&json!("ISS (ZARYA)")));
        assert!(rec.field("apogee_km").is_none());
    }

    #[test]
    fn round_trip_preserves_ad_hoc_fields() {
        let mut env = Envelope::new("1998-067A", "unoosa", Map::new());
        env.canonical
            .extra
            .insert("country_of_origin_test".into(), json!("USA"));
        let raw = serde_json::to_value(&env).unwrap();
        assert_eq!(raw["canonical"]["country_of_origin_test"], json!("USA"));
        let back: Envelope = serde_json::from_value(raw).unwrap();
        assert_eq!(back.canonical.extra["country_of_origin_test"], json!("USA"));
    }

    #[test]
    fn transformation_log_appends_in_order() {
        let mut env = Envelope::new("1998-067A", "unoosa", Map::new());
        env.record_transformation("a.b", "c.d", json!(123), PROMOTED_BY_MANUAL, None);
        env.record_transformation("x.y", "z.w", json!(456), PROMOTED_BY_MANUAL, Some("why".into()));
        assert_eq!(env.metadata.transformations.len(), 2);
        assert_eq!(env.metadata.transformations[0].value, json!(123));
        assert!(env.metadata.transformations[0].reason.is_none());
        assert_eq!(env.metadata.transformations[1].reason.as_deref(), Some("why"));
    }
}
