//! Canonical view derivation.
//!
//! `canonical` is recomputed wholesale from `sources` on every import:
//! for each field, sources are scanned in priority order and the first
//! present-and-non-empty value wins. Deterministic and idempotent aside
//! from the embedded timestamp. Manual promotions can make `canonical`
//! diverge until the next recompute overwrites it; that divergence is
//! transient by design.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;

use crate::document::{Canonical, Envelope, Orbit, SourceRecord, Tle, DEFAULT_SOURCE_PRIORITY};
use crate::value::non_empty;

/// Scalar fields promoted into `canonical`, in contract order. Every
/// importer maps its feed onto these names.
pub const CANONICAL_FIELDS: [&str; 21] = [
    "name",
    "object_name",
    "country_of_origin",
    "international_designator",
    "registration_number",
    "norad_cat_id",
    "date_of_launch",
    "function",
    "status",
    "registration_document",
    "un_registered",
    "gso_location",
    "date_of_decay_or_change",
    "secretariat_remarks",
    "external_website",
    "launch_vehicle",
    "place_of_launch",
    "object_type",
    "rcs",
    "orbital_band",
    "congestion_risk",
];

pub const ORBIT_FIELDS: [&str; 4] = [
    "apogee_km",
    "perigee_km",
    "inclination_degrees",
    "period_minutes",
];

/// Configured priority filtered to the sources actually present, with any
/// present-but-unlisted source appended afterward — never silently
/// dropped. Unlisted sources append in the sources map's (sorted) order.
pub fn effective_priority(
    configured: &[String],
    sources: &BTreeMap<String, SourceRecord>,
) -> Vec<String> {
    let mut order: Vec<String> = configured
        .iter()
        .filter(|s| sources.contains_key(*s))
        .cloned()
        .collect();
    for name in sources.keys() {
        if !configured.contains(name) {
            order.push(name.clone());
        }
    }
    order
}

/// Recompute `envelope.canonical` from `envelope.sources`.
pub fn update_canonical(envelope: &mut Envelope) {
    let configured = if envelope.metadata.source_priority.is_empty() {
        DEFAULT_SOURCE_PRIORITY.iter().map(|s| s.to_string()).collect()
    } else {
        envelope.metadata.source_priority.clone()
    };
    let order = effective_priority(&configured, &envelope.sources);
    let sources = &envelope.sources;

    // First present-and-non-empty value in priority order.
    let pick = |field: &str| -> Option<Value> {
        order.iter().find_map(|name| {
            sources
                .get(name)
                .and_then(|rec| rec.fields.get(field))
                .and_then(non_empty)
                .cloned()
        })
    };
    let pick_f64 = |field: &str| pick(field).and_then(|v| as_f64(&v));
    let pick_str = |field: &str| {
        pick(field).and_then(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
    };

    envelope.canonical = Canonical {
        name: pick("name"),
        object_name: pick("object_name"),
        country_of_origin: pick("country_of_origin"),
        international_designator: pick("international_designator"),
        registration_number: pick("registration_number"),
        norad_cat_id: pick("norad_cat_id"),
        date_of_launch: pick("date_of_launch"),
        function: pick("function"),
        status: pick("status"),
        registration_document: pick("registration_document"),
        un_registered: pick("un_registered"),
        gso_location: pick("gso_location"),
        date_of_decay_or_change: pick("date_of_decay_or_change"),
        secretariat_remarks: pick("secretariat_remarks"),
        external_website: pick("external_website"),
        launch_vehicle: pick("launch_vehicle"),
        place_of_launch: pick("place_of_launch"),
        object_type: pick("object_type"),
        rcs: pick("rcs"),
        orbital_band: pick("orbital_band"),
        congestion_risk: pick("congestion_risk"),
        // Orbital parameters resolve independently per field: one source
        // may win apogee while another wins inclination.
        orbit: Orbit {
            apogee_km: pick_f64("apogee_km"),
            perigee_km: pick_f64("perigee_km"),
            inclination_degrees: pick_f64("inclination_degrees"),
            period_minutes: pick_f64("period_minutes"),
            extra: serde_json::Map::new(),
        },
        tle: Tle {
            line1: pick_str("tle_line1"),
            line2: pick_str("tle_line2"),
            extra: serde_json::Map::new(),
        },
        source_priority: order,
        updated_at: Utc::now().to_rfc3339(),
        extra: serde_json::Map::new(),
    };
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
