//! Kaggle catalog snapshot import (source `kaggle_1`).
//!
//! Rows are keyed by NORAD id. A row lands on an existing envelope when
//! some earlier source recorded the same NORAD id; otherwise it becomes
//! a new `norad-<id>` envelope. `merge_by_name` is the one-time
//! administrative pass that folds those standalone envelopes into
//! registry envelopes whose source name matches exactly, deleting the
//! orphan — the only path that ever deletes an envelope.

use std::path::Path;

use serde_json::{Map, Number, Value};

use kessler_registry::matcher::synthetic_identifier;
use kessler_registry::value::scalar_text;
use kessler_store::EnvelopeStore;

use crate::error::ImportError;

pub const SOURCE: &str = "kaggle_1";

/// Sources consulted for NORAD matching and for the merge-by-name pass.
const MATCH_SOURCES: [&str; 2] = ["unoosa", "celestrak"];

const TEXT_COLUMNS: [&str; 12] = [
    "name",
    "object_type",
    "satellite_constellation",
    "country",
    "data_source",
    "snapshot_date",
    "last_seen",
    "altitude_category",
    "orbital_band",
    "congestion_risk",
    "epoch",
    "orbit_lifetime_category",
];

const FLOAT_COLUMNS: [&str; 4] = ["altitude_km", "inclination", "eccentricity", "mean_motion"];
const INT_COLUMNS: [&str; 2] = ["launch_year_estimate", "days_in_orbit_estimate"];

#[derive(Debug, Default)]
pub struct KaggleSummary {
    pub imported: u64,
    pub matched: u64,
    pub created: u64,
    /// Rows without a NORAD id.
    pub skipped: u64,
}

pub fn import(store: &EnvelopeStore, catalog_csv: &Path) -> Result<KaggleSummary, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(catalog_csv)
        .map_err(|e| ImportError::Io(format!("cannot read {}: {e}", catalog_csv.display())))?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let norad_col = column("norad_id").ok_or_else(|| {
        ImportError::Csv(format!("{}: missing 'norad_id' column", catalog_csv.display()))
    })?;

    let mut summary = KaggleSummary::default();
    for record in reader.records() {
        let record = record?;
        let Some(norad_id) = record.get(norad_col).map(str::trim).filter(|s| !s.is_empty())
        else {
            summary.skipped += 1;
            continue;
        };

        let mut fields = Map::new();
        fields.insert("norad_id".into(), Value::String(norad_id.to_string()));
        for header in TEXT_COLUMNS {
            let value = column(header)
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty());
            if let Some(value) = value {
                fields.insert(header.to_string(), Value::String(value.to_string()));
            }
        }
        for header in FLOAT_COLUMNS {
            let parsed = column(header)
                .and_then(|i| record.get(i))
                .and_then(|s| s.trim().parse::<f64>().ok())
                .and_then(Number::from_f64);
            if let Some(number) = parsed {
                fields.insert(header.to_string(), Value::Number(number));
            }
        }
        for header in INT_COLUMNS {
            let parsed = column(header)
                .and_then(|i| record.get(i))
                .and_then(|s| s.trim().parse::<i64>().ok());
            if let Some(n) = parsed {
                fields.insert(header.to_string(), Value::Number(n.into()));
            }
        }

        let mut target = None;
        for source in MATCH_SOURCES {
            if let Some(env) = store.find_by_source_norad(source, norad_id)? {
                target = Some(env.identifier);
                break;
            }
        }
        match target {
            Some(identifier) => {
                store.upsert(&identifier, SOURCE, fields)?;
                summary.matched += 1;
            }
            None => {
                store.upsert(&synthetic_identifier(norad_id), SOURCE, fields)?;
                summary.created += 1;
            }
        }
        summary.imported += 1;
    }
    Ok(summary)
}

#[derive(Debug, Default)]
pub struct MergeSummary {
    pub merged: u64,
    /// Standalone catalog envelopes left in place.
    pub unmatched: u64,
}

/// Fold standalone `kaggle_1`-only envelopes into registry envelopes
/// whose `sources.unoosa.name` / `sources.celestrak.name` equals the
/// catalog name exactly (case-sensitive), then delete the orphan.
pub fn merge_by_name(store: &EnvelopeStore) -> Result<MergeSummary, ImportError> {
    let mut summary = MergeSummary::default();
    for envelope in store.all()? {
        if envelope.sources.len() != 1 || !envelope.sources.contains_key(SOURCE) {
            continue;
        }
        let record = &envelope.sources[SOURCE];
        let Some(name) = record.field("name").and_then(scalar_text) else {
            summary.unmatched += 1;
            continue;
        };

        let mut target = None;
        for source in MATCH_SOURCES {
            if let Some(found) = store.find_by_source_name(source, &name)? {
                if found.identifier != envelope.identifier {
                    target = Some(found.identifier);
                    break;
                }
            }
        }
        match target {
            Some(identifier) => {
                store.upsert(&identifier, SOURCE, record.fields.clone())?;
                store.delete(&envelope.identifier)?;
                summary.merged += 1;
            }
            None => summary.unmatched += 1,
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const CATALOG_CSV: &str = "\
norad_id,name,object_type,country,orbital_band,congestion_risk,altitude_km,inclination,launch_year_estimate
25544,ISS (ZARYA),PAYLOAD,US,LEO,high,420.5,51.64,1998
900,CALSPHERE 1,PAYLOAD,US,LEO,low,1075.0,90.2,1964
,NO NORAD,DEBRIS,US,LEO,low,,,
";

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn rows_match_by_source_norad_or_create() {
        let store = EnvelopeStore::open_in_memory().unwrap();
        store
            .upsert(
                "1998-067A",
                "unoosa",
                fields(&[
                    ("international_designator", json!("1998-067A")),
                    ("norad_id", json!("25544")),
                ]),
            )
            .unwrap();

        let catalog = write_temp(CATALOG_CSV);
        let summary = import(&store, catalog.path()).unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);

        let iss = store.get("1998-067A").unwrap().unwrap();
        assert!(iss.sources.contains_key(SOURCE));
        // Numeric columns are typed, not strings.
        assert_eq!(iss.sources[SOURCE].fields["altitude_km"], json!(420.5));
        assert_eq!(iss.sources[SOURCE].fields["launch_year_estimate"], json!(1998));

        let standalone = store.get("norad-900").unwrap().unwrap();
        assert_eq!(standalone.canonical.orbital_band, Some(json!("LEO")));
        assert_eq!(standalone.canonical.congestion_risk, Some(json!("low")));
    }

    #[test]
    fn merge_by_name_folds_orphans() {
        let store = EnvelopeStore::open_in_memory().unwrap();
        store
            .upsert(
                "1964-063C",
                "unoosa",
                fields(&[
                    ("international_designator", json!("1964-063C")),
                    ("name", json!("CALSPHERE 1")),
                    ("status", json!("Operational")),
                ]),
            )
            .unwrap();
        store
            .upsert(
                "norad-900",
                SOURCE,
                fields(&[
                    ("norad_id", json!("900")),
                    ("name", json!("CALSPHERE 1")),
                    ("orbital_band", json!("LEO")),
                ]),
            )
            .unwrap();
        store
            .upsert(
                "norad-901",
                SOURCE,
                fields(&[("norad_id", json!("901")), ("name", json!("NO SUCH SAT"))]),
            )
            .unwrap();

        let summary = merge_by_name(&store).unwrap();
        assert_eq!(summary.merged, 1);
        assert_eq!(summary.unmatched, 1);

        // Orphan gone, record folded into the registry envelope.
        assert!(store.get("norad-900").unwrap().is_none());
        let merged = store.get("1964-063C").unwrap().unwrap();
        assert_eq!(merged.metadata.sources_available, vec!["kaggle_1", "unoosa"]);
        assert_eq!(merged.canonical.orbital_band, Some(json!("LEO")));
        assert_eq!(merged.canonical.status, Some(json!("Operational")));

        // The unmatched standalone stays.
        assert!(store.get("norad-901").unwrap().is_some());
    }

    #[test]
    fn merge_is_case_sensitive() {
        let store = EnvelopeStore::open_in_memory().unwrap();
        store
            .upsert("1964-063C", "unoosa", fields(&[("name", json!("CALSPHERE 1"))]))
            .unwrap();
        store
            .upsert(
                "norad-900",
                SOURCE,
                fields(&[("name", json!("Calsphere 1"))]),
            )
            .unwrap();
        let summary = merge_by_name(&store).unwrap();
        assert_eq!(summary.merged, 0);
        assert_eq!(summary.unmatched, 1);
        assert!(store.get("norad-900").unwrap().is_some());
    }
}
