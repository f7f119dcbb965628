//! UNOOSA registry CSV import, with optional satcat enrichment.
//!
//! Each registry row becomes an envelope keyed by its international
//! designator (or, for rows predating designator assignment, by its
//! registration number), with the row mapped onto canonical field names
//! as source `unoosa`. When a satcat CSV is supplied, rows whose `OBJECT_ID`
//! matches the designator contribute a second record as source
//! `spacetrack`: the NORAD catalog id, object type, ops status, RCS,
//! decay date, and any orbital parameters the registry row lacks (the
//! canonicalizer falls through to them per field). Empty and NaN cells
//! are dropped at this boundary and never enter a source record.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Number, Value};

use kessler_store::EnvelopeStore;

use crate::error::ImportError;

pub const SOURCE: &str = "unoosa";

/// Registry columns copied verbatim (CSV header, record key).
const TEXT_COLUMNS: [(&str, &str); 14] = [
    ("Country of Origin", "country_of_origin"),
    ("Registration Number", "registration_number"),
    ("Date of Launch", "date_of_launch"),
    ("Function", "function"),
    ("Status", "status"),
    ("Registration Document", "registration_document"),
    ("UN Registered", "un_registered"),
    ("GSO Location", "gso_location"),
    ("Date of Decay or Change", "date_of_decay_or_change"),
    ("Secretariat Remarks", "secretariat_remarks"),
    ("External Website", "external_website"),
    ("Launch Vehicle", "launch_vehicle"),
    ("Place of Launch", "place_of_launch"),
    ("Object Name", "object_name"),
];

const ORBIT_COLUMNS: [(&str, &str); 4] = [
    ("Apogee (km)", "apogee_km"),
    ("Perigee (km)", "perigee_km"),
    ("Inclination (degrees)", "inclination_degrees"),
    ("Period (minutes)", "period_minutes"),
];

/// Satcat columns copied verbatim for the enrichment record.
const SATCAT_TEXT_COLUMNS: [(&str, &str); 9] = [
    ("OBJECT_NAME", "object_name"),
    ("OWNER", "country_of_origin"),
    ("NORAD_CAT_ID", "norad_cat_id"),
    ("OBJECT_TYPE", "object_type"),
    ("OPS_STATUS_CODE", "ops_status_code"),
    ("LAUNCH_DATE", "date_of_launch"),
    ("DECAY_DATE", "date_of_decay"),
    ("RCS", "rcs"),
    ("LAUNCH_SITE", "launch_site"),
];

const SATCAT_ORBIT_COLUMNS: [(&str, &str); 4] = [
    ("APOGEE", "apogee_km"),
    ("PERIGEE", "perigee_km"),
    ("INCLINATION", "inclination_degrees"),
    ("PERIOD", "period_minutes"),
];

#[derive(Debug, Default)]
pub struct UnoosaSummary {
    pub imported: u64,
    /// Rows that also received a satcat enrichment record.
    pub satcat_matched: u64,
    /// Rows with neither a designator nor a registration number.
    pub skipped: u64,
}

/// Import the registry CSV, enriching from the satcat CSV when given.
pub fn import(
    store: &EnvelopeStore,
    registry_csv: &Path,
    satcat_csv: Option<&Path>,
) -> Result<UnoosaSummary, ImportError> {
    let satcat = match satcat_csv {
        Some(path) => load_satcat(path)?,
        None => HashMap::new(),
    };

    let mut reader = open_csv(registry_csv)?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let designator_col = column("International Designator").ok_or_else(|| {
        ImportError::Csv(format!(
            "{}: missing 'International Designator' column",
            registry_csv.display()
        ))
    })?;

    let mut summary = UnoosaSummary::default();
    for record in reader.records() {
        let record = record?;
        let designator = record
            .get(designator_col)
            .and_then(clean)
            .map(str::to_uppercase);
        let registration = column("Registration Number")
            .and_then(|i| record.get(i))
            .and_then(clean)
            .map(str::to_string);
        // Some registry rows predate designator assignment; their
        // registration number keys the envelope instead.
        let Some(identifier) = designator.clone().or(registration) else {
            summary.skipped += 1;
            continue;
        };

        let mut fields = Map::new();
        if let Some(designator) = &designator {
            fields.insert(
                "international_designator".into(),
                Value::String(designator.clone()),
            );
        }
        for (header, key) in TEXT_COLUMNS {
            if let Some(value) = column(header).and_then(|i| record.get(i)).and_then(clean) {
                fields.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
        // The registry has no separate display-name column.
        if let Some(name) = fields.get("object_name").cloned() {
            fields.insert("name".into(), name);
        }
        for (header, key) in ORBIT_COLUMNS {
            if let Some(value) = column(header).and_then(|i| record.get(i)).and_then(number) {
                fields.insert(key.to_string(), value);
            }
        }

        store.upsert(&identifier, SOURCE, fields)?;
        summary.imported += 1;

        if let Some(designator) = &designator {
            if let Some(satcat_fields) = satcat.get(designator) {
                let mut enrichment = satcat_fields.clone();
                enrichment.insert(
                    "international_designator".into(),
                    Value::String(designator.clone()),
                );
                store.upsert(&identifier, crate::spacetrack::SOURCE, enrichment)?;
                summary.satcat_matched += 1;
            }
        }
    }
    Ok(summary)
}

/// Satcat rows keyed by `OBJECT_ID` (the designator), pre-mapped onto
/// record keys.
fn load_satcat(path: &Path) -> Result<HashMap<String, Map<String, Value>>, ImportError> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let id_col = column("OBJECT_ID").ok_or_else(|| {
        ImportError::Csv(format!("{}: missing 'OBJECT_ID' column", path.display()))
    })?;

    let mut out = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let Some(object_id) = record.get(id_col).and_then(clean) else {
            continue;
        };
        let mut fields = Map::new();
        for (header, key) in SATCAT_TEXT_COLUMNS {
            if let Some(value) = column(header).and_then(|i| record.get(i)).and_then(clean) {
                fields.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
        if let Some(name) = fields.get("object_name").cloned() {
            fields.insert("name".into(), name);
        }
        for (header, key) in SATCAT_ORBIT_COLUMNS {
            if let Some(value) = column(header).and_then(|i| record.get(i)).and_then(number) {
                fields.insert(key.to_string(), value);
            }
        }
        out.insert(object_id.to_uppercase(), fields);
    }
    Ok(out)
}

fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>, ImportError> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| ImportError::Io(format!("cannot read {}: {e}", path.display())))
}

/// Trimmed cell content, with empty and NaN markers dropped.
fn clean(cell: &str) -> Option<&str> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(cell)
    }
}

fn number(cell: &str) -> Option<Value> {
    let parsed: f64 = clean(cell)?.parse().ok()?;
    Number::from_f64(parsed).map(Value::Number)
}
