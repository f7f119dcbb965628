//! Tokenized dot-notation paths over envelope documents.
//!
//! The promoter addresses documents by paths like
//! `sources.kaggle_1.orbital_band`. Lookups are total (absent, never an
//! error); sets create missing intermediate maps but refuse to tunnel
//! through an existing scalar.

use serde_json::Value;

use crate::error::RegistryError;

/// Source names whose bare prefix gets qualified with `sources.` during
/// path normalization.
const SOURCE_PREFIXES: [&str; 4] = ["unoosa", "celestrak", "spacetrack", "kaggle"];

/// A validated, tokenized field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse and validate. Rejects empty paths, empty segments
    /// (leading/trailing/consecutive dots), whitespace, control
    /// characters, and `$` (reserved by the store's query language).
    pub fn parse(raw: &str) -> Result<FieldPath, RegistryError> {
        if raw.is_empty() {
            return Err(RegistryError::EmptyPath);
        }
        for ch in raw.chars() {
            if ch.is_whitespace() || ch.is_control() || ch == '$' {
                return Err(RegistryError::IllegalCharacter {
                    path: raw.to_string(),
                    ch,
                });
            }
        }
        let segments: Vec<String> = raw.split('.').map(|s| s.to_string()).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(RegistryError::EmptySegment(raw.to_string()));
        }
        Ok(FieldPath {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Qualify bare source prefixes: `kaggle.orbital_band` →
/// `sources.kaggle.orbital_band`. Already-qualified `sources.` /
/// `canonical.` paths pass through; anything else is left as-is and
/// resolves against the document root. `kaggle_1`-style suffixed source
/// names count as source prefixes too, since that is what the sources
/// map actually contains.
pub fn normalize(path: &str) -> String {
    if path.starts_with("sources.") || path.starts_with("canonical.") {
        return path.to_string();
    }
    if let Some((head, _)) = path.split_once('.') {
        let is_source = SOURCE_PREFIXES.contains(&head)
            || head
                .strip_prefix("kaggle_")
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        if is_source {
            return format!("sources.{path}");
        }
    }
    path.to_string()
}

/// Walk the path through nested maps. Absent on any missing segment or
/// non-map intermediate — never an error. Zero/false/empty-string values
/// are present, and distinguishable from absence.
pub fn get_path<'a>(doc: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Set the value at the path, creating missing intermediate maps. Fails
/// without mutating anything when an intermediate segment already holds a
/// non-map value — a set never silently overwrites a scalar with a nested
/// structure.
pub fn set_path(doc: &mut Value, path: &FieldPath, value: Value) -> Result<(), RegistryError> {
    let segments = path.segments();
    let scalar = |segment: &String| RegistryError::ScalarIntermediate {
        path: path.as_str().to_string(),
        segment: segment.clone(),
    };

    // A scalar can only be hit while still walking pre-existing
    // structure: once a missing segment gets a fresh map, everything
    // beneath it is fresh too. A failure therefore leaves the document
    // untouched.
    let mut current = doc;
    for segment in &segments[..segments.len() - 1] {
        let map = match current {
            Value::Object(map) => map,
            _ => return Err(scalar(segment)),
        };
        let next = map
            .entry(segment.as_str())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if !next.is_object() {
            return Err(scalar(segment));
        }
        current = next;
    }
    match current {
        Value::Object(map) => {
            map.insert(segments[segments.len() - 1].clone(), value);
            Ok(())
        }
        _ => Err(scalar(&segments[segments.len() - 1])),
    }
}
