//! Candidate keys a source record may carry for envelope matching.
//!
//! Resolution against persisted envelopes lives in `kessler-store`; this
//! module owns the pure half — which keys exist, and which identifier a
//! brand-new envelope gets.

use serde_json::Map;
use serde_json::Value;

use crate::value::scalar_text;

/// Identifiers a new source record may match on, in match order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchKeys {
    pub international_designator: Option<String>,
    pub registration_number: Option<String>,
    pub norad_id: Option<String>,
    pub name: Option<String>,
}

impl MatchKeys {
    /// Pull candidate keys out of a raw source record. NORAD ids appear
    /// as `norad_id` or `norad_cat_id` depending on the feed.
    pub fn from_fields(fields: &Map<String, Value>) -> MatchKeys {
        let text = |key: &str| -> Option<String> {
            fields
                .get(key)
                .and_then(crate::value::non_empty)
                .and_then(scalar_text)
        };
        MatchKeys {
            international_designator: text("international_designator"),
            registration_number: text("registration_number"),
            norad_id: text("norad_id").or_else(|| text("norad_cat_id")),
            name: text("name"),
        }
    }

    /// Identifier for a brand-new envelope: international designator when
    /// available, else the registration number, else the synthetic
    /// `norad-<id>` token.
    pub fn derive_identifier(&self) -> Option<String> {
        if let Some(designator) = &self.international_designator {
            return Some(designator.clone());
        }
        if let Some(registration) = &self.registration_number {
            return Some(registration.clone());
        }
        self.norad_id.as_ref().map(|id| synthetic_identifier(id))
    }
}

/// Synthetic identifier for objects only known by NORAD catalog number.
pub fn synthetic_identifier(norad_id: &str) -> String {
    format!("norad-{norad_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_from_fields() {
        let mut fields = Map::new();
        fields.insert("international_designator".into(), json!("1998-067A"));
        fields.insert("norad_cat_id".into(), json!(25544));
        fields.insert("name".into(), json!("ISS (ZARYA)"));
        let keys = MatchKeys::from_fields(&fields);
        assert_eq!(keys.international_designator.as_deref(), Some("1998-067A"));
        assert_eq!(keys.norad_id.as_deref(), Some("25544"));
        assert_eq!(keys.name.as_deref(), Some("ISS (ZARYA)"));
    }

    #[test]
    fn empty_values_yield_no_keys() {
        let mut fields = Map::new();
        fields.insert("international_designator".into(), json!(""));
        fields.insert("norad_id".into(), Value::Null);
        let keys = MatchKeys::from_fields(&fields);
        assert_eq!(keys, MatchKeys::default());
        assert_eq!(keys.derive_identifier(), None);
    }

    #[test]
    fn registration_number_backs_up_the_designator() {
        let mut fields = Map::new();
        fields.insert("registration_number".into(), json!("ST/SG/SER.E/999"));
        fields.insert("norad_id".into(), json!("48274"));
        let keys = MatchKeys::from_fields(&fields);
        assert_eq!(keys.derive_identifier().as_deref(), Some("ST/SG/SER.E/999"));
    }

    #[test]
    fn synthetic_identifier_for_norad_only_records() {
        let mut fields = Map::new();
        fields.insert("norad_id".into(), json!("48274"));
        let keys = MatchKeys::from_fields(&fields);
        assert_eq!(keys.derive_identifier().as_deref(), Some("norad-48274"));
    }
}
