//! CelesTrak element-set import.
//!
//! Fetches a fixed list of category feeds, derives orbital parameters
//! from each element set, and upserts the records as source `celestrak`.
//! Matching is by international designator in either encoding. A
//! category that fails to fetch is logged and skipped for the rest of
//! the run.

use serde_json::{Map, Value};

use kessler_store::{EnvelopeStore, Matcher, StoreError};

use std::time::Duration;

use crate::error::ImportError;
use crate::fetch::{FetchClient, TtlCache};
use crate::tle;

pub const SOURCE: &str = "celestrak";

const DEFAULT_BASE_URL: &str = "https://celestrak.org/NORAD/elements";

/// Feed bodies are reused for this long across runs of the same
/// importer, matching how often CelesTrak refreshes the categories.
const FEED_TTL: Duration = Duration::from_secs(60 * 60);

/// Feed categories, in fetch order.
pub const CATEGORIES: [(&str, &str); 9] = [
    ("stations", "Space Stations"),
    ("resource", "Earth Resources"),
    ("sarsat", "Search & Rescue"),
    ("dmc", "Disaster Monitoring"),
    ("weather", "Weather"),
    ("geo", "Geostationary"),
    ("iss", "ISS & Associated"),
    ("high-earth", "High Earth Orbit"),
    ("cubesats", "CubeSats"),
];

#[derive(Debug, Default)]
pub struct CelestrakSummary {
    pub fetched: u64,
    pub matched: u64,
    pub created: u64,
    /// Categories that failed to fetch, skipped for this run.
    pub failed_categories: Vec<String>,
    /// Per-record store failures (designator collisions included).
    pub errors: Vec<String>,
}

pub struct CelestrakImporter {
    client: FetchClient,
    cache: TtlCache,
    base_url: String,
}

impl CelestrakImporter {
    pub fn new() -> Result<CelestrakImporter, ImportError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the importer at a different feed host (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<CelestrakImporter, ImportError> {
        Ok(CelestrakImporter {
            client: FetchClient::new()?,
            cache: TtlCache::new(FEED_TTL),
            base_url: base_url.into(),
        })
    }

    pub fn run(&mut self, store: &EnvelopeStore) -> Result<CelestrakSummary, ImportError> {
        let mut summary = CelestrakSummary::default();
        for (category, display_name) in CATEGORIES {
            let url = format!("{}/{category}.txt", self.base_url);
            let body = match self.client.get_text_cached(&mut self.cache, &url) {
                Ok(body) => body,
                Err(err) => {
                    eprintln!("warning: skipping {display_name} ({category}): {err}");
                    summary.failed_categories.push(category.to_string());
                    continue;
                }
            };
            let sets = tle::parse_feed(&body);
            summary.fetched += sets.len() as u64;
            for set in sets {
                match self.upsert_element_set(store, &set) {
                    Ok(true) => summary.matched += 1,
                    Ok(false) => summary.created += 1,
                    Err(err) => {
                        eprintln!("warning: {}: {err}", set.international_designator);
                        summary
                            .errors
                            .push(format!("{}: {err}", set.international_designator));
                    }
                }
            }
        }
        Ok(summary)
    }

    /// Returns whether the set landed on an existing envelope.
    fn upsert_element_set(
        &self,
        store: &EnvelopeStore,
        set: &tle::ElementSet,
    ) -> Result<bool, StoreError> {
        let mut fields = Map::new();
        fields.insert("name".into(), Value::String(set.name.clone()));
        fields.insert(
            "international_designator".into(),
            Value::String(set.international_designator.clone()),
        );
        fields.insert("tle_line1".into(), Value::String(set.line1.clone()));
        fields.insert("tle_line2".into(), Value::String(set.line2.clone()));
        if let Some(params) = tle::derive_parameters(&set.line2) {
            params.write_into(&mut fields);
        }

        let existing = Matcher::new(store).resolve_designator(&set.international_designator)?;
        match existing {
            Some(envelope) => {
                store.upsert(&envelope.identifier, SOURCE, fields)?;
                Ok(true)
            }
            None => {
                store.upsert(&set.international_designator, SOURCE, fields)?;
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const FEED: &str = "\
ISS (ZARYA)
1 25544U 98067A   24079.07757601  .00029738  00000+0  52254-3 0  9991
2 25544  51.6410  80.4054 0004607 174.6627 310.5465 15.50127467444574
";

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn matches_existing_envelope_by_alternate_designator() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/stations.txt");
            then.status(200).body(FEED);
        });

        let store = EnvelopeStore::open_in_memory().unwrap();
        // Registered under the long COSPAR form; the feed carries 98067A.
        store
            .upsert(
                "1998-067A",
                "unoosa",
                fields(&[
                    ("international_designator", json!("1998-067A")),
                    ("status", json!("Operational")),
                ]),
            )
            .unwrap();

        let mut importer = CelestrakImporter::with_base_url(server.base_url()).unwrap();
        let summary = importer.run(&store).unwrap();
        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.created, 0);
        assert_eq!(summary.failed_categories.len(), 8); // only stations mocked

        let env = store.get("1998-067A").unwrap().unwrap();
        assert_eq!(env.metadata.sources_available, vec!["celestrak", "unoosa"]);
        // UNOOSA keeps priority for shared fields; orbit comes from the feed.
        assert_eq!(env.canonical.status, Some(json!("Operational")));
        assert_eq!(env.canonical.orbit.inclination_degrees, Some(51.64));
        assert!(env.canonical.tle.line1.as_deref().unwrap().starts_with("1 25544U"));
    }

    #[test]
    fn unmatched_set_creates_envelope_under_feed_designator() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/stations.txt");
            then.status(200).body(FEED);
        });

        let store = EnvelopeStore::open_in_memory().unwrap();
        let mut importer = CelestrakImporter::with_base_url(server.base_url()).unwrap();
        let summary = importer.run(&store).unwrap();
        assert_eq!(summary.created, 1);

        let env = store.get("98067A").unwrap().unwrap();
        assert_eq!(env.canonical.name, Some(json!("ISS (ZARYA)")));
        assert!(env.canonical.orbit.apogee_km.is_some());
    }

    #[test]
    fn second_run_reuses_cached_feeds() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/stations.txt");
            then.status(200).body(FEED);
        });

        let store = EnvelopeStore::open_in_memory().unwrap();
        let mut importer = CelestrakImporter::with_base_url(server.base_url()).unwrap();
        importer.run(&store).unwrap();
        let summary = importer.run(&store).unwrap();

        mock.assert_calls(1);
        assert_eq!(summary.fetched, 1);
    }

    #[test]
    fn failed_category_skipped_not_fatal() {
        let server = MockServer::start(); // nothing mocked: every fetch 404s
        let store = EnvelopeStore::open_in_memory().unwrap();
        let mut importer = CelestrakImporter::with_base_url(server.base_url()).unwrap();
        let summary = importer.run(&store).unwrap();
        assert_eq!(summary.fetched, 0);
        assert_eq!(summary.failed_categories.len(), CATEGORIES.len());
        assert!(store.is_empty().unwrap());
    }
}
