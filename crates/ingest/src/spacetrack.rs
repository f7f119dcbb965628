//! Space-Track GP query import.
//!
//! Authenticates a session per worker, fetches the current TLE for every
//! envelope that has a canonical NORAD id, and upserts the element lines
//! as source `spacetrack`. Fetches run on a bounded worker pool; store
//! writes all happen on the calling thread (the store is not shared
//! across threads).

use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Map, Value};

use kessler_registry::value::scalar_text;
use kessler_store::EnvelopeStore;

use crate::error::ImportError;

pub const SOURCE: &str = "spacetrack";

const DEFAULT_BASE_URL: &str = "https://www.space-track.org";
const TIMEOUT_SECS: u64 = 10;
const WORKERS: usize = 10;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default)]
pub struct SpaceTrackSummary {
    pub total: u64,
    pub updated: u64,
    pub failed: u64,
}

pub struct SpaceTrackImporter {
    base_url: String,
    credentials: Credentials,
}

/// One authenticated Space-Track session (cookie-based).
struct Session {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl Session {
    fn login(base_url: &str, credentials: &Credentials) -> Result<Session, ImportError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(crate::fetch::USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| ImportError::Http(format!("cannot build HTTP client: {e}")))?;
        let resp = http
            .post(format!("{base_url}/ajaxauth/login"))
            .form(&[
                ("identity", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .map_err(|e| ImportError::Auth(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ImportError::Auth(format!(
                "login rejected with HTTP {}",
                resp.status().as_u16()
            )));
        }
        Ok(Session {
            http,
            base_url: base_url.to_string(),
        })
    }

    /// Current element lines for a NORAD catalog number, or `None` when
    /// the query returns nothing usable.
    fn fetch_tle(&self, norad_id: &str) -> Option<(String, String)> {
        let url = format!(
            "{}/basicspacedata/query/class/gp/NORAD_CAT_ID/{norad_id}/orderby/TLE_LINE1%20ASC/format/tle",
            self.base_url
        );
        let body = self.http.get(&url).send().ok()?.text().ok()?;
        let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());
        let line1 = lines.next()?.to_string();
        let line2 = lines.next()?.to_string();
        if line1.starts_with("1 ") && line1.len() >= 69 {
            Some((line1, line2))
        } else {
            None
        }
    }
}

impl SpaceTrackImporter {
    pub fn new(credentials: Credentials) -> SpaceTrackImporter {
        SpaceTrackImporter {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
        }
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        credentials: Credentials,
    ) -> SpaceTrackImporter {
        SpaceTrackImporter {
            base_url: base_url.into(),
            credentials,
        }
    }

    pub fn run(&self, store: &EnvelopeStore) -> Result<SpaceTrackSummary, ImportError> {
        // Fail fast on bad credentials before spawning anything.
        Session::login(&self.base_url, &self.credentials)?;

        let targets: Vec<(String, String)> = store
            .all()?
            .into_iter()
            .filter_map(|env| {
                let norad = env.canonical.norad_cat_id.as_ref().and_then(scalar_text)?;
                Some((env.identifier, norad))
            })
            .collect();

        let mut summary = SpaceTrackSummary {
            total: targets.len() as u64,
            ..SpaceTrackSummary::default()
        };
        if targets.is_empty() {
            return Ok(summary);
        }

        let queue = Mutex::new(targets);
        let (tx, rx) = mpsc::channel::<(String, Option<(String, String)>)>();

        std::thread::scope(|scope| -> Result<(), ImportError> {
            let worker_count = WORKERS.min(queue.lock().map(|q| q.len()).unwrap_or(0));
            for _ in 0..worker_count {
                let tx = tx.clone();
                let queue = &queue;
                let base_url = &self.base_url;
                let credentials = &self.credentials;
                scope.spawn(move || {
                    // Each worker owns its session; a login failure fails
                    // only this worker's share of the queue.
                    let session = Session::login(base_url, credentials).ok();
                    loop {
                        let task = queue.lock().ok().and_then(|mut q| q.pop());
                        let Some((identifier, norad)) = task else { break };
                        let tle = session.as_ref().and_then(|s| s.fetch_tle(&norad));
                        if tx.send((identifier, tle)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            // Store writes serialized here, on the caller's thread.
            for (identifier, tle) in rx {
                match tle {
                    Some((line1, line2)) => {
                        let mut fields = Map::new();
                        fields.insert("tle_line1".into(), Value::String(line1));
                        fields.insert("tle_line2".into(), Value::String(line2));
                        store.upsert(&identifier, SOURCE, fields)?;
                        summary.updated += 1;
                    }
                    None => {
                        eprintln!("warning: no TLE for {identifier}");
                        summary.failed += 1;
                    }
                }
            }
            Ok(())
        })?;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const TLE_BODY: &str = "\
1 25544U 98067A   24079.07757601  .00029738  00000+0  52254-3 0  9991
2 25544  51.6410  80.4054 0004607 174.6627 310.5465 15.50127467444574
";

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn creds() -> Credentials {
        Credentials {
            username: "user".into(),
            password: "pass".into(),
        }
    }

    #[test]
    fn rejected_login_aborts() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ajaxauth/login");
            then.status(401);
        });
        let store = EnvelopeStore::open_in_memory().unwrap();
        let importer = SpaceTrackImporter::with_base_url(server.base_url(), creds());
        let err = importer.run(&store).unwrap_err();
        assert!(matches!(err, ImportError::Auth(_)));
    }

    #[test]
    fn fetches_tles_for_norad_envelopes() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ajaxauth/login");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path_includes("NORAD_CAT_ID/25544");
            then.status(200).body(TLE_BODY);
        });

        let store = EnvelopeStore::open_in_memory().unwrap();
        store
            .upsert(
                "1998-067A",
                "unoosa",
                fields(&[
                    ("international_designator", json!("1998-067A")),
                    ("norad_cat_id", json!("25544")),
                ]),
            )
            .unwrap();
        // No NORAD id: not a target.
        store
            .upsert("2019-029A", "unoosa", fields(&[("name", json!("STARLINK-24"))]))
            .unwrap();

        let importer = SpaceTrackImporter::with_base_url(server.base_url(), creds());
        let summary = importer.run(&store).unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 0);

        let env = store.get("1998-067A").unwrap().unwrap();
        assert!(env.sources.contains_key("spacetrack"));
        assert!(env.canonical.tle.line1.as_deref().unwrap().starts_with("1 25544U"));
    }

    #[test]
    fn empty_query_result_counts_as_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ajaxauth/login");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path_includes("NORAD_CAT_ID");
            then.status(200).body("");
        });

        let store = EnvelopeStore::open_in_memory().unwrap();
        store
            .upsert(
                "norad-48274",
                "kaggle_1",
                fields(&[("norad_cat_id", json!("48274"))]),
            )
            .unwrap();

        let importer = SpaceTrackImporter::with_base_url(server.base_url(), creds());
        let summary = importer.run(&store).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.updated, 0);
    }

    #[test]
    fn no_targets_is_a_clean_noop() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ajaxauth/login");
            then.status(200);
        });
        let store = EnvelopeStore::open_in_memory().unwrap();
        let importer = SpaceTrackImporter::with_base_url(server.base_url(), creds());
        let summary = importer.run(&store).unwrap();
        assert_eq!(summary.total, 0);
    }
}
