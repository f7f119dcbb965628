//! HTTP fetch plumbing shared by the feed importers.
//!
//! One blocking client with a short timeout and a bounded retry loop for
//! transient statuses. Caching is an explicit [`TtlCache`] the caller
//! owns and passes in: an expired entry is simply a miss and the fetch
//! happens again synchronously. Nothing refreshes in the background.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ImportError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_RETRIES: u32 = 3;

pub const USER_AGENT: &str = concat!("kessler/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP client with retry + exponential backoff for transient
/// statuses (429, 5xx). Anything else fails immediately.
pub struct FetchClient {
    http: reqwest::blocking::Client,
}

impl FetchClient {
    pub fn new() -> Result<FetchClient, ImportError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<FetchClient, ImportError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ImportError::Http(format!("cannot build HTTP client: {e}")))?;
        Ok(FetchClient { http })
    }

    /// GET a URL and return the response body as text.
    pub fn get_text(&self, url: &str) -> Result<String, ImportError> {
        let mut backoff_secs = 1u64;
        let mut last_error = String::new();

        for attempt in 0..=MAX_RETRIES {
            match self.http.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if status == 429 || (500..600).contains(&status) {
                        if attempt == MAX_RETRIES {
                            return Err(ImportError::Http(format!("{url}: HTTP {status}")));
                        }
                        let wait = if status == 429 {
                            resp.headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .unwrap_or(backoff_secs)
                        } else {
                            backoff_secs
                        };
                        eprintln!(
                            "warning: retry {}/{} in {}s (HTTP {})",
                            attempt + 1,
                            MAX_RETRIES,
                            wait,
                            status,
                        );
                        thread::sleep(Duration::from_secs(wait));
                        backoff_secs *= 2;
                        continue;
                    }
                    if !(200..300).contains(&status) {
                        return Err(ImportError::Http(format!("{url}: HTTP {status}")));
                    }
                    return resp
                        .text()
                        .map_err(|e| ImportError::Http(format!("{url}: {e}")));
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt == MAX_RETRIES {
                        break;
                    }
                    eprintln!(
                        "warning: retry {}/{} in {}s ({})",
                        attempt + 1,
                        MAX_RETRIES,
                        backoff_secs,
                        e,
                    );
                    thread::sleep(Duration::from_secs(backoff_secs));
                    backoff_secs *= 2;
                }
            }
        }
        Err(ImportError::Http(format!("{url}: {last_error}")))
    }

    /// `get_text` through a TTL cache keyed by URL.
    pub fn get_text_cached(
        &self,
        cache: &mut TtlCache,
        url: &str,
    ) -> Result<String, ImportError> {
        if let Some(hit) = cache.get(url) {
            return Ok(hit.to_string());
        }
        let body = self.get_text(url)?;
        cache.insert(url, body.clone());
        Ok(body)
    }
}

/// Wall-clock TTL cache for fetched bodies. An expired entry is a miss;
/// the caller refetches synchronously.
pub struct TtlCache {
    ttl: Duration,
    entries: HashMap<String, (Instant, String)>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> TtlCache {
        TtlCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let (stored_at, body) = self.entries.get(key)?;
        if stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(body)
    }

    pub fn insert(&mut self, key: &str, body: String) {
        self.entries.insert(key.to_string(), (Instant::now(), body));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn fetches_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/feed.txt");
            then.status(200).body("ISS (ZARYA)");
        });
        let client = FetchClient::new().unwrap();
        let body = client.get_text(&server.url("/feed.txt")).unwrap();
        assert_eq!(body, "ISS (ZARYA)");
        mock.assert();
    }

    #[test]
    fn non_transient_status_fails_without_retry() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/missing.txt");
            then.status(404);
        });
        let client = FetchClient::new().unwrap();
        let err = client.get_text(&server.url("/missing.txt")).unwrap_err();
        assert!(matches!(err, ImportError::Http(_)));
        mock.assert_calls(1);
    }

    #[test]
    fn cache_hits_within_ttl() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/feed.txt");
            then.status(200).body("body");
        });
        let client = FetchClient::new().unwrap();
        let mut cache = TtlCache::new(Duration::from_secs(60));
        let url = server.url("/feed.txt");
        assert_eq!(client.get_text_cached(&mut cache, &url).unwrap(), "body");
        assert_eq!(client.get_text_cached(&mut cache, &url).unwrap(), "body");
        mock.assert_calls(1);
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let mut cache = TtlCache::new(Duration::from_millis(0));
        cache.insert("k", "v".into());
        assert!(cache.get("k").is_none());
    }
}
