//! Envelope resolution for incoming source records.
//!
//! Match order: normalized international designator, the alternate
//! designator encoding (with the piece-letter heuristic), NORAD id under
//! a previously-seen source, and — for the administrative merge pass
//! only — exact source-name equality. Designators are assumed globally
//! unique; when one resolves to two distinct envelopes the store surfaces
//! a data-quality error instead of merging.

use kessler_registry::designator;
use kessler_registry::document::Envelope;
use kessler_registry::matcher::MatchKeys;

use crate::envelopes::EnvelopeStore;
use crate::error::StoreError;

/// Sources whose historical records carry a NORAD id worth matching on.
const NORAD_SOURCES: [&str; 3] = ["unoosa", "celestrak", "spacetrack"];

/// Sources consulted for the one-time merge-by-name pass.
const NAME_SOURCES: [&str; 2] = ["unoosa", "celestrak"];

pub struct Matcher<'a> {
    store: &'a EnvelopeStore,
}

impl<'a> Matcher<'a> {
    pub fn new(store: &'a EnvelopeStore) -> Matcher<'a> {
        Matcher { store }
    }

    /// Resolve the envelope an incoming record belongs to, or `None` when
    /// the caller should create a fresh one.
    pub fn resolve(&self, keys: &MatchKeys) -> Result<Option<Envelope>, StoreError> {
        if let Some(designator) = &keys.international_designator {
            if let Some(found) = self.resolve_designator(designator)? {
                return Ok(Some(found));
            }
        }
        if let Some(norad) = &keys.norad_id {
            for source in NORAD_SOURCES {
                if let Some(found) = self.store.find_by_source_norad(source, norad)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    /// `resolve` plus exact source-name equality. Only the administrative
    /// merge of orphaned records uses name matching; normal ingestion
    /// never does.
    pub fn resolve_for_merge(&self, keys: &MatchKeys) -> Result<Option<Envelope>, StoreError> {
        if let Some(found) = self.resolve(keys)? {
            return Ok(Some(found));
        }
        if let Some(name) = &keys.name {
            for source in NAME_SOURCES {
                if let Some(found) = self.store.find_by_source_name(source, name)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    /// Try the designator verbatim, its alternate encoding, and the
    /// piece-letter variants. All hits must point at one envelope;
    /// anything else is a collision.
    pub fn resolve_designator(&self, designator: &str) -> Result<Option<Envelope>, StoreError> {
        let mut matched: Option<Envelope> = None;
        for candidate in designator::candidates(designator) {
            if let Some(found) = self.store.find_by_designator(&candidate)? {
                match &matched {
                    None => matched = Some(found),
                    Some(prior) if prior.identifier == found.identifier => {}
                    Some(prior) => {
                        return Err(StoreError::DesignatorCollision {
                            designator: designator.to_string(),
                            first: prior.identifier.clone(),
                            second: found.identifier,
                        })
                    }
                }
            }
        }
        Ok(matched)
    }
}
