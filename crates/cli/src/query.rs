//! `kessler find`, `kessler search`, `kessler facets`.

use clap::ValueEnum;
use serde_json::json;

use kessler_registry::Envelope;
use kessler_store::{EnvelopeStore, Facet, SearchQuery};

use crate::CliError;

#[derive(Clone, Copy, ValueEnum)]
pub enum FindKey {
    Designator,
    Registration,
    Name,
}

pub fn cmd_find(store: &EnvelopeStore, term: &str, by: Option<FindKey>) -> Result<(), CliError> {
    let found = match by {
        Some(FindKey::Designator) => store.find_by_designator(term)?,
        Some(FindKey::Registration) => store.find_by_registration(term)?,
        Some(FindKey::Name) => store.find_by_name(term)?,
        None => {
            let mut found = store.find_by_designator(term)?;
            if found.is_none() {
                found = store.find_by_registration(term)?;
            }
            if found.is_none() {
                found = store.find_by_name(term)?;
            }
            found
        }
    };
    match found {
        Some(envelope) => print_json(&envelope),
        None => Err(CliError::error(format!("no envelope matches '{}'", term))
            .with_hint("keys tried: international designator, registration number, name")),
    }
}

pub fn cmd_search(store: &EnvelopeStore, query: SearchQuery) -> Result<(), CliError> {
    let total = store.count(&query)?;
    let results = store.search(&query)?;
    let body = json!({
        "total": total,
        "count": results.len(),
        "results": results,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&body).map_err(|e| CliError::error(e.to_string()))?
    );
    Ok(())
}

pub fn cmd_facets(store: &EnvelopeStore, field: &str) -> Result<(), CliError> {
    let facet: Facet = field.parse().map_err(|e: String| {
        CliError::usage(e).with_hint("one of: country, status, orbital_band, congestion_risk")
    })?;
    for value in store.distinct(facet)? {
        println!("{}", value);
    }
    Ok(())
}

fn print_json(envelope: &Envelope) -> Result<(), CliError> {
    println!(
        "{}",
        serde_json::to_string_pretty(envelope).map_err(|e| CliError::error(e.to_string()))?
    );
    Ok(())
}
