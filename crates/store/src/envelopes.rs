//! SQLite-backed envelope store.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use kessler_registry::canonical::update_canonical;
use kessler_registry::document::Envelope;
use kessler_registry::value::scalar_text;

use crate::error::StoreError;

/// Page size when no explicit limit is given, matching the original API
/// default.
pub const DEFAULT_SEARCH_LIMIT: u32 = 100;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS envelopes (
    identifier TEXT PRIMARY KEY,
    doc TEXT NOT NULL,
    name TEXT,
    object_name TEXT,
    international_designator TEXT,
    registration_number TEXT,
    norad_cat_id TEXT,
    country_of_origin TEXT,
    status TEXT,
    orbital_band TEXT,
    congestion_risk TEXT
);

CREATE INDEX IF NOT EXISTS idx_envelopes_designator
    ON envelopes(international_designator);
CREATE INDEX IF NOT EXISTS idx_envelopes_registration
    ON envelopes(registration_number);

CREATE TABLE IF NOT EXISTS source_keys (
    identifier TEXT NOT NULL,
    source TEXT NOT NULL,
    norad_id TEXT,
    name TEXT,
    PRIMARY KEY (identifier, source)
);

CREATE INDEX IF NOT EXISTS idx_source_keys_norad
    ON source_keys(source, norad_id);
CREATE INDEX IF NOT EXISTS idx_source_keys_name
    ON source_keys(source, name);
"#;

/// Fields exposed for facet listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Country,
    Status,
    OrbitalBand,
    CongestionRisk,
}

impl Facet {
    fn column(self) -> &'static str {
        match self {
            Facet::Country => "country_of_origin",
            Facet::Status => "status",
            Facet::OrbitalBand => "orbital_band",
            Facet::CongestionRisk => "congestion_risk",
        }
    }
}

impl std::str::FromStr for Facet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "country" => Ok(Facet::Country),
            "status" => Ok(Facet::Status),
            "orbital_band" => Ok(Facet::OrbitalBand),
            "congestion_risk" => Ok(Facet::CongestionRisk),
            other => Err(format!(
                "unknown facet '{other}' (expected country, status, orbital_band, congestion_risk)"
            )),
        }
    }
}

/// Search parameters. Text query matches name / object name / designator /
/// registration number; the remaining filters match their own canonical
/// field. All matching is case-insensitive substring.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub country: Option<String>,
    pub status: Option<String>,
    pub orbital_band: Option<String>,
    pub congestion_risk: Option<String>,
    pub limit: u32,
    pub skip: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        SearchQuery {
            text: None,
            country: None,
            status: None,
            orbital_band: None,
            congestion_risk: None,
            limit: DEFAULT_SEARCH_LIMIT,
            skip: 0,
        }
    }
}

impl SearchQuery {
    /// WHERE clause + parameters. Used verbatim by both `search` and
    /// `count` so the page and the total can never disagree.
    fn predicate(&self) -> (String, Vec<String>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(text) = non_blank(&self.text) {
            let pattern = like_pattern(text);
            clauses.push(
                "(LOWER(COALESCE(name,'')) LIKE ? \
                 OR LOWER(COALESCE(object_name,'')) LIKE ? \
                 OR LOWER(COALESCE(international_designator,'')) LIKE ? \
                 OR LOWER(COALESCE(registration_number,'')) LIKE ?)"
                    .to_string(),
            );
            for _ in 0..4 {
                params.push(pattern.clone());
            }
        }
        for (column, value) in [
            ("country_of_origin", &self.country),
            ("status", &self.status),
            ("orbital_band", &self.orbital_band),
            ("congestion_risk", &self.congestion_risk),
        ] {
            if let Some(value) = non_blank(value) {
                clauses.push(format!("LOWER(COALESCE({column},'')) LIKE ?"));
                params.push(like_pattern(value));
            }
        }

        if clauses.is_empty() {
            ("1=1".to_string(), params)
        } else {
            (clauses.join(" AND "), params)
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn like_pattern(value: &str) -> String {
    format!("%{}%", value.to_lowercase())
}

/// Persistent per-object document store. See the crate docs for the
/// concurrency contract (last-writer-wins, no locking).
pub struct EnvelopeStore {
    conn: Connection,
    source_priority: Option<Vec<String>>,
}

impl EnvelopeStore {
    /// Open (or create) the store at `path`. Failure here is the only
    /// fatal condition in the system.
    pub fn open(path: &Path) -> Result<EnvelopeStore, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Open(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<EnvelopeStore, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<EnvelopeStore, StoreError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Open(e.to_string()))?;
        Ok(EnvelopeStore {
            conn,
            source_priority: None,
        })
    }

    /// Override the preference order applied to envelopes written through
    /// this handle. Defaults to the built-in order when unset.
    pub fn set_source_priority(&mut self, priority: Vec<String>) {
        self.source_priority = Some(priority);
    }

    /// Replace `sources[source]` wholesale on the existing envelope (or
    /// create a new one), recompute the canonical view, persist. Returns
    /// the stored envelope.
    pub fn upsert(
        &self,
        identifier: &str,
        source: &str,
        fields: Map<String, Value>,
    ) -> Result<Envelope, StoreError> {
        let mut envelope = match self.get(identifier)? {
            Some(mut existing) => {
                existing.insert_source(source, fields);
                existing
            }
            None => Envelope::new(identifier, source, fields),
        };
        if let Some(priority) = &self.source_priority {
            envelope.metadata.source_priority = priority.clone();
        }
        update_canonical(&mut envelope);
        self.replace(&envelope)?;
        Ok(envelope)
    }

    /// Write the envelope as-is (no canonicalization) and refresh the
    /// extracted columns. Used by upsert and by the promoter, which
    /// bypasses the canonicalizer on purpose.
    pub fn replace(&self, envelope: &Envelope) -> Result<(), StoreError> {
        let doc = serde_json::to_string(envelope)?;
        let c = &envelope.canonical;
        let text = |v: &Option<Value>| v.as_ref().and_then(scalar_text);

        self.conn.execute("BEGIN TRANSACTION", [])?;
        let result = (|| -> Result<(), StoreError> {
            self.conn.execute(
                "INSERT OR REPLACE INTO envelopes (identifier, doc, name, object_name, \
                 international_designator, registration_number, norad_cat_id, \
                 country_of_origin, status, orbital_band, congestion_risk) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    envelope.identifier,
                    doc,
                    text(&c.name),
                    text(&c.object_name),
                    text(&c.international_designator),
                    text(&c.registration_number),
                    text(&c.norad_cat_id),
                    text(&c.country_of_origin),
                    text(&c.status),
                    text(&c.orbital_band),
                    text(&c.congestion_risk),
                ],
            )?;
            self.conn.execute(
                "DELETE FROM source_keys WHERE identifier = ?1",
                params![envelope.identifier],
            )?;
            let mut stmt = self.conn.prepare(
                "INSERT INTO source_keys (identifier, source, norad_id, name) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (source, record) in &envelope.sources {
                let norad = record
                    .field("norad_id")
                    .or_else(|| record.field("norad_cat_id"))
                    .and_then(scalar_text);
                let name = record.field("name").and_then(scalar_text);
                stmt.execute(params![envelope.identifier, source, norad, name])?;
            }
            Ok(())
        })();
        match result {
            Ok(()) => {
                self.conn.execute("COMMIT", [])?;
                Ok(())
            }
            Err(err) => {
                let _ = self.conn.execute("ROLLBACK", []);
                Err(err)
            }
        }
    }

    pub fn get(&self, identifier: &str) -> Result<Option<Envelope>, StoreError> {
        let doc: Option<String> = self
            .conn
            .query_row(
                "SELECT doc FROM envelopes WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?;
        doc.map(|d| serde_json::from_str(&d).map_err(StoreError::from))
            .transpose()
    }

    /// Remove an envelope. Only administrative merge/dedup paths call
    /// this; normal ingestion never deletes.
    pub fn delete(&self, identifier: &str) -> Result<bool, StoreError> {
        self.conn.execute(
            "DELETE FROM source_keys WHERE identifier = ?1",
            params![identifier],
        )?;
        let removed = self.conn.execute(
            "DELETE FROM envelopes WHERE identifier = ?1",
            params![identifier],
        )?;
        Ok(removed > 0)
    }

    pub fn find_by_designator(&self, designator: &str) -> Result<Option<Envelope>, StoreError> {
        self.first_doc(
            "SELECT doc FROM envelopes WHERE international_designator = ?1 LIMIT 1",
            params![designator],
        )
    }

    pub fn find_by_registration(&self, registration: &str) -> Result<Option<Envelope>, StoreError> {
        self.first_doc(
            "SELECT doc FROM envelopes WHERE registration_number = ?1 LIMIT 1",
            params![registration],
        )
    }

    /// Case-insensitive substring match on the canonical name.
    pub fn find_by_name(&self, name: &str) -> Result<Option<Envelope>, StoreError> {
        self.first_doc(
            "SELECT doc FROM envelopes WHERE LOWER(COALESCE(name,'')) LIKE ?1 LIMIT 1",
            params![like_pattern(name)],
        )
    }

    /// Envelope holding `norad` under `sources.<source>`.
    pub fn find_by_source_norad(
        &self,
        source: &str,
        norad: &str,
    ) -> Result<Option<Envelope>, StoreError> {
        let identifier: Option<String> = self
            .conn
            .query_row(
                "SELECT identifier FROM source_keys WHERE source = ?1 AND norad_id = ?2 LIMIT 1",
                params![source, norad],
                |row| row.get(0),
            )
            .optional()?;
        match identifier {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// Exact, case-sensitive name equality under `sources.<source>` —
    /// reserved for the administrative merge-by-name pass.
    pub fn find_by_source_name(
        &self,
        source: &str,
        name: &str,
    ) -> Result<Option<Envelope>, StoreError> {
        let identifier: Option<String> = self
            .conn
            .query_row(
                "SELECT identifier FROM source_keys WHERE source = ?1 AND name = ?2 LIMIT 1",
                params![source, name],
                |row| row.get(0),
            )
            .optional()?;
        match identifier {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// One page of results.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<Envelope>, StoreError> {
        let (predicate, params) = query.predicate();
        let sql = format!(
            "SELECT doc FROM envelopes WHERE {predicate} ORDER BY identifier LIMIT ? OFFSET ?"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = params
            .into_iter()
            .map(|p| Box::new(p) as Box<dyn rusqlite::ToSql>)
            .collect();
        bound.push(Box::new(query.limit as i64));
        bound.push(Box::new(query.skip as i64));
        let refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(refs.as_slice(), |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for doc in rows {
            out.push(serde_json::from_str(&doc?)?);
        }
        Ok(out)
    }

    /// Total matching count, computed with the exact predicate `search`
    /// uses — independent of pagination.
    pub fn count(&self, query: &SearchQuery) -> Result<u64, StoreError> {
        let (predicate, params) = query.predicate();
        let sql = format!("SELECT COUNT(*) FROM envelopes WHERE {predicate}");
        let mut stmt = self.conn.prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::ToSql> = params
            .iter()
            .map(|p| p as &dyn rusqlite::ToSql)
            .collect();
        let n: i64 = stmt.query_row(refs.as_slice(), |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Unique non-null values of a canonical facet field.
    pub fn distinct(&self, facet: Facet) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            "SELECT DISTINCT {col} FROM envelopes WHERE {col} IS NOT NULL ORDER BY {col}",
            col = facet.column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Every envelope, in identifier order. The promoter filters this set
    /// in memory so its count and its acted-on set share one predicate.
    pub fn all(&self) -> Result<Vec<Envelope>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT doc FROM envelopes ORDER BY identifier")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for doc in rows {
            out.push(serde_json::from_str(&doc?)?);
        }
        Ok(out)
    }

    pub fn len(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM envelopes", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn first_doc(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<Envelope>, StoreError> {
        let doc: Option<String> = self.conn.query_row(sql, params, |row| row.get(0)).optional()?;
        doc.map(|d| serde_json::from_str(&d).map_err(StoreError::from))
            .transpose()
    }
}
