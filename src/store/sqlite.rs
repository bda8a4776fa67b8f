//! SQLite-backed content store.
//!
//! Substring search uses `instr(body, ?) > 0`, which is case-sensitive
//! (unlike `LIKE`, which folds ASCII case in SQLite).

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::{notify, ContentStore, DeleteObserver, DeleteOptions, StoreError};
use crate::domain::{
    LibraryItem, Record, RecordId, RecordStatus, RecordSummary, SiteLinks, LIBRARY_RECORD_TYPE,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    id          INTEGER PRIMARY KEY,
    title       TEXT NOT NULL,
    record_type TEXT NOT NULL,
    status      TEXT NOT NULL,
    body        TEXT NOT NULL DEFAULT '',
    modified_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_type_status ON records(record_type, status);
CREATE TABLE IF NOT EXISTS record_terms (
    record_id INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    taxonomy  TEXT NOT NULL,
    slug      TEXT NOT NULL,
    position  INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS record_meta (
    record_id INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    key       TEXT NOT NULL,
    value     TEXT NOT NULL,
    PRIMARY KEY (record_id, key)
);
";

/// Database key for a record id; SQLite integers are signed 64-bit
fn sql_id(id: RecordId) -> Result<i64, StoreError> {
    i64::try_from(id.get()).map_err(|_| StoreError::IdOutOfRange(id))
}

/// Raw `records` row, before terms and metadata are attached
struct RecordRow {
    id: i64,
    title: String,
    record_type: String,
    status: String,
    body: String,
    modified_at: String,
}

impl RecordRow {
    const COLUMNS: &'static str = "id, title, record_type, status, body, modified_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            record_type: row.get(2)?,
            status: row.get(3)?,
            body: row.get(4)?,
            modified_at: row.get(5)?,
        })
    }

    fn corrupt(&self, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            id: self.id,
            reason: reason.into(),
        }
    }

    fn record_id(&self) -> Result<RecordId, StoreError> {
        u64::try_from(self.id)
            .ok()
            .and_then(RecordId::new)
            .ok_or_else(|| self.corrupt("non-positive id"))
    }

    fn status(&self) -> Result<RecordStatus, StoreError> {
        self.status
            .parse()
            .map_err(|e: anyhow::Error| self.corrupt(e.to_string()))
    }

    fn into_record(self) -> Result<Record, StoreError> {
        let id = self.record_id()?;
        let status = self.status()?;
        let modified_at = DateTime::parse_from_rfc3339(&self.modified_at)
            .map_err(|e| self.corrupt(format!("bad modified_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(Record {
            id,
            title: self.title,
            record_type: self.record_type,
            status,
            body: self.body,
            modified_at,
            terms: BTreeMap::new(),
            meta: BTreeMap::new(),
        })
    }
}

/// Content store over a SQLite database
pub struct SqliteStore {
    conn: Connection,
    links: SiteLinks,
    observers: Vec<Box<dyn DeleteObserver>>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened content database");
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn,
            links: SiteLinks::default(),
            observers: Vec::new(),
        })
    }

    /// Use a different site URL for edit/view links
    pub fn with_links(mut self, links: SiteLinks) -> Self {
        self.links = links;
        self
    }

    /// Register a delete observer
    pub fn with_observer(mut self, observer: Box<dyn DeleteObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Insert or replace a record with its terms and metadata
    pub fn upsert(&mut self, record: &Record) -> Result<(), StoreError> {
        let id = sql_id(record.id)?;
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO records (id, title, record_type, status, body, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                record_type = excluded.record_type,
                status = excluded.status,
                body = excluded.body,
                modified_at = excluded.modified_at",
            params![
                id,
                record.title,
                record.record_type,
                record.status.as_str(),
                record.body,
                record.modified_at.to_rfc3339(),
            ],
        )?;

        tx.execute("DELETE FROM record_terms WHERE record_id = ?1", params![id])?;
        tx.execute("DELETE FROM record_meta WHERE record_id = ?1", params![id])?;

        for (taxonomy, slugs) in &record.terms {
            for (position, slug) in slugs.iter().enumerate() {
                tx.execute(
                    "INSERT INTO record_terms (record_id, taxonomy, slug, position)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id, taxonomy, slug, position as i64],
                )?;
            }
        }

        for (key, value) in &record.meta {
            tx.execute(
                "INSERT INTO record_meta (record_id, key, value) VALUES (?1, ?2, ?3)",
                params![id, key, value],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Insert many records, returning how many were written
    pub fn import(&mut self, records: &[Record]) -> Result<usize, StoreError> {
        for record in records {
            self.upsert(record)?;
        }
        info!(count = records.len(), "Imported records");
        Ok(records.len())
    }

    /// Total number of records
    pub fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn attach_terms_and_meta(&self, record: &mut Record) -> Result<(), StoreError> {
        let id = sql_id(record.id)?;

        let mut stmt = self.conn.prepare_cached(
            "SELECT taxonomy, slug FROM record_terms WHERE record_id = ?1 ORDER BY taxonomy, position",
        )?;
        let terms = stmt.query_map(params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for term in terms {
            let (taxonomy, slug) = term?;
            record.terms.entry(taxonomy).or_default().push(slug);
        }

        let mut stmt = self
            .conn
            .prepare_cached("SELECT key, value FROM record_meta WHERE record_id = ?1")?;
        let meta = stmt.query_map(params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for entry in meta {
            let (key, value) = entry?;
            record.meta.insert(key, value);
        }

        Ok(())
    }
}

impl ContentStore for SqliteStore {
    fn list_library_items(&self) -> Result<Vec<LibraryItem>, StoreError> {
        let sql = format!(
            "SELECT {} FROM records WHERE record_type = ?1 AND status = ?2 ORDER BY title, id",
            RecordRow::COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![LIBRARY_RECORD_TYPE, RecordStatus::Publish.as_str()],
                RecordRow::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = row.into_record()?;
            self.attach_terms_and_meta(&mut record)?;
            items.push(LibraryItem::from_record(&record));
        }

        Ok(items)
    }

    fn get_record(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        let Ok(key) = sql_id(id) else {
            return Ok(None);
        };

        let sql = format!("SELECT {} FROM records WHERE id = ?1", RecordRow::COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![key], RecordRow::from_row)
            .optional()?;

        match row {
            Some(row) => {
                let mut record = row.into_record()?;
                self.attach_terms_and_meta(&mut record)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn search(
        &self,
        record_type: &str,
        needle: &str,
        statuses: &[RecordStatus],
    ) -> Result<Vec<RecordSummary>, StoreError> {
        let sql = format!(
            "SELECT {} FROM records WHERE record_type = ?1 AND instr(body, ?2) > 0 ORDER BY id",
            RecordRow::COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params![record_type, needle], RecordRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut hits = Vec::new();
        for row in rows {
            let record = row.into_record()?;
            if statuses.contains(&record.status) {
                hits.push(self.links.summarize(&record));
            }
        }

        Ok(hits)
    }

    fn delete_record(&self, id: RecordId, options: DeleteOptions) -> Result<(), StoreError> {
        let record = self.get_record(id)?.ok_or(StoreError::NotFound(id))?;
        let key = sql_id(id)?;

        notify(&self.observers, &record, options);

        let changed = if options.permanent {
            self.conn
                .execute("DELETE FROM records WHERE id = ?1", params![key])?
        } else {
            self.conn.execute(
                "UPDATE records SET status = ?2 WHERE id = ?1",
                params![key, RecordStatus::Trash.as_str()],
            )?
        };

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }
}
