//! Raw visit rows and the browsing-history sources that produce them.
//!
//! [`SqliteHistorySource`] reads a Chromium-family `History` database. The
//! live file is locked by a running browser, so it is copied into a scratch
//! directory and the copy is opened read-only; the original is never written.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use timeline_core::error::{Result, TimelineError};
use tracing::{debug, info};

// ── RawVisitRow ───────────────────────────────────────────────────────────────

/// Table a raw column was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginTable {
    Urls,
    Visits,
}

impl OriginTable {
    /// Prefix used to namespace this table's columns in extra metadata.
    pub fn prefix(self) -> &'static str {
        match self {
            OriginTable::Urls => "url",
            OriginTable::Visits => "visit",
        }
    }

    /// Namespaced metadata key for `column`.
    pub fn key(self, column: &str) -> String {
        format!("{}_{}", self.prefix(), column)
    }
}

/// A source column without a dedicated field.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraColumn {
    pub table: OriginTable,
    pub name: String,
    pub value: Value,
}

/// One joined visit row as delivered by the upstream source.
///
/// Every field is optional; absent values become defaults during
/// normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawVisitRow {
    pub url: Option<String>,
    pub title: Option<String>,
    pub visit_time: Option<i64>,
    pub last_visit_time: Option<i64>,
    pub transition: Option<i64>,
    pub visit_id: Option<i64>,
    pub url_id: Option<i64>,
    pub from_visit: Option<i64>,
    pub visit_count: Option<i64>,
    pub typed_count: Option<i64>,
    pub hidden: Option<bool>,
    pub extra: Vec<ExtraColumn>,
}

impl RawVisitRow {
    /// Route one `(table, column, value)` triple to its field, or into
    /// `extra` when the column has no dedicated field.
    pub fn set_column(&mut self, table: OriginTable, column: &str, value: Value) {
        match (table, column) {
            (OriginTable::Urls, "url") => self.url = value.as_str().map(str::to_string),
            (OriginTable::Urls, "title") => self.title = value.as_str().map(str::to_string),
            (OriginTable::Urls, "id") => self.url_id = value.as_i64(),
            (OriginTable::Urls, "visit_count") => self.visit_count = value.as_i64(),
            (OriginTable::Urls, "typed_count") => self.typed_count = value.as_i64(),
            (OriginTable::Urls, "last_visit_time") => self.last_visit_time = value.as_i64(),
            (OriginTable::Urls, "hidden") => self.hidden = json_bool(&value),
            (OriginTable::Visits, "id") => self.visit_id = value.as_i64(),
            (OriginTable::Visits, "visit_time") => self.visit_time = value.as_i64(),
            (OriginTable::Visits, "transition") => self.transition = value.as_i64(),
            (OriginTable::Visits, "from_visit") => self.from_visit = value.as_i64(),
            _ => self.extra.push(ExtraColumn {
                table,
                name: column.to_string(),
                value,
            }),
        }
    }
}

fn json_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

// ── VisitSource ───────────────────────────────────────────────────────────────

/// Upstream supplier of raw visit rows.
///
/// Implementations must return every row whose visit time is at least
/// `since_raw`, ordered ascending by visit time.
pub trait VisitSource {
    fn fetch_visits(&self, since_raw: i64) -> Result<Vec<RawVisitRow>>;
}

/// In-memory source, already ordered.
impl VisitSource for Vec<RawVisitRow> {
    fn fetch_visits(&self, since_raw: i64) -> Result<Vec<RawVisitRow>> {
        Ok(self
            .iter()
            .filter(|r| r.visit_time.unwrap_or(0) >= since_raw)
            .cloned()
            .collect())
    }
}

// ── SqliteHistorySource ───────────────────────────────────────────────────────

/// Reads visits from a Chromium-family `History` SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteHistorySource {
    db_path: PathBuf,
    scratch_dir: Option<PathBuf>,
}

impl SqliteHistorySource {
    /// `scratch_dir` receives the temporary copy; the system temp dir is used
    /// when it is `None`.
    pub fn new(db_path: impl Into<PathBuf>, scratch_dir: Option<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            scratch_dir,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> TimelineError {
        TimelineError::SourceUnavailable {
            path: self.db_path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl VisitSource for SqliteHistorySource {
    fn fetch_visits(&self, since_raw: i64) -> Result<Vec<RawVisitRow>> {
        if !self.db_path.is_file() {
            return Err(self.unavailable("file does not exist"));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("visit-timeline-");
        let scratch = match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|source| TimelineError::FileWrite {
            path: self
                .scratch_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            source,
        })?;

        let copy = scratch.path().join("History");
        info!("Copying database to {}...", copy.display());
        std::fs::copy(&self.db_path, &copy).map_err(|source| TimelineError::FileRead {
            path: self.db_path.clone(),
            source,
        })?;

        let sqlite_err = |source: rusqlite::Error| TimelineError::HistoryDatabase {
            path: copy.clone(),
            source,
        };
        let conn = Connection::open_with_flags(
            &copy,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(sqlite_err)?;

        let schema = HistorySchema::discover(&conn).map_err(sqlite_err)?;
        if schema.url_cols.is_empty() || schema.visit_cols.is_empty() {
            return Err(self.unavailable("database has no urls/visits tables"));
        }
        debug!(
            url_columns = schema.url_cols.len(),
            visit_columns = schema.visit_cols.len(),
            "discovered history schema"
        );

        let rows = schema.query(&conn, since_raw).map_err(sqlite_err)?;
        info!("Fetched {} visit rows.", rows.len());
        Ok(rows)
    }
}

/// Column names of `table`, in declaration order. Empty when the table does
/// not exist.
fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Columns present in the `urls` and `visits` tables.
struct HistorySchema {
    url_cols: Vec<String>,
    visit_cols: Vec<String>,
}

impl HistorySchema {
    fn discover(conn: &Connection) -> rusqlite::Result<Self> {
        Ok(Self {
            url_cols: table_columns(conn, "urls")?,
            visit_cols: table_columns(conn, "visits")?,
        })
    }

    /// Select every column of `urls` and `visits` for visits at or after
    /// `since_raw`, ascending by visit time.
    fn query(&self, conn: &Connection, since_raw: i64) -> rusqlite::Result<Vec<RawVisitRow>> {
        let select: Vec<String> = self
            .url_cols
            .iter()
            .map(|c| format!("u.{}", quote_ident(c)))
            .chain(self.visit_cols.iter().map(|c| format!("v.{}", quote_ident(c))))
            .collect();
        let sql = format!(
            "SELECT {} FROM urls u JOIN visits v ON v.url = u.id \
             WHERE v.visit_time >= ?1 ORDER BY v.visit_time ASC, v.id ASC",
            select.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([since_raw], |row| {
                let mut raw = RawVisitRow::default();
                for (idx, name) in self.url_cols.iter().enumerate() {
                    raw.set_column(OriginTable::Urls, name, sql_to_json(row.get_ref(idx)?));
                }
                let offset = self.url_cols.len();
                for (idx, name) in self.visit_cols.iter().enumerate() {
                    raw.set_column(
                        OriginTable::Visits,
                        name,
                        sql_to_json(row.get_ref(offset + idx)?),
                    );
                }
                Ok(raw)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Convert an SQLite cell into JSON. Blobs become lowercase hex strings.
fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(bytes.iter().map(|b| format!("{b:02x}")).collect()),
    }
}
