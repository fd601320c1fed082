// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod bridge;
mod export;

pub use bridge::{PersistenceBridge, SyncOutcome};
pub use export::{export_records_json, write_export};

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const APP_NAME: &str = "roster";

const ENTRIES_TABLE: &str = "entries";
const ENTRY_COLUMNS: [&str; 3] = ["key", "value", "updated_at"];

/// Durable string key/value storage. Payloads are opaque to the store; the
/// bridge owns their format.
pub trait StoragePort {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        validate_db_path(&path.to_string_lossy())?;
        let conn = Connection::open(path)
            .with_context(|| format!("open roster database {}", path.display()))?;
        Self::tuned(conn)
    }

    pub fn open_memory() -> Result<Self> {
        Self::tuned(Connection::open_in_memory().context("open in-memory roster database")?)
    }

    fn tuned(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .context("enable write-ahead logging")?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("set sqlite busy timeout")?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the entries table in an empty database, or checks that an
    /// existing database already has it in a usable shape.
    pub fn bootstrap(&self) -> Result<()> {
        let existing = self.user_table_names()?;
        if existing.is_empty() {
            return self
                .conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create entries table");
        }
        if !existing.iter().any(|name| name == ENTRIES_TABLE) {
            bail!(
                "database is missing required table `{ENTRIES_TABLE}` (found: {}); \
                 point ROSTER_DB_PATH at a roster database",
                existing.join(", ")
            );
        }

        let present = self.entry_columns()?;
        let missing: Vec<&str> = ENTRY_COLUMNS
            .into_iter()
            .filter(|column| !present.iter().any(|name| name == column))
            .collect();
        if !missing.is_empty() {
            bail!(
                "table `{ENTRIES_TABLE}` is missing required columns: {}; \
                 move the file aside and relaunch to start fresh",
                missing.join(", ")
            );
        }
        Ok(())
    }

    fn user_table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .context("prepare table listing")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("list tables")?;
        names
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("read table names")
    }

    fn entry_columns(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")
            .context("prepare column listing")?;
        let names = stmt
            .query_map(params![ENTRIES_TABLE], |row| row.get::<_, String>(0))
            .context("list entry columns")?;
        names
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("read entry column names")
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM entries ORDER BY key ASC")
            .context("prepare key listing")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("list storage keys")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect storage keys")
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read entry {key}"))
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("format entry timestamp")?;
        self.conn
            .execute(
                "
                INSERT INTO entries (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert entry {key}"))?;
        Ok(())
    }
}

impl StoragePort for Store {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.get(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key, value)
    }
}

/// Process-local storage for tests and demo sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of writes performed since construction.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl StoragePort for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.writes += 1;
        Ok(())
    }
}

/// Resolves `ROSTER_DB_PATH`, falling back to `<data dir>/roster/roster.db`.
/// The data directory is created on demand.
pub fn default_db_path() -> Result<PathBuf> {
    if let Some(explicit) = env::var_os("ROSTER_DB_PATH") {
        return Ok(PathBuf::from(explicit));
    }

    let Some(data_dir) = dirs::data_local_dir() else {
        bail!("no local data directory on this platform; set ROSTER_DB_PATH and retry");
    };
    let roster_dir = data_dir.join(APP_NAME);
    fs::create_dir_all(&roster_dir)
        .with_context(|| format!("create {}", roster_dir.display()))?;
    Ok(roster_dir.join("roster.db"))
}

/// Accepts plain filesystem paths and `:memory:`. URI forms are refused
/// because sqlite would otherwise interpret them.
pub fn validate_db_path(path: &str) -> Result<()> {
    match path {
        "" => bail!("database path is empty; set [storage].db_path or ROSTER_DB_PATH"),
        ":memory:" => return Ok(()),
        _ => {}
    }

    let uri_scheme = path
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic()));
    if let Some(scheme) = uri_scheme {
        bail!("database path {path:?} looks like a URI ({scheme}://); use a filesystem path");
    }
    if path.starts_with("file:") || path.contains('?') {
        bail!("database path {path:?} looks like a URI; drop the file: prefix or ?query and retry");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{MemoryStorage, StoragePort};
    use anyhow::Result;

    #[test]
    fn memory_storage_counts_writes() -> Result<()> {
        let mut storage = MemoryStorage::new().with_entry("a", "1");
        assert_eq!(storage.read("a")?.as_deref(), Some("1"));
        assert_eq!(storage.writes(), 0);

        storage.write("a", "2")?;
        storage.write("b", "3")?;
        assert_eq!(storage.get("a"), Some("2"));
        assert_eq!(storage.writes(), 2);
        Ok(())
    }
}
