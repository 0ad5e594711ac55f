//! Encrypted entry storage in SQLite
//!
//! `EntryStore` owns the `entries` table. Content is encrypted with
//! [`token::encrypt`] before it is written and decrypted after it is read;
//! the password is only borrowed for the duration of a call.
//!
//! Every operation opens its own connection and drops it before returning,
//! so no handle is ever held across calls. Concurrent writers from other
//! processes are serialized by SQLite's own locking only.
//!
//! Each operation comes in two flavours:
//! - `try_*` returns a [`Result`] whose [`ErrorKind`] tells the caller what
//!   went wrong (e.g. [`ErrorKind::NotFound`] vs an encryption failure).
//! - The plain variant logs the failure and returns `bool` (or a possibly
//!   empty `Vec`), never an error.

use crate::entry::Entry;
use crate::error::{DiaryError, ErrorCategory, ErrorKind, Result};
use crate::search::EntryFilter;
use crate::token;
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, warn};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        title TEXT NOT NULL,
        encrypted_content TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );
";

const SELECT_COLUMNS: &str = "SELECT id, date, title, encrypted_content, created_at FROM entries";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of reading every entry with one password.
#[derive(Debug, Default)]
pub struct Listing {
    /// Entries that decrypted, newest date first.
    pub entries: Vec<Entry>,
    /// Rows that were skipped because they could not be decrypted.
    pub undecryptable: usize,
}

/// A row as stored, before decryption.
struct StoredRow {
    id: i64,
    date: String,
    title: String,
    encrypted_content: String,
    created_at: NaiveDateTime,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date: row.get(1)?,
            title: row.get(2)?,
            encrypted_content: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn decrypt(self, password: &[u8]) -> Result<Entry> {
        let content = token::decrypt(&self.encrypted_content, password)?;
        Ok(Entry {
            id: self.id,
            date: self.date,
            title: self.title,
            content: String::clone(&content),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EntryStore {
    db_path: PathBuf,
}

impl EntryStore {
    /// Creates a store backed by the SQLite file at `db_path`.
    ///
    /// Nothing is touched on disk until [`EntryStore::initialize`] runs.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path).map_err(|e| {
            storage_error(
                format!("cannot open database {}", self.db_path.display()),
                e,
            )
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| storage_error("cannot configure database connection", e))?;
        Ok(conn)
    }

    /// Ensures the database file and the `entries` table exist.
    ///
    /// Safe to call on every startup.
    pub fn try_initialize(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    DiaryError::with_kind_and_source(
                        ErrorCategory::Internal,
                        ErrorKind::Io,
                        format!("cannot create directory {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| storage_error("cannot create entries table", e))?;
        debug!(db = %self.db_path.display(), "entry store ready");
        Ok(())
    }

    /// Encrypts `content` and inserts a new entry, returning its id.
    ///
    /// Nothing is written if the title is empty or encryption fails.
    pub fn try_add(&self, date: &str, title: &str, content: &str, password: &[u8]) -> Result<i64> {
        validate_title(title)?;
        let encrypted_content = token::encrypt(content, password)?;

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO entries (date, title, encrypted_content) VALUES (?1, ?2, ?3)",
            params![date, title, encrypted_content],
        )
        .map_err(|e| storage_error("cannot insert entry", e))?;
        Ok(conn.last_insert_rowid())
    }

    /// Reads and decrypts every entry, ordered by date (newest first), then
    /// by creation time (newest first).
    ///
    /// Rows that fail to decrypt, or whose columns cannot be read as an
    /// entry, are skipped and counted in [`Listing::undecryptable`]; they
    /// never abort the read.
    pub fn try_get_all(&self, password: &[u8]) -> Result<Listing> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!(
                "{} ORDER BY date DESC, created_at DESC, id DESC",
                SELECT_COLUMNS
            ))
            .map_err(|e| storage_error("cannot prepare entry query", e))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| storage_error("cannot query entries", e))?;

        let mut listing = Listing::default();
        while let Some(row) = rows
            .next()
            .map_err(|e| storage_error("cannot read entry row", e))?
        {
            // A single unreadable row is skipped like an undecryptable one.
            let id: Option<i64> = row.get(0).ok();
            let stored = match StoredRow::from_row(row) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(entry_id = ?id, error = %e, "skipping entry with unreadable columns");
                    listing.undecryptable += 1;
                    continue;
                }
            };
            match stored.decrypt(password) {
                Ok(entry) => listing.entries.push(entry),
                Err(e) => {
                    warn!(
                        entry_id = ?id,
                        failure = ?e.decrypt_failure(),
                        "skipping entry that could not be decrypted"
                    );
                    listing.undecryptable += 1;
                }
            }
        }
        Ok(listing)
    }

    /// Reads and decrypts a single entry.
    pub fn try_get(&self, id: i64, password: &[u8]) -> Result<Entry> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                StoredRow::from_row,
            )
            .optional()
            .map_err(|e| storage_error("cannot read entry", e))?
            .ok_or_else(|| not_found(id))?;
        row.decrypt(password)
            .map_err(|e| e.with_context(format!("cannot decrypt entry {}", id)))
    }

    /// Like [`EntryStore::try_get_all`], keeping only entries that match `filter`.
    pub fn try_search(&self, filter: &EntryFilter, password: &[u8]) -> Result<Listing> {
        let listing = self.try_get_all(password)?;
        Ok(Listing {
            entries: filter.apply(listing.entries),
            undecryptable: listing.undecryptable,
        })
    }

    /// Re-encrypts `content` and overwrites date, title and content of entry `id`.
    ///
    /// `id` and `created_at` are preserved. Fails with [`ErrorKind::NotFound`]
    /// when no such entry exists.
    pub fn try_update(
        &self,
        id: i64,
        date: &str,
        title: &str,
        content: &str,
        password: &[u8],
    ) -> Result<()> {
        validate_title(title)?;
        let encrypted_content = token::encrypt(content, password)?;

        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE entries SET date = ?1, title = ?2, encrypted_content = ?3 WHERE id = ?4",
                params![date, title, encrypted_content, id],
            )
            .map_err(|e| storage_error("cannot update entry", e))?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Permanently removes entry `id`.
    pub fn try_delete(&self, id: i64) -> Result<()> {
        let conn = self.connect()?;
        let changed = conn
            .execute("DELETE FROM entries WHERE id = ?1", params![id])
            .map_err(|e| storage_error("cannot delete entry", e))?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    pub fn initialize(&self) -> bool {
        report("initialize", self.try_initialize())
    }

    pub fn add(&self, date: &str, title: &str, content: &str, password: &[u8]) -> bool {
        report("add", self.try_add(date, title, content, password))
    }

    /// Entries that decrypt under `password`. A wrong password yields an
    /// empty (or partial) list rather than an error.
    pub fn get_all(&self, password: &[u8]) -> Vec<Entry> {
        match self.try_get_all(password) {
            Ok(listing) => listing.entries,
            Err(e) => {
                log_failure("get_all", &e);
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: i64, password: &[u8]) -> Option<Entry> {
        match self.try_get(id, password) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log_failure("get", &e);
                None
            }
        }
    }

    pub fn search(&self, filter: &EntryFilter, password: &[u8]) -> Vec<Entry> {
        match self.try_search(filter, password) {
            Ok(listing) => listing.entries,
            Err(e) => {
                log_failure("search", &e);
                Vec::new()
            }
        }
    }

    pub fn update(&self, id: i64, date: &str, title: &str, content: &str, password: &[u8]) -> bool {
        report("update", self.try_update(id, date, title, content, password))
    }

    pub fn delete(&self, id: i64) -> bool {
        report("delete", self.try_delete(id))
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(DiaryError::with_kind(
            ErrorCategory::User,
            ErrorKind::InvalidEntry,
            "entry title must not be empty",
        ));
    }
    Ok(())
}

fn storage_error(msg: impl Into<String>, err: rusqlite::Error) -> DiaryError {
    DiaryError::with_kind_and_source(ErrorCategory::Internal, ErrorKind::Storage, msg, err)
}

fn not_found(id: i64) -> DiaryError {
    DiaryError::with_kind(
        ErrorCategory::User,
        ErrorKind::NotFound,
        format!("no entry with id {}", id),
    )
}

fn report<T>(operation: &str, result: Result<T>) -> bool {
    match result {
        Ok(_) => {
            debug!(operation, "entry store operation succeeded");
            true
        }
        Err(e) => {
            log_failure(operation, &e);
            false
        }
    }
}

fn log_failure(operation: &str, err: &DiaryError) {
    match err.kind {
        Some(ErrorKind::Storage) | Some(ErrorKind::Io) | None => {
            error!(operation, error = %err.chain_message(), "entry store operation failed");
        }
        _ => {
            warn!(operation, kind = ?err.kind, error = %err.chain_message(), "entry store operation failed");
        }
    }
}
