//! Diary entry record

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// A single decrypted diary entry.
///
/// `content` only ever lives in memory; the store persists its ciphertext.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Assigned by the store on creation, never reused.
    pub id: i64,
    /// `YYYY-MM-DD`, stored verbatim.
    pub date: String,
    pub title: String,
    pub content: String,
    /// Insertion time (UTC), immutable.
    pub created_at: NaiveDateTime,
}

// Content is redacted so entries can appear in log fields safely.
impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("date", &self.date)
            .field("title", &self.title)
            .field("content", &format_args!("<{} bytes redacted>", self.content.len()))
            .field("created_at", &self.created_at)
            .finish()
    }
}
