//! Filtering of decrypted entries
//!
//! Content is encrypted at rest, so filtering happens in memory after the
//! store has decrypted every row.

use crate::entry::Entry;

/// Keyword and date-range filter.
///
/// All criteria are optional; blank strings count as absent. Date bounds are
/// inclusive and compared lexicographically, which is chronological for
/// `YYYY-MM-DD` dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Case-insensitive substring matched against title, content and date.
    pub keyword: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn date_from(mut self, date: impl Into<String>) -> Self {
        self.date_from = Some(date.into());
        self
    }

    pub fn date_to(mut self, date: impl Into<String>) -> Self {
        self.date_to = Some(date.into());
        self
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(keyword) = non_blank(&self.keyword) {
            let keyword = keyword.to_lowercase();
            if !entry.title.to_lowercase().contains(&keyword)
                && !entry.content.to_lowercase().contains(&keyword)
                && !entry.date.to_lowercase().contains(&keyword)
            {
                return false;
            }
        }
        if let Some(from) = non_blank(&self.date_from) {
            if entry.date.as_str() < from {
                return false;
            }
        }
        if let Some(to) = non_blank(&self.date_to) {
            if entry.date.as_str() > to {
                return false;
            }
        }
        true
    }

    /// Keeps the matching entries, preserving their order.
    pub fn apply(&self, entries: Vec<Entry>) -> Vec<Entry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
