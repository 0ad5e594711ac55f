//! Diarybox - password-protected personal diary with entries encrypted at rest

#![forbid(unsafe_code)]

pub mod config;
pub mod entry;
pub mod error;
pub mod passphrase;
pub mod search;
pub mod secretcrypt;
pub mod store;
pub mod token;
pub mod varmor;

pub use entry::Entry;
pub use error::{DecryptFailure, DiaryError, ErrorCategory, ErrorKind, Result};
pub use search::EntryFilter;
pub use store::{EntryStore, Listing};
