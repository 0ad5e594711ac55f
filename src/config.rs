//! Configuration (diarybox.toml).
//!
//! The core library only needs to know where the database lives; the
//! application name is used by the presentation layer for prompts.

use crate::error::{DiaryError, ErrorCategory, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const DEFAULT_APP_NAME: &str = "diarybox";
const DB_FILE_NAME: &str = "diary.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Display name used in prompts.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Path to the SQLite database holding the entries.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

/// `<data dir>/diarybox/diary.db`, or `./diary.db` when the platform has no
/// data directory.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(DEFAULT_APP_NAME).join(DB_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            db_path: default_db_path(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            let category = if e.kind() == io::ErrorKind::NotFound {
                ErrorCategory::User
            } else {
                ErrorCategory::Internal
            };
            DiaryError::with_kind_and_source(
                category,
                ErrorKind::Config,
                format!("cannot read config file {}", path.display()),
                e,
            )
        })?;
        Self::parse(&content)
            .map_err(|e| e.with_context(format!("invalid config file {}", path.display())))
    }

    /// Load the given file, or fall back to defaults when no file is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            DiaryError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Config,
                format!("cannot parse config: {}", e.message()),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.app_name, "diarybox");
        assert!(config.db_path.ends_with("diary.db"));
    }

    #[test]
    fn test_parse_partial() {
        let config = Config::parse(r#"db_path = "/tmp/my.db""#).unwrap();
        assert_eq!(config.app_name, "diarybox");
        assert_eq!(config.db_path, PathBuf::from("/tmp/my.db"));
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
            app_name = "My Diary"
            db_path = "entries.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.app_name, "My Diary");
        assert_eq!(config.db_path, PathBuf::from("entries.db"));
    }

    #[test]
    fn test_parse_invalid() {
        let err = Config::parse("db_path = [1, 2").unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Config));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("diarybox.toml");
        fs::write(&path, "app_name = \"Journal\"\n").unwrap();

        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.app_name, "Journal");
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load(&temp_dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Config));
        assert_eq!(err.category, ErrorCategory::User);
    }
}
