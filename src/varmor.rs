//! Versioned armoring for ciphertext tokens
//!
//! Encrypted entry content is stored in a TEXT column, so the binary token
//! is armored with base64url and a version prefix. The armored format is:
//! - Free of whitespace (including newlines)
//! - Free of `+`, `/` and `=`, so it survives any text column or URL

use crate::error::{DiaryError, ErrorCategory, ErrorKind, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

/// Magic prefix for all diarybox versions
const MAGIC_PREFIX: &str = "diarybox";

/// Version 1 magic marker
const V1_MAGIC: &str = "diarybox1:";

/// Wrap bytes in armor, returning the armored string
///
/// Format: diarybox1:{base64url-no-padding}
pub fn wrap(body: &[u8]) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(body);
    format!("{}{}", V1_MAGIC, encoded)
}

/// Unwrap an armored string, returning the original bytes
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    if armored.len() < V1_MAGIC.len() {
        return Err(DiaryError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "token smaller than magic marker; likely truncated",
        ));
    }

    if let Some(encoded) = armored.strip_prefix(V1_MAGIC) {
        let body = URL_SAFE_NO_PAD.decode(encoded).map_err(|e| {
            DiaryError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::ArmoringDecode,
                format!("base64 decoding failed: {}", e),
                e,
            )
        })?;
        Ok(body)
    } else if armored.starts_with(MAGIC_PREFIX) {
        Err(DiaryError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringFromFuture,
            "token claims to be diarybox, but not a version we support",
        ))
    } else {
        Err(DiaryError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "token unrecognized as diarybox data",
        ))
    }
}
