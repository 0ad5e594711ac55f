//! Text-level encryption of entry content
//!
//! Combines [`secretcrypt`] and [`varmor`] into the ciphertext tokens that are
//! stored in place of entry content. A token is opaque to everything except
//! this module.

use crate::error::{DiaryError, ErrorCategory, ErrorKind, Result};
use crate::secretcrypt;
use crate::varmor;
use zeroize::Zeroizing;

pub use crate::secretcrypt::{KEY_LEN, SALT_LEN, derive_key};

/// Decrypted content together with the time it was sealed.
pub struct OpenedText {
    /// Unix timestamp (seconds) recorded when the token was created.
    pub timestamp: i64,
    pub text: Zeroizing<String>,
}

/// Encrypt `plaintext` under `password`, returning an armored token.
///
/// Every call uses a fresh salt and nonce, so encrypting the same text twice
/// yields two different tokens.
pub fn encrypt(plaintext: &str, password: &[u8]) -> Result<String> {
    let ciphertext = secretcrypt::encrypt(password, plaintext.as_bytes())
        .map_err(|e| e.with_context("encryption failed"))?;
    Ok(varmor::wrap(&ciphertext))
}

/// Decrypt a token produced by [`encrypt`].
///
/// Use [`DiaryError::decrypt_failure`] to tell a wrong password from a
/// malformed token.
pub fn decrypt(token: &str, password: &[u8]) -> Result<Zeroizing<String>> {
    open(token, password).map(|opened| opened.text)
}

/// Like [`decrypt`], but also returns the timestamp embedded in the token.
pub fn open(token: &str, password: &[u8]) -> Result<OpenedText> {
    let ciphertext = varmor::unwrap(token).map_err(|e| e.with_context("failed to unarmor"))?;
    let opened = secretcrypt::decrypt(password, &ciphertext)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    let text = String::from_utf8(opened.plaintext.to_vec()).map_err(|e| {
        DiaryError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InvalidPlaintext,
            "decrypted content is not valid UTF-8",
            e,
        )
    })?;
    Ok(OpenedText {
        timestamp: opened.timestamp,
        text: Zeroizing::new(text),
    })
}
