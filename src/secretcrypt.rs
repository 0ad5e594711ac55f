//! Encryption/decryption using PBKDF2 + XSalsa20Poly1305
//!
//! This module implements password-based sealing of binary payloads using:
//! - PBKDF2-HMAC-SHA256 for key derivation from the password
//! - NaCl secretbox (XSalsa20Poly1305) for authenticated encryption
//!
//! The binary format is:
//! - version: 1 byte (currently 0x01)
//! - salt: 16 bytes, random per token
//! - nonce: 24 bytes, random per token
//! - length: 8 bytes (big-endian signed int64) of the sealed box
//! - sealed box: variable length (includes 16-byte Poly1305 MAC)
//!
//! The sealed plaintext is an 8-byte big-endian unix timestamp (seconds)
//! followed by the caller's payload, so the timestamp is authenticated too.

use crate::error::{DiaryError, ErrorCategory, ErrorKind, Result};
use chrono::Utc;
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Nonce, XSalsa20Poly1305};
use hmac::Hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use std::mem::size_of;
use zeroize::Zeroizing;

/// Binary format version written by this implementation
pub const FORMAT_VERSION: u8 = 1;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Length of the Poly1305 authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// PBKDF2 iteration count
pub const PBKDF2_ROUNDS: u32 = 100_000;

const TIMESTAMP_LEN: usize = size_of::<i64>();

/// A successfully authenticated and opened token.
pub struct Opened {
    /// Unix timestamp (seconds) recorded when the token was sealed.
    pub timestamp: i64,
    pub plaintext: Zeroizing<Vec<u8>>,
}

/// Derive a 32-byte key from a password and salt using PBKDF2-HMAC-SHA256
pub fn derive_key(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase, salt, PBKDF2_ROUNDS, key.as_mut()).map_err(
        |_| {
            DiaryError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::KeyDerivationFailure,
                "PBKDF2 key derivation failed",
            )
        },
    )?;
    Ok(key)
}

/// Encrypt plaintext with a password using random salt and nonce, stamped
/// with the current time
///
/// Returns the binary format: version(1) + salt(16) + nonce(24) + length(8) + sealedbox(variable)
pub fn encrypt(passphrase: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    encrypt_deterministic(passphrase, plaintext, &salt, &nonce, Utc::now().timestamp())
}

/// Encrypt plaintext with a password using provided salt, nonce and timestamp
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates random salt/nonce.
pub fn encrypt_deterministic(
    passphrase: &[u8],
    plaintext: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    timestamp: i64,
) -> Result<Vec<u8>> {
    let cipher = cipher_for(passphrase, salt)?;

    let mut payload = Zeroizing::new(Vec::with_capacity(TIMESTAMP_LEN + plaintext.len()));
    payload.extend_from_slice(&timestamp.to_be_bytes());
    payload.extend_from_slice(plaintext);

    let nonce_obj = Nonce::from(*nonce);
    let sealed_box = cipher
        .encrypt(&nonce_obj, payload.as_slice())
        .map_err(|_| {
            DiaryError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::SecretboxFailure,
                "secretbox sealing failed",
            )
        })?;

    let sealed_box_len = sealed_box.len() as i64;
    let mut output =
        Vec::with_capacity(1 + SALT_LEN + NONCE_LEN + size_of::<i64>() + sealed_box.len());
    output.push(FORMAT_VERSION);
    output.extend_from_slice(salt);
    output.extend_from_slice(nonce);
    output.extend_from_slice(&sealed_box_len.to_be_bytes()); // big-endian i64
    output.extend_from_slice(&sealed_box);

    Ok(output)
}

/// Decrypt ciphertext with a password
pub fn decrypt(passphrase: &[u8], ciphertext: &[u8]) -> Result<Opened> {
    let mut pos = 0;

    let Some(&version) = ciphertext.first() else {
        return Err(truncated("input likely truncated while reading version"));
    };
    if version != FORMAT_VERSION {
        return Err(DiaryError::with_kind(
            ErrorCategory::User,
            ErrorKind::UnsupportedVersion,
            format!("unsupported token format version {}", version),
        ));
    }
    pos += 1;

    let salt: [u8; SALT_LEN] = read_array(ciphertext, pos)
        .ok_or_else(|| truncated("input likely truncated while reading salt"))?;
    pos += SALT_LEN;

    let nonce: [u8; NONCE_LEN] = read_array(ciphertext, pos)
        .ok_or_else(|| truncated("input likely truncated while reading nonce"))?;
    pos += NONCE_LEN;

    let length_bytes: [u8; 8] = read_array(ciphertext, pos)
        .ok_or_else(|| truncated("input likely truncated while reading sealed box length"))?;
    let sealed_box_len = i64::from_be_bytes(length_bytes);
    pos += size_of::<i64>();

    if sealed_box_len < 0 {
        return Err(binary_format(
            "negative sealed box length (when interpreted as a big-endian i64)",
        ));
    }

    // Check if length exceeds platform's maximum isize. *Valid* input
    // can fail this check if the platforms' isize is small.
    if sealed_box_len > isize::MAX as i64 {
        return Err(binary_format(
            "sealed box length exceeds this system's max isize",
        ));
    }

    let sealed_box_len = sealed_box_len as usize;

    if sealed_box_len < TAG_LEN + TIMESTAMP_LEN {
        return Err(binary_format(
            "sealed box length too small to hold a timestamp and MAC",
        ));
    }

    if sealed_box_len > ciphertext.len() - pos {
        return Err(truncated(
            "truncated or corrupt input; claimed length greater than available input",
        ));
    }
    let sealed_box = &ciphertext[pos..pos + sealed_box_len];
    pos += sealed_box_len;

    if pos < ciphertext.len() {
        return Err(DiaryError::with_kind(
            ErrorCategory::User,
            ErrorKind::TrailingData,
            "invalid input: unexpected data after sealed box",
        ));
    }

    let cipher = cipher_for(passphrase, &salt)?;
    let nonce_obj = Nonce::from(nonce);
    let payload = Zeroizing::new(cipher.decrypt(&nonce_obj, sealed_box).map_err(|_| {
        DiaryError::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "corrupt input, tampered-with data, or bad password",
        )
    })?);

    let timestamp_bytes: [u8; TIMESTAMP_LEN] = read_array(&payload, 0).ok_or_else(|| {
        DiaryError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InvalidPlaintext,
            "sealed payload too short to carry a timestamp",
        )
    })?;

    Ok(Opened {
        timestamp: i64::from_be_bytes(timestamp_bytes),
        plaintext: Zeroizing::new(payload[TIMESTAMP_LEN..].to_vec()),
    })
}

fn cipher_for(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Result<XSalsa20Poly1305> {
    let key = derive_key(passphrase, salt)?;
    XSalsa20Poly1305::new_from_slice(key.as_slice()).map_err(|_| {
        DiaryError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::SecretboxFailure,
            "derived key has the wrong length for secretbox",
        )
    })
}

fn read_array<const N: usize>(input: &[u8], pos: usize) -> Option<[u8; N]> {
    input.get(pos..pos.checked_add(N)?)?.try_into().ok()
}

fn truncated(msg: &str) -> DiaryError {
    DiaryError::with_kind(ErrorCategory::User, ErrorKind::TruncatedInput, msg)
}

fn binary_format(msg: &str) -> DiaryError {
    DiaryError::with_kind(ErrorCategory::User, ErrorKind::BinaryFormat, msg)
}
