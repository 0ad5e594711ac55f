use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The armored token is malformed (prefix or encoding).
    ArmoringInvalid,
    /// Base64 decoding of the armored payload failed.
    ArmoringDecode,
    /// Token claimed to be diarybox but used a future/unsupported armor version.
    ArmoringFromFuture,
    /// The binary token carries a format version we do not understand.
    UnsupportedVersion,
    /// Length fields or binary layout are invalid.
    BinaryFormat,
    /// Token ended before the expected component could be read.
    TruncatedInput,
    /// Additional bytes were present after the sealed payload.
    TrailingData,
    /// The authenticated payload opened but its contents are not a valid
    /// timestamped UTF-8 text.
    InvalidPlaintext,
    /// Authentication failed due to an incorrect password or tampering
    /// or corruption of the sealed box.
    AuthenticationFailed,
    /// PBKDF2 key derivation failed.
    KeyDerivationFailure,
    /// NaCl secretbox (XSalsa20Poly1305) failed to seal data.
    SecretboxFailure,
    /// Password could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// Entry fields violate a data model invariant (e.g. empty title).
    InvalidEntry,
    /// No entry exists with the requested id.
    NotFound,
    /// The backing SQLite store failed to complete an operation.
    Storage,
    /// The configuration file could not be read or parsed.
    Config,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

/// Why a token could not be decrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptFailure {
    /// Wrong password, or the sealed box itself was modified.
    AuthenticationFailed,
    /// The token is not structurally a diarybox token.
    Malformed,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct DiaryError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl DiaryError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    ///
    /// The kind is carried over so that callers can still branch on it.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    /// Classifies a decryption error.
    ///
    /// Returns `None` for errors that are not about the token itself
    /// (storage, configuration, I/O, key derivation).
    pub fn decrypt_failure(&self) -> Option<DecryptFailure> {
        match self.kind? {
            ErrorKind::AuthenticationFailed => Some(DecryptFailure::AuthenticationFailed),
            ErrorKind::ArmoringInvalid
            | ErrorKind::ArmoringDecode
            | ErrorKind::ArmoringFromFuture
            | ErrorKind::UnsupportedVersion
            | ErrorKind::BinaryFormat
            | ErrorKind::TruncatedInput
            | ErrorKind::TrailingData
            | ErrorKind::InvalidPlaintext => Some(DecryptFailure::Malformed),
            _ => None,
        }
    }

    /// Renders the message followed by every source in the chain,
    /// separated by `": "`.
    pub fn chain_message(&self) -> String {
        let mut out = self.msg.clone();
        let mut next = StdError::source(self);
        while let Some(err) = next {
            out.push_str(": ");
            out.push_str(&err.to_string());
            next = err.source();
        }
        out
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DiaryError>;
