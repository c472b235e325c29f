use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to the user.
    ///
    /// Internal is never a guarantee that the user did nothing wrong, only
    /// that the code could not tell.
    Internal,

    /// The user provided invalid input or asked for something that cannot
    /// be done.
    User,
}

/// Closed set of failure conditions callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Arguments to key derivation were unusable (wrong salt length,
    /// empty password).
    InvalidInput,
    /// The container is structurally impossible: shorter than salt + IV,
    /// or the ciphertext is empty or not block aligned.
    MalformedContainer,
    /// Padding validation failed after decryption. A wrong password and
    /// corrupted ciphertext look identical here.
    InvalidPasswordOrCorruptData,
    /// Interaction with the filesystem, stdin/stdout, or the terminal failed.
    Io,
    /// A password could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// The password and its confirmation did not match.
    PassphraseMismatch,
    /// The password does not satisfy the minimum length policy.
    PassphrasePolicy,
    /// The destination file exists and overwriting was not allowed.
    OutputExists,
    /// Unexpected state reached within cryptmgr logic.
    InternalInvariant,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct CryptError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag. Code consuming errors MUST handle
    /// the absence of a kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl CryptError {
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

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

    /// Wraps the current error with a higher-level message while keeping
    /// the original as source. Category and kind carry over so callers can
    /// still branch on them.
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

    /// Renders the message followed by every message in the source chain,
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
pub type Result<T> = std::result::Result<T, CryptError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_context_preserves_kind_and_category() {
        let err = CryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::MalformedContainer,
            "container too short",
        )
        .with_context("failed to decrypt");

        assert_eq!(err.kind, Some(ErrorKind::MalformedContainer));
        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.message(), "failed to decrypt");
    }

    #[test]
    fn test_chain_message() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let err = CryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            "failed to read from a.txt",
            io_err,
        )
        .with_context("encryption failed");

        assert_eq!(
            err.chain_message(),
            "encryption failed: failed to read from a.txt: no such file"
        );
    }

    #[test]
    fn test_new_has_no_kind() {
        let err = CryptError::new(ErrorCategory::Internal, "boom");
        assert_eq!(err.kind, None);
        assert_eq!(err.to_string(), "boom");
    }
}
