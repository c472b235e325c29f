//! Password sources
//!
//! Everything that talks to a human lives here so the cipher core can be
//! driven with an already obtained password.

use crate::error::{CryptError, ErrorCategory, ErrorKind, Result};
use std::io::{self, IsTerminal, Read};
use zeroize::Zeroizing;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Trait for reading passwords from various sources
pub trait PassphraseReader {
    /// Read a password as arbitrary bytes.
    ///
    /// Returns the password wrapped in `Zeroizing` so it is wiped from
    /// memory when dropped.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed password (tests and the inline `--password` flag)
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: Vec<u8>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.passphrase).clone()))
    }
}

/// Reads the password from any io::Read source, verbatim
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            CryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        Ok(data)
    }
}

/// Reads the password from the terminal with no echo
pub struct TerminalPassphraseReader {
    confirm: bool,
}

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self { confirm: false }
    }

    /// A reader that asks twice and fails unless both entries match.
    pub fn confirming() -> Self {
        Self { confirm: true }
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    /// Read password from terminal.
    ///
    /// Note: terminal input is limited to UTF-8 by rpassword. For other
    /// byte sequences, use --passphrase-stdin instead.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(CryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        let passphrase = prompt("Enter password: ")?;
        if self.confirm {
            let confirmation = prompt("Confirm password: ")?;
            if *passphrase != *confirmation {
                return Err(CryptError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::PassphraseMismatch,
                    "passwords do not match",
                ));
            }
        }

        Ok(passphrase)
    }
}

fn prompt(text: &str) -> Result<Zeroizing<Vec<u8>>> {
    // rpassword returns a plain String; move it into a zeroizing buffer
    // right away.
    let entered = rpassword::prompt_password(text).map_err(|e| {
        CryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::PassphraseUnavailable,
            format!("failure reading password: {}", e),
            e,
        )
    })?;
    Ok(Zeroizing::new(entered.into_bytes()))
}

/// Rejects passwords shorter than a minimum number of characters.
///
/// Length is counted in Unicode scalar values, so the password must be
/// valid UTF-8.
pub struct PolicyPassphraseReader {
    upstream: Box<dyn PassphraseReader>,
    min_chars: usize,
}

impl PolicyPassphraseReader {
    pub fn new(upstream: Box<dyn PassphraseReader>) -> Self {
        Self::with_min_chars(upstream, MIN_PASSWORD_CHARS)
    }

    pub fn with_min_chars(upstream: Box<dyn PassphraseReader>, min_chars: usize) -> Self {
        Self {
            upstream,
            min_chars,
        }
    }
}

impl PassphraseReader for PolicyPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let passphrase = self.upstream.read_passphrase()?;
        check_policy(&passphrase, self.min_chars)?;
        Ok(passphrase)
    }
}

fn check_policy(passphrase: &[u8], min_chars: usize) -> Result<()> {
    let text = std::str::from_utf8(passphrase).map_err(|_| {
        CryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::PassphrasePolicy,
            "password is not valid UTF-8",
        )
    })?;
    if text.chars().count() < min_chars {
        return Err(CryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::PassphrasePolicy,
            format!("password must be at least {} characters long", min_chars),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingReader;

    impl PassphraseReader for FailingReader {
        fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
            Err(CryptError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                "simulated error",
            ))
        }
    }

    #[test]
    fn test_constant_reader() {
        let mut reader = ConstantPassphraseReader::new(b"test1234".to_vec());
        assert_eq!(&*reader.read_passphrase().unwrap(), b"test1234");
        assert_eq!(&*reader.read_passphrase().unwrap(), b"test1234");
    }

    /// Tests the terminal reader. This is ignored by default and must be run
    /// explicitly and with human input:
    ///
    /// cargo test test_terminal_reader_interactive -- --ignored --nocapture
    #[test]
    #[ignore]
    fn test_terminal_reader_interactive() {
        let mut reader = TerminalPassphraseReader::confirming();
        println!("\nPlease enter the same test password twice:");
        let passphrase = reader.read_passphrase().unwrap();
        assert!(!passphrase.is_empty(), "Expected non-empty password");
    }

    #[test]
    fn test_reader_passphrase_reader() {
        let data = b"mypassword";
        let mut reader = ReaderPassphraseReader::new(Box::new(&data[..]));
        assert_eq!(&*reader.read_passphrase().unwrap(), b"mypassword");
    }

    #[test]
    fn test_reader_passphrase_reader_keeps_newline() {
        let data = b"mypassword\n";
        let mut reader = ReaderPassphraseReader::new(Box::new(&data[..]));
        assert_eq!(&*reader.read_passphrase().unwrap(), b"mypassword\n");
    }

    #[test]
    fn test_reader_passphrase_reader_non_utf8() {
        let data: &[u8] = &[0xff, 0xfe, 0x00, 0x01];
        let mut reader = ReaderPassphraseReader::new(Box::new(data));
        assert_eq!(&*reader.read_passphrase().unwrap(), data);
    }

    #[test]
    fn test_policy_accepts_long_enough() {
        let mut reader =
            PolicyPassphraseReader::new(Box::new(ConstantPassphraseReader::new(b"12345678".to_vec())));
        assert_eq!(&*reader.read_passphrase().unwrap(), b"12345678");
    }

    #[test]
    fn test_policy_rejects_short() {
        let mut reader =
            PolicyPassphraseReader::new(Box::new(ConstantPassphraseReader::new(b"1234567".to_vec())));
        let err = reader.read_passphrase().expect_err("expected policy failure");
        assert_eq!(err.kind, Some(ErrorKind::PassphrasePolicy));
        assert_eq!(err.category, ErrorCategory::User);
    }

    #[test]
    fn test_policy_counts_characters_not_bytes() {
        // Seven characters, fourteen bytes
        let short = "ééééééé".as_bytes().to_vec();
        let mut reader = PolicyPassphraseReader::new(Box::new(ConstantPassphraseReader::new(short)));
        let err = reader.read_passphrase().expect_err("expected policy failure");
        assert_eq!(err.kind, Some(ErrorKind::PassphrasePolicy));

        let long = "éééééééé".as_bytes().to_vec();
        let mut reader = PolicyPassphraseReader::new(Box::new(ConstantPassphraseReader::new(long)));
        assert!(reader.read_passphrase().is_ok());
    }

    #[test]
    fn test_policy_rejects_non_utf8() {
        let mut reader = PolicyPassphraseReader::new(Box::new(ConstantPassphraseReader::new(
            vec![0xff; 16],
        )));
        let err = reader.read_passphrase().expect_err("expected policy failure");
        assert_eq!(err.kind, Some(ErrorKind::PassphrasePolicy));
    }

    #[test]
    fn test_policy_passes_upstream_errors_through() {
        let mut reader = PolicyPassphraseReader::with_min_chars(Box::new(FailingReader), 1);
        let err = reader.read_passphrase().expect_err("expected upstream failure");
        assert_eq!(err.kind, Some(ErrorKind::PassphraseUnavailable));
    }
}
