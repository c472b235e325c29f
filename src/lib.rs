//! cryptmgr - Password-based file encryption using AES-256-CBC and PBKDF2
//!
//! The container format is `salt(16) || iv(16) || ciphertext`, with no
//! header and no authentication tag. See [`container`] for the layout and
//! [`cipher`] for the limitations that follow from it.

#![forbid(unsafe_code)]

#[cfg(feature = "batch")]
pub mod batch;
pub mod cipher;
pub mod container;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod passphrase;

pub use error::{CryptError, ErrorCategory, ErrorKind, Result};
