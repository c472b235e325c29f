//! Container framing
//!
//! The on-disk layout is a flat concatenation with fixed offsets and no
//! header, magic number or version:
//!
//! - salt: 16 bytes
//! - iv: 16 bytes
//! - ciphertext: N bytes, N a positive multiple of 16 (PKCS#7 padded)

use crate::error::{CryptError, ErrorCategory, ErrorKind, Result};
use crate::kdf::SALT_LEN;

/// AES block size, and the IV length.
pub const BLOCK_LEN: usize = 16;

/// Length of the IV in bytes
pub const IV_LEN: usize = BLOCK_LEN;

/// Bytes preceding the ciphertext.
pub const HEADER_LEN: usize = SALT_LEN + IV_LEN;

/// Borrowed view of a structurally valid container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Container<'a> {
    pub salt: &'a [u8; SALT_LEN],
    pub iv: &'a [u8; IV_LEN],
    pub ciphertext: &'a [u8],
}

impl<'a> Container<'a> {
    /// Split `bytes` at the fixed offsets and validate the ciphertext shape.
    ///
    /// This checks structure only; whether the ciphertext decrypts under a
    /// given password is decided later by the padding check.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(malformed(format!(
                "input likely truncated: {} bytes is shorter than salt and iv ({} bytes)",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let (salt, rest) = bytes.split_at(SALT_LEN);
        let (iv, ciphertext) = rest.split_at(IV_LEN);

        if ciphertext.is_empty() {
            return Err(malformed("container holds no ciphertext"));
        }
        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(malformed(format!(
                "ciphertext length {} is not a multiple of the {}-byte block size",
                ciphertext.len(),
                BLOCK_LEN
            )));
        }

        let salt = salt.try_into().map_err(|_| invariant("salt"))?;
        let iv = iv.try_into().map_err(|_| invariant("iv"))?;

        Ok(Self {
            salt,
            iv,
            ciphertext,
        })
    }

    /// Serialize `salt || iv || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(self.salt);
        out.extend_from_slice(self.iv);
        out.extend_from_slice(self.ciphertext);
        out
    }
}

/// Total container length for a plaintext of `plaintext_len` bytes.
///
/// Padding always adds between 1 and 16 bytes.
pub const fn container_len(plaintext_len: usize) -> usize {
    HEADER_LEN + plaintext_len - plaintext_len % BLOCK_LEN + BLOCK_LEN
}

fn malformed(msg: impl Into<String>) -> CryptError {
    CryptError::with_kind(ErrorCategory::User, ErrorKind::MalformedContainer, msg)
}

fn invariant(what: &str) -> CryptError {
    CryptError::with_kind(
        ErrorCategory::Internal,
        ErrorKind::InternalInvariant,
        format!("failed to read {}", what),
    )
}
