//! Password-based key derivation (PBKDF2-HMAC-SHA256)

use crate::error::{CryptError, ErrorCategory, ErrorKind, Result};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count. Part of the file format: containers carry no
/// parameters, so changing this makes existing files undecryptable.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// A derived key, wiped from memory when dropped.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

/// Derive a 32-byte key from a password and a 16-byte salt.
///
/// Deterministic for a given (password, salt). Fails with
/// [`ErrorKind::InvalidInput`] if the salt is not exactly [`SALT_LEN`]
/// bytes or the password is empty.
pub fn derive(password: &[u8], salt: &[u8]) -> Result<DerivedKey> {
    if salt.len() != SALT_LEN {
        return Err(CryptError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InvalidInput,
            format!("salt must be {} bytes, got {}", SALT_LEN, salt.len()),
        ));
    }
    if password.is_empty() {
        return Err(CryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::InvalidInput,
            "password must not be empty",
        ));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    // HMAC accepts keys of any length, so this only fails on a broken invariant.
    pbkdf2::<Hmac<Sha256>>(password, salt, PBKDF2_ITERATIONS, &mut key[..]).map_err(|e| {
        CryptError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!("PBKDF2 key derivation failed: {}", e),
        )
    })?;

    Ok(key)
}
