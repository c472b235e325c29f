//! Parallel encryption of many independent buffers
//!
//! Each item is one full encrypt or decrypt call on rayon's pool. Key
//! derivation dominates the cost, so there is no point splitting a single
//! buffer; the parallelism is across items.

use rayon::prelude::*;

use crate::cipher;
use crate::error::Result;

/// Encrypt every plaintext under the same password.
///
/// Each container gets its own fresh salt and IV. Output order matches
/// input order. Fails with the first error encountered.
pub fn encrypt_batch<T>(password: &[u8], plaintexts: &[T]) -> Result<Vec<Vec<u8>>>
where
    T: AsRef<[u8]> + Sync,
{
    plaintexts
        .par_iter()
        .map(|pt| cipher::encrypt(password, pt.as_ref()))
        .collect()
}

/// Decrypt every container with the same password.
pub fn decrypt_batch<T>(password: &[u8], containers: &[T]) -> Result<Vec<Vec<u8>>>
where
    T: AsRef<[u8]> + Sync,
{
    containers
        .par_iter()
        .map(|c| cipher::decrypt(password, c.as_ref()))
        .collect()
}
